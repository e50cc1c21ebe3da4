// Configuration management module
// Loads settings from an optional config file layered under environment
// variables (APP__ prefix, __ separator)

use crate::model::DEFAULT_MAX_REQUESTS;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Environment variable naming an optional config file (YAML, TOML, JSON ...)
pub const CONFIG_FILE_ENV: &str = "METRICS_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP API binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Record latency of every API request through the metrics recorder
    #[serde(default = "default_track_requests")]
    pub track_requests: bool,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Settings injected into the store, recorder and reporter
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Canonical location of the persisted metrics document
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    /// Retention cap for request records (oldest evicted first)
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    /// Window used for `request_volume_last_7d`
    #[serde(default = "default_volume_window_days")]
    pub volume_window_days: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_requests: default_max_requests(),
            volume_window_days: default_volume_window_days(),
        }
    }
}

impl MetricsConfig {
    pub fn with_storage_path(path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: path.into(),
            ..Self::default()
        }
    }

    pub fn volume_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.volume_window_days))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            bail!("metrics.max_requests must be at least 1");
        }
        if self.volume_window_days == 0 {
            bail!("metrics.volume_window_days must be at least 1");
        }
        if self.storage_path.as_os_str().is_empty() {
            bail!("metrics.storage_path must not be empty");
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(file) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&file).required(true));
        }
        let cfg = builder
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("assemble configuration sources")?;
        let app: AppConfig = cfg
            .try_deserialize()
            .context("deserialize configuration")?;
        app.metrics.validate()?;
        Ok(app)
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_track_requests() -> bool {
    true
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/metrics.json")
}

fn default_max_requests() -> usize {
    DEFAULT_MAX_REQUESTS
}

fn default_volume_window_days() -> u32 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_settings() {
        let cfg = MetricsConfig::default();
        assert_eq!(cfg.max_requests, 1000);
        assert_eq!(cfg.volume_window(), chrono::Duration::days(7));
        assert_eq!(cfg.storage_path, PathBuf::from("data/metrics.json"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_retention() {
        let cfg = MetricsConfig {
            max_requests: 0,
            ..MetricsConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserializes_partial_file_with_defaults() {
        let cfg = config::Config::builder()
            .add_source(config::File::from_str(
                "{\"metrics\": {\"storage_path\": \"/tmp/m.json\"}}",
                config::FileFormat::Json,
            ))
            .build()
            .unwrap();
        let app: AppConfig = cfg.try_deserialize().unwrap();
        assert_eq!(app.metrics.storage_path, PathBuf::from("/tmp/m.json"));
        assert_eq!(app.metrics.max_requests, 1000);
        assert!(app.track_requests);
        assert_eq!(app.listen_addr.port(), 8080);
    }
}
