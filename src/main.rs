use anyhow::{anyhow, Context, Result};
use request_metrics::api::{create_api_router, with_request_tracking};
use request_metrics::config::AppConfig;
use request_metrics::report::HealthStatus;
use request_metrics::service::MetricsService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal metrics service error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration")?;
    let service = MetricsService::new(&config.metrics);

    let app = App {
        config: Arc::new(config),
        service,
    };
    app.run().await
}

struct App {
    config: Arc<AppConfig>,
    service: MetricsService,
}

impl App {
    async fn run(self) -> Result<()> {
        let mut api_router = create_api_router(self.service.clone());
        if self.config.track_requests {
            api_router = with_request_tracking(api_router, self.service.clone());
        }

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr)
            .await
            .with_context(|| format!("bind API server address {}", self.config.listen_addr))?;
        info!(
            address = %self.config.listen_addr,
            storage = %self.config.metrics.storage_path.display(),
            track_requests = self.config.track_requests,
            "metrics API server starting"
        );
        let _api_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, api_router).await {
                warn!(error = %e, "API server error");
            }
        });

        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.service.reporter().health().await {
                        HealthStatus::Healthy { requests_tracked, accuracy_total } => {
                            info!(
                                requests_tracked = requests_tracked,
                                accuracy_total = accuracy_total,
                                "metrics heartbeat"
                            );
                        }
                        HealthStatus::Unhealthy { error } => {
                            warn!(error = %error, "metrics heartbeat: unhealthy");
                        }
                    }
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(err) = res {
                        warn!(error = %err, "ctrl_c listener error");
                    }
                    info!("Shutdown signal received, exiting");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn init_tracing() -> Result<()> {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper=warn,tower_http=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
