// Metrics reporter
// Builds the externally consumed report, validates accuracy submissions at
// the API boundary and answers health queries

use crate::aggregate::{
    latency_stats, per_endpoint_breakdown, windowed_volume, EndpointStats, LatencyStats,
};
use crate::errors::{MetricsError, MetricsResult};
use crate::model::{AccuracyCounters, AccuracyOutcome};
use crate::recorder::Recorder;
use crate::store::MetricsStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub timestamp: DateTime<Utc>,
    pub latency: LatencyStats,
    pub request_volume_last_7d: usize,
    pub request_volume_total: usize,
    pub accuracy_confusion: AccuracyCounters,
    pub endpoints: BTreeMap<String, EndpointStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyAck {
    pub status: String,
    pub result: AccuracyOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy {
        requests_tracked: usize,
        accuracy_total: u64,
    },
    Unhealthy {
        error: String,
    },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}

pub struct Reporter {
    store: Arc<MetricsStore>,
    recorder: Arc<Recorder>,
    volume_window: Duration,
}

impl Reporter {
    pub fn new(store: Arc<MetricsStore>, recorder: Arc<Recorder>, volume_window: Duration) -> Self {
        Self {
            store,
            recorder,
            volume_window,
        }
    }

    pub async fn get_metrics(&self) -> MetricsReport {
        let doc = self.store.load().await;
        let now = Utc::now();

        MetricsReport {
            timestamp: now,
            latency: latency_stats(&doc.requests),
            request_volume_last_7d: windowed_volume(&doc.requests, now, self.volume_window),
            request_volume_total: doc.requests.len(),
            accuracy_confusion: doc.accuracy,
            endpoints: per_endpoint_breakdown(&doc.requests),
        }
    }

    /// Validate and record a client-submitted accuracy result. Unlike
    /// `Recorder::record_accuracy_label`, an unknown value is an error here.
    pub async fn record_accuracy_result(&self, result: &str) -> MetricsResult<AccuracyAck> {
        let outcome = result.parse::<AccuracyOutcome>().map_err(|err| {
            info!(result = %result, "rejected accuracy submission");
            err
        })?;
        self.recorder.record_accuracy(outcome).await?;
        Ok(AccuracyAck {
            status: "recorded".to_string(),
            result: outcome,
        })
    }

    pub async fn health(&self) -> HealthStatus {
        match self.compose_health().await {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "metrics health check failed");
                HealthStatus::Unhealthy {
                    error: format!("metrics system unhealthy: {err}"),
                }
            }
        }
    }

    async fn compose_health(&self) -> MetricsResult<HealthStatus> {
        self.store.probe().await?;
        let doc = self.store.load().await;
        let accuracy_total = doc.accuracy.total().ok_or_else(|| {
            MetricsError::Unavailable("accuracy counters overflow".to_string())
        })?;
        Ok(HealthStatus::Healthy {
            requests_tracked: doc.requests.len(),
            accuracy_total,
        })
    }
}
