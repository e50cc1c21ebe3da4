// Request and accuracy recorder
//
// Every mutation is a load -> modify -> save cycle against the store. The
// cycle runs under a single mutex so concurrent callers in this process never
// overwrite each other's updates.

use crate::errors::MetricsResult;
use crate::metrics::{ACCURACY_RECORDED, RECORDED_LATENCY, REQUESTS_RECORDED};
use crate::model::{AccuracyOutcome, MetricsDocument, RequestRecord};
use crate::store::MetricsStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct Recorder {
    store: Arc<MetricsStore>,
    max_requests: usize,
    write_lock: Mutex<()>,
}

impl Recorder {
    pub fn new(store: Arc<MetricsStore>, max_requests: usize) -> Self {
        Self {
            store,
            max_requests: max_requests.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Append a request observation stamped with the current time
    pub async fn record_request(
        &self,
        endpoint: &str,
        latency_ms: f64,
        status_code: u16,
    ) -> MetricsResult<()> {
        let latency_ms = if latency_ms.is_finite() && latency_ms > 0.0 {
            latency_ms
        } else {
            0.0
        };
        let record = RequestRecord {
            endpoint: endpoint.to_string(),
            latency_ms,
            status_code,
            timestamp: Utc::now(),
        };

        let max_requests = self.max_requests;
        let evicted = self
            .mutate(|doc| doc.push_request(record, max_requests))
            .await?;

        REQUESTS_RECORDED.inc();
        RECORDED_LATENCY.observe(latency_ms / 1000.0);
        debug!(
            endpoint = %endpoint,
            latency_ms = latency_ms,
            status_code = status_code,
            evicted = evicted,
            "request recorded"
        );
        Ok(())
    }

    pub async fn record_accuracy(&self, outcome: AccuracyOutcome) -> MetricsResult<()> {
        self.mutate(|doc| doc.accuracy.increment(outcome)).await?;
        ACCURACY_RECORDED.with_label_values(&[outcome.as_str()]).inc();
        debug!(result = %outcome, "accuracy recorded");
        Ok(())
    }

    /// Record an accuracy outcome given as free text. Unknown labels are
    /// logged and ignored: nothing is mutated or persisted and `Ok(None)`
    /// is returned.
    pub async fn record_accuracy_label(
        &self,
        result: &str,
    ) -> MetricsResult<Option<AccuracyOutcome>> {
        let Ok(outcome) = result.parse::<AccuracyOutcome>() else {
            warn!(result = %result, "ignoring invalid accuracy result");
            return Ok(None);
        };
        self.record_accuracy(outcome).await?;
        Ok(Some(outcome))
    }

    async fn mutate<T>(&self, apply: impl FnOnce(&mut MetricsDocument) -> T) -> MetricsResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.store.load().await;
        let out = apply(&mut doc);
        self.store.save(&doc).await?;
        Ok(out)
    }
}
