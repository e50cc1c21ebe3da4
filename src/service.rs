// Metrics service facade
// Wires one store into a recorder and a reporter from injected configuration

use crate::config::MetricsConfig;
use crate::recorder::Recorder;
use crate::report::Reporter;
use crate::store::MetricsStore;
use std::sync::Arc;
use tracing::info;

/// Cheap-to-clone handle shared by the HTTP adapter and request middleware
#[derive(Clone)]
pub struct MetricsService {
    store: Arc<MetricsStore>,
    recorder: Arc<Recorder>,
    reporter: Arc<Reporter>,
}

impl MetricsService {
    pub fn new(config: &MetricsConfig) -> Self {
        let store = Arc::new(MetricsStore::new(config.storage_path.clone()));
        let recorder = Arc::new(Recorder::new(store.clone(), config.max_requests));
        let reporter = Arc::new(Reporter::new(
            store.clone(),
            recorder.clone(),
            config.volume_window(),
        ));
        info!(
            path = %store.path().display(),
            max_requests = recorder.max_requests(),
            window_days = config.volume_window_days,
            "metrics service initialized"
        );
        Self {
            store,
            recorder,
            reporter,
        }
    }

    pub fn store(&self) -> &Arc<MetricsStore> {
        &self.store
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    pub fn reporter(&self) -> &Arc<Reporter> {
        &self.reporter
    }
}
