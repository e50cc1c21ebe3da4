// Library root module for request-metrics
// Durable rolling store of request telemetry and accuracy outcomes with
// latency aggregation and reporting

pub mod aggregate;
pub mod api;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod recorder;
pub mod report;
pub mod service;
pub mod store;

pub use errors::{MetricsError, MetricsResult};
pub use service::MetricsService;
