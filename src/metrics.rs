// Self-instrumentation for the metrics subsystem
// Prometheus counters describing what the recorder and store are doing,
// exported in text format by the HTTP adapter

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

pub static REQUESTS_RECORDED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "metrics_requests_recorded_total",
        "request records appended to the metrics document"
    )
    .expect("register metrics_requests_recorded_total")
});

pub static RECORDED_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "metrics_recorded_latency_seconds",
        "latency of recorded requests"
    )
    .expect("register metrics_recorded_latency_seconds")
});

pub static ACCURACY_RECORDED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "metrics_accuracy_recorded_total",
        "accuracy outcomes recorded, by result",
        &["result"]
    )
    .expect("register metrics_accuracy_recorded_total")
});

pub static STORE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "metrics_store_errors_total",
        "metrics document load/save failures",
        &["op"]
    )
    .expect("register metrics_store_errors_total")
});

/// Render the default registry in the Prometheus text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    // Touch lazies so every family shows up even before first use
    Lazy::force(&REQUESTS_RECORDED);
    Lazy::force(&RECORDED_LATENCY);
    Lazy::force(&ACCURACY_RECORDED);
    Lazy::force(&STORE_ERRORS);

    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
