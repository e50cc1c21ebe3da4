// Latency aggregation
// Pure functions deriving latency percentiles, per-endpoint breakdowns and
// windowed request volumes from recorded requests

use crate::model::RequestRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of a set of latencies. Percentiles use the nearest-rank method
/// (`sorted[floor(n * p)]`) without interpolation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    #[serde(rename = "avg_latency_ms")]
    pub avg: f64,
    #[serde(rename = "p95_latency_ms")]
    pub p95: f64,
    #[serde(rename = "p99_latency_ms")]
    pub p99: f64,
    #[serde(rename = "min_latency_ms")]
    pub min: f64,
    #[serde(rename = "max_latency_ms")]
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStats {
    #[serde(flatten)]
    pub latency: LatencyStats,
    pub request_count: usize,
    /// Count of records per status code, keyed by the code's decimal form
    pub status_codes: BTreeMap<String, u64>,
}

pub fn latency_stats<'a, I>(records: I) -> LatencyStats
where
    I: IntoIterator<Item = &'a RequestRecord>,
{
    let mut latencies: Vec<f64> = records.into_iter().map(|r| r.latency_ms).collect();
    if latencies.is_empty() {
        return LatencyStats::default();
    }
    latencies.sort_by(|a, b| a.total_cmp(b));

    let n = latencies.len();
    let sum: f64 = latencies.iter().sum();
    LatencyStats {
        avg: round2(sum / n as f64),
        p95: round2(latencies[rank_index(n, 0.95)]),
        p99: round2(latencies[rank_index(n, 0.99)]),
        min: round2(latencies[0]),
        max: round2(latencies[n - 1]),
    }
}

pub fn per_endpoint_breakdown(records: &[RequestRecord]) -> BTreeMap<String, EndpointStats> {
    let mut groups: BTreeMap<&str, Vec<&RequestRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.endpoint.as_str()).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(endpoint, group)| {
            let mut status_codes = BTreeMap::new();
            for record in &group {
                *status_codes
                    .entry(record.status_code.to_string())
                    .or_insert(0u64) += 1;
            }
            let stats = EndpointStats {
                latency: latency_stats(group.iter().copied()),
                request_count: group.len(),
                status_codes,
            };
            (endpoint.to_string(), stats)
        })
        .collect()
}

/// Number of records with `timestamp >= now - window`
pub fn windowed_volume(records: &[RequestRecord], now: DateTime<Utc>, window: Duration) -> usize {
    let cutoff = now - window;
    records.iter().filter(|r| r.timestamp >= cutoff).count()
}

fn rank_index(n: usize, quantile: f64) -> usize {
    ((n as f64 * quantile).floor() as usize).min(n - 1)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
