// Persisted data model
// The metrics document is the single aggregate root written to disk:
// a bounded list of request records plus accuracy counters

use crate::errors::MetricsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default retention for `MetricsDocument::requests`
pub const DEFAULT_MAX_REQUESTS: usize = 1000;

/// One observed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub endpoint: String,
    pub latency_ms: f64,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyCounters {
    pub correct: u64,
    pub incorrect: u64,
    pub unknown: u64,
}

impl AccuracyCounters {
    pub fn increment(&mut self, outcome: AccuracyOutcome) {
        let slot = match outcome {
            AccuracyOutcome::Correct => &mut self.correct,
            AccuracyOutcome::Incorrect => &mut self.incorrect,
            AccuracyOutcome::Unknown => &mut self.unknown,
        };
        *slot = slot.saturating_add(1);
    }

    /// Sum of all observations, `None` on overflow
    pub fn total(&self) -> Option<u64> {
        self.correct
            .checked_add(self.incorrect)?
            .checked_add(self.unknown)
    }
}

/// Outcome of an accuracy check reported by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyOutcome {
    Correct,
    Incorrect,
    Unknown,
}

impl AccuracyOutcome {
    pub const ALL: [AccuracyOutcome; 3] = [Self::Correct, Self::Incorrect, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Incorrect => "incorrect",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AccuracyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccuracyOutcome {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|outcome| outcome.as_str() == s)
            .ok_or_else(|| MetricsError::InvalidAccuracy(s.to_string()))
    }
}

/// The persisted metrics document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    #[serde(default)]
    pub requests: Vec<RequestRecord>,
    #[serde(default)]
    pub accuracy: AccuracyCounters,
    pub created_at: DateTime<Utc>,
}

impl MetricsDocument {
    /// Fresh document with no requests and zeroed counters
    pub fn empty(created_at: DateTime<Utc>) -> Self {
        Self {
            requests: Vec::new(),
            accuracy: AccuracyCounters::default(),
            created_at,
        }
    }

    /// Append a record and evict the oldest entries beyond `max_requests`.
    /// Returns the number of evicted records.
    pub fn push_request(&mut self, record: RequestRecord, max_requests: usize) -> usize {
        self.requests.push(record);
        let excess = self.requests.len().saturating_sub(max_requests);
        if excess > 0 {
            self.requests.drain(..excess);
        }
        excess
    }
}
