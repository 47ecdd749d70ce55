use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{Metrics, Outcome};
use crate::run::RunIdentity;

/// A note whose delete failed and needs manual reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownFailure {
    pub id: String,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub identity: RunIdentity,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub notes_loaded: usize,
    pub metrics: Metrics,
    pub outcomes: Vec<Outcome>,
    pub leaked: Vec<TeardownFailure>,
    pub interrupted: bool,
}

impl RunReport {
    pub fn correct(&self) -> usize {
        self.metrics.true_positives
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.correct)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
