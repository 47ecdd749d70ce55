use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_IDENTITY_PREFIX: &str = "accuracy-test";

/// Isolation token sent with every request. The service scopes notes and
/// conversation state to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunIdentity(String);

impl RunIdentity {
    /// Fresh identity for this process invocation: `<prefix>-<pid>-<ulid>`.
    pub fn generate(prefix: &str) -> Self {
        let ulid = ulid::Ulid::new().to_string().to_lowercase();
        Self(format!("{prefix}-{}-{ulid}", std::process::id()))
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A note the service acknowledged for this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedNote {
    pub id: String,
    pub title: String,
}

/// Per-run state threaded through loading, querying and teardown.
#[derive(Debug)]
pub struct RunContext {
    identity: RunIdentity,
    created: Vec<CreatedNote>,
}

impl RunContext {
    pub fn new(identity: RunIdentity) -> Self {
        Self {
            identity,
            created: Vec::new(),
        }
    }

    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    pub fn record(&mut self, id: String, title: String) {
        self.created.push(CreatedNote { id, title });
    }

    pub fn created(&self) -> &[CreatedNote] {
        &self.created
    }

    /// Hand over every recorded note for deletion, leaving the context empty.
    pub fn drain_created(&mut self) -> Vec<CreatedNote> {
        std::mem::take(&mut self.created)
    }
}
