use std::time::Duration;

use thiserror::Error;

/// Failure of a single call to the service under test.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("service returned HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
        /// Server-requested delay before retrying (429 responses).
        retry_after: Option<Duration>,
    },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response carried no note id")]
    MissingId,
}

impl ServiceError {
    /// Transport errors, timeouts, 5xx and 429 are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Malformed(_) | Self::MissingId => false,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Fatal outcomes of a harness run. Query and teardown failures are not
/// here: they are absorbed into the report.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to create note \"{title}\": {source}")]
    Setup {
        title: String,
        #[source]
        source: ServiceError,
    },

    #[error("run interrupted while loading fixtures ({created} notes created)")]
    Interrupted { created: usize },
}

pub type HarnessResult<T> = Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ServiceError {
        ServiceError::Status {
            status: code,
            body: String::new(),
            retry_after: None,
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::Transport("connection refused".into()).is_transient());
        assert!(ServiceError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(401).is_transient());
        assert!(!ServiceError::MissingId.is_transient());
    }

    #[test]
    fn test_setup_error_names_the_note() {
        let err = HarnessError::Setup {
            title: "Apollo 11 Mission Details".into(),
            source: ServiceError::MissingId,
        };
        let msg = err.to_string();
        assert!(msg.contains("Apollo 11 Mission Details"));
        assert!(msg.contains("no note id"));
    }
}
