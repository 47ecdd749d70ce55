use std::time::Duration;

use ragacc_core::{Note, NoteService, Reply, RunIdentity, ServiceError, ServiceResult};
use tracing::debug;

use crate::protocol::{
    encode_segment, ChatRequest, ChatResponse, CreateNoteRequest, CreateNoteResponse, ErrorBody,
    CHAT_PATH, NOTES_PATH, SECRET_HEADER, USER_HEADER,
};
use crate::retry::RetryPolicy;

/// Longest error body kept in a `ServiceError::Status`.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub secret: String,
    pub note_timeout: Duration,
    pub ask_timeout: Duration,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret: secret.into(),
            note_timeout: Duration::from_secs(10),
            ask_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

/// Blocking client for the service's test side-channel.
pub struct HttpNoteService {
    agent: ureq::Agent,
    base_url: String,
    secret: String,
    note_timeout: Duration,
    ask_timeout: Duration,
    retry: RetryPolicy,
}

impl HttpNoteService {
    pub fn new(config: ClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(config.note_timeout)
            .user_agent(concat!("ragacc/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret: config.secret,
            note_timeout: config.note_timeout,
            ask_timeout: config.ask_timeout,
            retry: config.retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: &str,
        path: &str,
        run: &RunIdentity,
        timeout: Duration,
    ) -> ureq::Request {
        self.agent
            .request(method, &format!("{}{path}", self.base_url))
            .set("Content-Type", "application/json")
            .set(SECRET_HEADER, &self.secret)
            .set(USER_HEADER, run.as_str())
            .timeout(timeout)
    }

    fn create_once(&self, run: &RunIdentity, note: &Note) -> ServiceResult<String> {
        let body = CreateNoteRequest {
            title: &note.title,
            text: &note.text,
        };
        let resp = self
            .request("POST", NOTES_PATH, run, self.note_timeout)
            .send_json(&body)
            .map_err(|e| map_error(e, self.note_timeout))?;
        let parsed: CreateNoteResponse = resp
            .into_json()
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        parsed.note_id().ok_or(ServiceError::MissingId)
    }

    fn delete_once(&self, run: &RunIdentity, id: &str) -> ServiceResult<()> {
        let path = format!("{NOTES_PATH}/{}", encode_segment(id));
        match self
            .request("DELETE", &path, run, self.note_timeout)
            .call()
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(404 | 410, _)) => {
                debug!(%id, "note already gone");
                Ok(())
            }
            Err(e) => Err(map_error(e, self.note_timeout)),
        }
    }

    fn ask_once(&self, run: &RunIdentity, question: &str) -> ServiceResult<Reply> {
        let resp = self
            .request("POST", CHAT_PATH, run, self.ask_timeout)
            .send_json(&ChatRequest { message: question })
            .map_err(|e| map_error(e, self.ask_timeout))?;
        let parsed: ChatResponse = resp
            .into_json()
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        let text = parsed
            .text()
            .ok_or_else(|| ServiceError::Malformed("no response or answer field".into()))?;
        Ok(Reply {
            text: text.to_string(),
            source_count: parsed.sources.as_ref().map(Vec::len),
        })
    }
}

impl NoteService for HttpNoteService {
    /// A create that timed out or lost its connection may already be
    /// stored, and a retry would leave an untracked copy behind. Only
    /// explicit 429/5xx rejections are retried.
    fn create_note(&self, run: &RunIdentity, note: &Note) -> ServiceResult<String> {
        self.retry.run_if(
            "create note",
            || self.create_once(run, note),
            |e| matches!(e, ServiceError::Status { .. }),
        )
    }

    fn delete_note(&self, run: &RunIdentity, id: &str) -> ServiceResult<()> {
        self.retry.run("delete note", || self.delete_once(run, id))
    }

    fn ask(&self, run: &RunIdentity, question: &str) -> ServiceResult<Reply> {
        self.retry.run("ask", || self.ask_once(run, question))
    }
}

fn map_error(err: ureq::Error, timeout: Duration) -> ServiceError {
    match err {
        ureq::Error::Status(status, resp) => {
            let header_wait = resp
                .header("Retry-After")
                .and_then(|v| v.trim().parse::<f64>().ok());
            let body = resp.into_string().unwrap_or_default();
            let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let retry_after = header_wait
                .or(parsed.retry_after)
                .and_then(|s| Duration::try_from_secs_f64(s).ok())
                .or(parsed.retry_after_ms.map(Duration::from_millis));
            ServiceError::Status {
                status,
                body: truncate(&body, MAX_ERROR_BODY),
                retry_after,
            }
        }
        ureq::Error::Transport(t) => {
            if is_timeout(&t) {
                ServiceError::Timeout(timeout)
            } else {
                ServiceError::Transport(t.to_string())
            }
        }
    }
}

fn is_timeout(t: &ureq::Transport) -> bool {
    let io_timeout = std::error::Error::source(t)
        .and_then(|s| s.downcast_ref::<std::io::Error>())
        .is_some_and(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        });
    io_timeout || t.to_string().contains("timed out")
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
