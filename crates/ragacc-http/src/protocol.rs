use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Test side-channel wire types
// ---------------------------------------------------------------------------

pub const NOTES_PATH: &str = "/_internal/test/notes";
pub const CHAT_PATH: &str = "/_internal/test/chat";

pub const SECRET_HEADER: &str = "X-Test-Secret";
pub const USER_HEADER: &str = "X-Test-User-Id";

#[derive(Debug, Serialize)]
pub struct CreateNoteRequest<'a> {
    pub title: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteResponse {
    #[serde(default)]
    pub id: Option<Value>,
}

impl CreateNoteResponse {
    /// The assigned id, accepting string or numeric ids. Blank is absent.
    pub fn note_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// The test endpoint answers in `response`; the public chat format uses
/// `answer` plus `sources`.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<Value>>,
}

impl ChatResponse {
    pub fn text(&self) -> Option<&str> {
        self.response.as_deref().or(self.answer.as_deref())
    }
}

/// Error body shape; 429 responses may carry `retryAfter` in seconds.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub retry_after: Option<f64>,
    #[serde(default)]
    pub retry_after_ms: Option<u64>,
}

/// Percent-encode a single path segment.
pub fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_id_forms() {
        let r: CreateNoteResponse = serde_json::from_value(json!({"id": "abc123"})).unwrap();
        assert_eq!(r.note_id().as_deref(), Some("abc123"));

        let r: CreateNoteResponse = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(r.note_id().as_deref(), Some("42"));

        let r: CreateNoteResponse = serde_json::from_value(json!({"id": ""})).unwrap();
        assert!(r.note_id().is_none());

        let r: CreateNoteResponse = serde_json::from_value(json!({"ok": true})).unwrap();
        assert!(r.note_id().is_none());
    }

    #[test]
    fn test_chat_response_prefers_response_field() {
        let r: ChatResponse =
            serde_json::from_value(json!({"response": "52 wins", "answer": "other"})).unwrap();
        assert_eq!(r.text(), Some("52 wins"));

        let r: ChatResponse = serde_json::from_value(json!({
            "answer": "Built in 1987 [1]",
            "sources": [{"id": "1", "noteId": "n1"}]
        }))
        .unwrap();
        assert_eq!(r.text(), Some("Built in 1987 [1]"));
        assert_eq!(r.sources.map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("abc-123_x.y~z"), "abc-123_x.y~z");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }
}
