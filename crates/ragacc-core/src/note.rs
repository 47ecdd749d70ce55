use serde::{Deserialize, Serialize};

/// Authored fixture content. The service assigns the id on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub title: String,
    pub text: String,
}

impl Note {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// A question and the literal answer forms that count as correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub question: String,
    pub accepted_answers: Vec<String>,
}

impl TestCase {
    pub fn new<I, S>(question: impl Into<String>, accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question: question.into(),
            accepted_answers: accepted.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parsed answer of the ask endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Number of cited sources, when the service reports them.
    pub source_count: Option<usize>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_count: None,
        }
    }
}
