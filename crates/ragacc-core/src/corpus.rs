//! Offline self-consistency checks for a fixture corpus.

use std::collections::HashSet;
use std::fmt;

use crate::note::{Note, TestCase};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusIssue {
    EmptyAcceptedSet { question: String },
    BlankAcceptedForm { question: String },
    /// No accepted form appears in any note, so the case is unanswerable.
    Unanswerable { question: String },
    DuplicateQuestion { question: String },
    DuplicateTitle { title: String },
    EmptyNote { title: String },
}

impl fmt::Display for CorpusIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyAcceptedSet { question } => {
                write!(f, "no accepted answers for \"{question}\"")
            }
            Self::BlankAcceptedForm { question } => {
                write!(f, "blank accepted answer for \"{question}\"")
            }
            Self::Unanswerable { question } => {
                write!(f, "no note contains an accepted answer for \"{question}\"")
            }
            Self::DuplicateQuestion { question } => write!(f, "duplicate question \"{question}\""),
            Self::DuplicateTitle { title } => write!(f, "duplicate note title \"{title}\""),
            Self::EmptyNote { title } => write!(f, "note \"{title}\" has no text"),
        }
    }
}

/// Check every invariant the harness relies on. Empty result means valid.
pub fn validate(notes: &[Note], cases: &[TestCase]) -> Vec<CorpusIssue> {
    let mut issues = Vec::new();

    let mut titles = HashSet::new();
    for note in notes {
        if !titles.insert(note.title.as_str()) {
            issues.push(CorpusIssue::DuplicateTitle {
                title: note.title.clone(),
            });
        }
        if note.text.trim().is_empty() {
            issues.push(CorpusIssue::EmptyNote {
                title: note.title.clone(),
            });
        }
    }

    let lowered: Vec<String> = notes.iter().map(|n| n.text.to_lowercase()).collect();
    let mut questions = HashSet::new();
    for case in cases {
        let question = case.question.clone();
        if !questions.insert(case.question.as_str()) {
            issues.push(CorpusIssue::DuplicateQuestion {
                question: question.clone(),
            });
        }
        if case.accepted_answers.is_empty() {
            issues.push(CorpusIssue::EmptyAcceptedSet { question });
            continue;
        }
        if case.accepted_answers.iter().any(|a| a.trim().is_empty()) {
            issues.push(CorpusIssue::BlankAcceptedForm {
                question: question.clone(),
            });
        }
        let answerable = case
            .accepted_answers
            .iter()
            .filter(|a| !a.trim().is_empty())
            .any(|a| {
                let a = a.to_lowercase();
                lowered.iter().any(|text| text.contains(&a))
            });
        if !answerable {
            issues.push(CorpusIssue::Unanswerable { question });
        }
    }

    issues
}

/// Accepted forms that occur in more than one note. These can be matched by
/// a response that cites the wrong fact, so they deserve an audit when the
/// corpus is extended.
pub fn shared_forms(notes: &[Note], cases: &[TestCase]) -> Vec<(String, String, Vec<String>)> {
    let mut out = Vec::new();
    for case in cases {
        for form in &case.accepted_answers {
            let needle = form.to_lowercase();
            if needle.trim().is_empty() {
                continue;
            }
            let titles: Vec<String> = notes
                .iter()
                .filter(|n| n.text.to_lowercase().contains(&needle))
                .map(|n| n.title.clone())
                .collect();
            if titles.len() > 1 {
                out.push((case.question.clone(), form.clone(), titles));
            }
        }
    }
    out
}
