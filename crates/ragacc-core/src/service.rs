use crate::error::ServiceResult;
use crate::note::{Note, Reply};
use crate::run::RunIdentity;

/// The test side-channel of the RAG service. Every call is scoped by the
/// run identity.
pub trait NoteService: Send + Sync {
    /// Create a note and return the id the service assigned.
    fn create_note(&self, run: &RunIdentity, note: &Note) -> ServiceResult<String>;

    /// Delete a note. Unknown or already-deleted ids succeed.
    fn delete_note(&self, run: &RunIdentity, id: &str) -> ServiceResult<()>;

    /// Ask a single-turn question against the run's notes.
    fn ask(&self, run: &RunIdentity, question: &str) -> ServiceResult<Reply>;
}
