pub mod corpus;
pub mod error;
pub mod harness;
pub mod matcher;
pub mod metrics;
pub mod note;
pub mod report;
pub mod run;
pub mod service;

pub use corpus::CorpusIssue;
pub use error::{HarnessError, HarnessResult, ServiceError, ServiceResult};
pub use harness::{run_accuracy, CancelFlag, Fixtures, Observer, RunOptions, Silent};
pub use metrics::{Classification, Metrics, Outcome};
pub use note::{Note, Reply, TestCase};
pub use report::{RunReport, TeardownFailure};
pub use run::{CreatedNote, RunContext, RunIdentity, DEFAULT_IDENTITY_PREFIX};
pub use service::NoteService;
