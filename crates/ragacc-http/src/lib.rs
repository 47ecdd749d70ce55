pub mod client;
pub mod protocol;
pub mod retry;

pub use client::{ClientConfig, HttpNoteService};
pub use retry::RetryPolicy;
