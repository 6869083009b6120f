//! Crash-recoverable migration progress ledger.
//!
//! Progress is kept at case and file granularity in a single JSON document.
//! Every mutation rewrites the whole document atomically, so the file on
//! disk only ever reflects fully completed mutations.

mod document;
mod store;

pub use document::{CaseRecord, CaseStatus, CheckpointDocument, FileRecord, FileStatus};
pub use store::CheckpointStore;

/// Errors from checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("case not initialized: {0}")]
    CaseNotStarted(String),
}
