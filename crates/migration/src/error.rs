//! Migration error types.

use docferry_checkpoint::CheckpointError;
use docferry_transfer::TransferError;

/// Errors produced while migrating a case or one of its files.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("source error: {0}")]
    Source(String),

    #[error("destination error: {0}")]
    Destination(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("no destination folder for {0}")]
    MissingParent(String),

    #[error("expected {expected} upload targets, destination issued {issued}")]
    TargetMismatch {
        expected: &'static str,
        issued: &'static str,
    },
}
