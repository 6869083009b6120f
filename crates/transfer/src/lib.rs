//! Byte-range planning for single-shot and multipart uploads.
//!
//! Part ranges are re-derivable from `(file_size, max_part_size)` alone, so
//! local byte offsets stay authoritative for reading source data while the
//! destination provider supplies the upload targets for each part.

mod parts;
mod reconcile;
mod types;

pub use parts::plan_parts;
pub use reconcile::reconcile_parts;
pub use types::{MergedPart, UploadPart, UploadStrategy};

/// Default maximum part size: 30 MiB.
pub const DEFAULT_MAX_PART_SIZE: u64 = 30 * 1024 * 1024;

/// Smallest non-final part object stores accept: 5 MiB.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Most parts one multipart upload may have.
pub const MAX_PARTS: u64 = 10_000;

/// Files at or above this size use multipart upload: 100 MiB.
pub const DEFAULT_SINGLE_UPLOAD_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("max part size must be greater than zero")]
    InvalidPartSize,

    #[error("{0} parts exceed the limit of {max}", max = MAX_PARTS)]
    TooManyParts(u64),

    #[error("no local range for provider part {0}")]
    UnmatchedPart(u32),
}
