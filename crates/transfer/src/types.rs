use docferry_model::{ByteRange, PutTarget};
use serde::{Deserialize, Serialize};

/// One planned part of a multipart upload.
///
/// `start` and `end` are inclusive byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPart {
    pub part_number: u32,
    pub start: u64,
    pub end: u64,
    pub content_length: u64,
}

impl UploadPart {
    pub fn range(&self) -> ByteRange {
        ByteRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// A locally planned part joined with its provider-issued target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPart {
    pub part: UploadPart,
    pub target: PutTarget,
}

/// How a file of a given size is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    Single,
    Multipart,
}

impl UploadStrategy {
    /// `Single` below `threshold`, `Multipart` at or above it.
    pub fn for_size(size: u64, threshold: u64) -> Self {
        if size < threshold {
            UploadStrategy::Single
        } else {
            UploadStrategy::Multipart
        }
    }
}
