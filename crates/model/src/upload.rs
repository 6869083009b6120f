use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::DestinationId;

/// A stream of bytes read from the source provider.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Kind of destination container a folder or document is created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentType {
    Matter,
    Folder,
}

impl ParentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParentType::Matter => "Matter",
            ParentType::Folder => "Folder",
        }
    }
}

/// Inclusive byte range `[start, end]` of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Value for an HTTP `Range` header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A pre-signed destination for one `PUT` of raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutTarget {
    pub url: String,
    /// Headers that must accompany the `PUT`, in provider order.
    pub headers: Vec<(String, String)>,
}

/// A provider-issued upload target for one numbered part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTarget {
    pub part_number: u32,
    pub target: PutTarget,
}

/// Where the bytes of an initiated upload go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTargets {
    Single(PutTarget),
    Multipart(Vec<PartTarget>),
}

/// Result of initiating a document upload at the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedUpload {
    pub document_id: DestinationId,
    pub upload_uuid: String,
    pub targets: UploadTargets,
}
