use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a remote entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One entry of a flat, recursive source listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub kind: EntryKind,
    /// Display name of the final path segment.
    pub name: String,
    /// Provider's canonical lowercase path.
    pub path_lower: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
}

impl RemoteEntry {
    /// Creates a folder entry.
    pub fn folder(name: &str, path_lower: &str) -> Self {
        Self {
            kind: EntryKind::Folder,
            name: name.to_string(),
            path_lower: path_lower.to_string(),
            path_display: None,
            id: None,
            size: None,
            modified_time: None,
        }
    }

    /// Creates a file entry with the given size.
    pub fn file(name: &str, path_lower: &str, size: u64) -> Self {
        Self {
            kind: EntryKind::File,
            name: name.to_string(),
            path_lower: path_lower.to_string(),
            path_display: None,
            id: None,
            size: Some(size),
            modified_time: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// One page of a paginated listing.
///
/// `cursor` is `Some` while more pages remain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub entries: Vec<RemoteEntry>,
    pub cursor: Option<String>,
}
