//! Wire types of the Dropbox v2 files API.

use chrono::{DateTime, Utc};
use docferry_model::{EntryKind, ListPage, RemoteEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ListFolderArg<'a> {
    pub path: &'a str,
    pub recursive: bool,
    pub include_media_info: bool,
    pub include_deleted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ListFolderContinueArg<'a> {
    pub cursor: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PathArg<'a> {
    pub path: &'a str,
}

/// Response of `list_folder` and `list_folder/continue`.
#[derive(Debug, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<Metadata>,
    pub cursor: String,
    pub has_more: bool,
}

/// One listing entry, tagged by `.tag`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub path_lower: String,
    #[serde(default)]
    pub path_display: Option<String>,
    pub id: String,
    pub size: u64,
    #[serde(default)]
    pub client_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FolderMetadata {
    pub name: String,
    pub path_lower: String,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedMetadata {
    pub name: String,
    #[serde(default)]
    pub path_lower: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TemporaryLink {
    pub link: String,
}

impl Metadata {
    /// Converts to a listing entry. Deleted entries have no counterpart.
    pub fn into_entry(self) -> Option<RemoteEntry> {
        match self {
            Metadata::File(f) => Some(RemoteEntry {
                kind: EntryKind::File,
                name: f.name,
                path_lower: f.path_lower,
                path_display: f.path_display,
                id: Some(f.id),
                size: Some(f.size),
                modified_time: f.client_modified,
            }),
            Metadata::Folder(f) => Some(RemoteEntry {
                kind: EntryKind::Folder,
                name: f.name,
                path_lower: f.path_lower,
                path_display: f.path_display,
                id: f.id,
                size: None,
                modified_time: None,
            }),
            Metadata::Deleted(_) => None,
        }
    }
}

impl From<ListFolderResult> for ListPage {
    fn from(result: ListFolderResult) -> Self {
        ListPage {
            entries: result
                .entries
                .into_iter()
                .filter_map(Metadata::into_entry)
                .collect(),
            cursor: result.has_more.then_some(result.cursor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "entries": [
            {".tag": "folder", "name": "Evidence", "path_lower": "/leads/smith/evidence",
             "path_display": "/Leads/Smith/Evidence", "id": "id:f1"},
            {".tag": "file", "name": "Scan.pdf", "path_lower": "/leads/smith/evidence/scan.pdf",
             "path_display": "/Leads/Smith/Evidence/Scan.pdf", "id": "id:a1", "size": 2048,
             "client_modified": "2023-11-02T09:15:00Z", "rev": "015f", "content_hash": "abc"},
            {".tag": "deleted", "name": "old.txt", "path_lower": "/leads/smith/old.txt"}
        ],
        "cursor": "AAE",
        "has_more": true
    }"#;

    #[test]
    fn page_converts_and_drops_deleted() {
        let result: ListFolderResult = serde_json::from_str(PAGE).unwrap();
        let page = ListPage::from(result);

        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].kind, EntryKind::Folder);
        assert_eq!(page.entries[0].name, "Evidence");
        let file = &page.entries[1];
        assert!(file.is_file());
        assert_eq!(file.size, Some(2048));
        assert_eq!(file.id.as_deref(), Some("id:a1"));
        assert!(file.modified_time.is_some());
        assert_eq!(page.cursor.as_deref(), Some("AAE"));
    }

    #[test]
    fn last_page_has_no_cursor() {
        let json = r#"{"entries": [], "cursor": "ZZZ", "has_more": false}"#;
        let result: ListFolderResult = serde_json::from_str(json).unwrap();
        assert!(ListPage::from(result).cursor.is_none());
    }
}
