use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use docferry_model::DestinationId;
use serde::{Deserialize, Serialize};

/// Root persisted object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDocument {
    /// Keyed by the case's source folder path as given in the mapping.
    #[serde(default)]
    pub cases: BTreeMap<String, CaseRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStatus {
    InProgress,
    Completed,
}

/// Progress of one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub status: CaseStatus,
    /// Keyed by the file's lowercase source path.
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
    /// Destination ids of folders already created for this case, keyed by
    /// lowercase source folder path. The case root is keyed by its own path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub folders: BTreeMap<String, DestinationId>,
}

impl CaseRecord {
    pub(crate) fn new() -> Self {
        Self {
            status: CaseStatus::InProgress,
            files: BTreeMap::new(),
            folders: BTreeMap::new(),
        }
    }

    /// Files whose last recorded attempt failed.
    pub fn failed_files(&self) -> impl Iterator<Item = (&String, &FileRecord)> {
        self.files
            .iter()
            .filter(|(_, record)| record.status == FileStatus::Failed)
    }

    pub fn completed_file_count(&self) -> usize {
        self.files
            .values()
            .filter(|record| record.status == FileStatus::Completed)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Completed,
    Failed,
}

/// Outcome of the last upload attempt of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub status: FileStatus,
    #[serde(
        default,
        alias = "clioFolderId",
        skip_serializing_if = "Option::is_none"
    )]
    pub destination_folder_id: Option<DestinationId>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_status_uses_kebab_case() {
        let json = serde_json::to_string(&CaseStatus::InProgress).unwrap();
        assert_eq!(json, r#""in-progress""#);
    }

    #[test]
    fn legacy_file_record_keys_are_accepted() {
        let json = r#"{"status":"failed","error":"Upload failed: 500","timestamp":"2024-05-01T10:00:00.000Z"}"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, FileStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("Upload failed: 500"));

        let json = r#"{"status":"completed","clioFolderId":77,"timestamp":"2024-05-01T10:00:00.000Z"}"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.destination_folder_id, Some(77));
    }

    #[test]
    fn file_record_writes_canonical_keys() {
        let record = FileRecord {
            status: FileStatus::Completed,
            destination_folder_id: Some(5),
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            error_message: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["destinationFolderId"], 5);
        assert!(json.get("errorMessage").is_none());
    }

    #[test]
    fn case_without_folders_parses() {
        let json = r#"{"status":"completed","files":{}}"#;
        let record: CaseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, CaseStatus::Completed);
        assert!(record.folders.is_empty());
    }
}
