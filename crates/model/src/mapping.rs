use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::DestinationId;

/// Assignment of one source folder to one destination case.
///
/// Accepts both the canonical field names and the ones used by the
/// existing migration input files (`display_number`, `folderPath`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub matter_id: DestinationId,
    #[serde(alias = "display_number", default)]
    pub display_number: String,
    #[serde(alias = "folderPath")]
    pub source_folder_path: String,
}

impl MappingEntry {
    /// Label used in log lines: the display number, or the matter id when blank.
    pub fn label(&self) -> String {
        if self.display_number.is_empty() {
            self.matter_id.to_string()
        } else {
            self.display_number.clone()
        }
    }
}

/// Reads a JSON array of mapping entries from disk.
pub fn load_mappings(path: &Path) -> std::io::Result<Vec<MappingEntry>> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_names() {
        let json = r#"[{"matterId":12,"displayNumber":"00012-Smith","sourceFolderPath":"/Leads/Smith"}]"#;
        let entries: Vec<MappingEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].matter_id, 12);
        assert_eq!(entries[0].display_number, "00012-Smith");
        assert_eq!(entries[0].source_folder_path, "/Leads/Smith");
    }

    #[test]
    fn parses_legacy_input_names() {
        let json = r#"[{"matterId":7,"display_number":"00007-Jones","folderPath":"/Leads/Jones"}]"#;
        let entries: Vec<MappingEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].display_number, "00007-Jones");
        assert_eq!(entries[0].source_folder_path, "/Leads/Jones");
    }

    #[test]
    fn label_falls_back_to_matter_id() {
        let entry = MappingEntry {
            matter_id: 99,
            display_number: String::new(),
            source_folder_path: "/x".into(),
        };
        assert_eq!(entry.label(), "99");
    }

    #[test]
    fn load_mappings_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mapping.json");
        std::fs::write(
            &path,
            r#"[{"matterId":1,"folderPath":"/a"},{"matterId":2,"folderPath":"/b"}]"#,
        )
        .unwrap();

        let entries = load_mappings(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].source_folder_path, "/b");
    }

    #[test]
    fn load_mappings_rejects_invalid_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mapping.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_mappings(&path).is_err());
    }
}
