fn main() {
    println!("Run `cargo test -p checkpoint-compat` to execute checkpoint compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use docferry_checkpoint::{
        CaseStatus, CheckpointDocument, CheckpointStore, FileStatus,
    };
    use docferry_model::load_mappings;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Copies a fixture into `dir` as the checkpoint file and opens it.
    fn open_fixture(dir: &Path, name: &str) -> CheckpointStore {
        let path = dir.join("migration_checkpoint.json");
        fs::copy(fixtures_dir().join(name), &path).unwrap();
        CheckpointStore::open(path).unwrap()
    }

    #[test]
    fn legacy_checkpoint_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_fixture(tmp.path(), "legacy_checkpoint.json");

        assert!(store.is_case_completed("/Leads/Smith"));
        assert!(!store.is_case_completed("/Leads/Jones"));
        assert!(store.is_file_completed("/Leads/Smith", "/leads/smith/retainer.pdf"));
        assert!(!store.is_file_completed("/Leads/Smith", "/leads/smith/evidence/scan.png"));

        let smith = store.case("/Leads/Smith").unwrap();
        assert!(smith.folders.is_empty());
        let retainer = &smith.files["/leads/smith/retainer.pdf"];
        assert_eq!(retainer.destination_folder_id, Some(1842));
        let scan = &smith.files["/leads/smith/evidence/scan.png"];
        assert_eq!(scan.status, FileStatus::Failed);
        assert_eq!(scan.error_message.as_deref(), Some("Upload failed: 500"));
    }

    #[test]
    fn legacy_checkpoint_is_rewritten_with_current_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = open_fixture(tmp.path(), "legacy_checkpoint.json");

        store
            .record_folder("/Leads/Jones", "/leads/jones", 1900)
            .unwrap();

        let written = fs::read_to_string(store.path()).unwrap();
        assert!(!written.contains("clioFolderId"));
        assert!(!written.contains("\"error\""));
        assert!(written.contains("\"destinationFolderId\": 1842"));
        assert!(written.contains("\"errorMessage\": \"Upload failed: 500\""));

        let reopened = CheckpointStore::open(store.path()).unwrap();
        assert_eq!(reopened.folder_id("/Leads/Jones", "/leads/jones"), Some(1900));
        assert_eq!(
            reopened.case("/Leads/Jones").unwrap().status,
            CaseStatus::InProgress
        );
    }

    #[test]
    fn current_checkpoint_roundtrips() {
        let fixture = load_fixture("current_checkpoint.json");
        let parsed: CheckpointDocument = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize current_checkpoint.json: {e}"));
        let reserialized = serde_json::to_value(&parsed).unwrap();
        assert_eq!(fixture, reserialized);
    }

    #[test]
    fn current_checkpoint_folders_resume() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_fixture(tmp.path(), "current_checkpoint.json");

        assert_eq!(store.folder_id("/Leads/Smith", "/leads/smith"), Some(100));
        assert_eq!(
            store.folder_id("/Leads/Smith", "/leads/smith/evidence/photos"),
            Some(102)
        );
        assert_eq!(store.folder_id("/Leads/Smith", "/leads/smith/other"), None);
        let failed: Vec<_> = store
            .case("/Leads/Smith")
            .unwrap()
            .failed_files()
            .map(|(path, _)| path.clone())
            .collect();
        assert_eq!(failed, vec!["/leads/smith/evidence/photos/scan.png"]);
    }

    #[test]
    fn truncated_checkpoint_is_archived() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open_fixture(tmp.path(), "truncated_checkpoint.json");

        assert!(store.document().cases.is_empty());
        assert!(!store.path().exists());

        let archived: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].starts_with("migration_checkpoint.corrupt."));
        assert!(archived[0].ends_with(".json"));
    }

    #[test]
    fn legacy_mapping_input_loads() {
        let mappings = load_mappings(&fixtures_dir().join("legacy_mapping.json")).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].matter_id, 1204);
        assert_eq!(mappings[0].display_number, "01204-Smith");
        assert_eq!(mappings[0].source_folder_path, "/Leads/Smith");
        assert_eq!(mappings[1].label(), "1377");
    }
}
