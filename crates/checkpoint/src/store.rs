use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use docferry_model::DestinationId;
use tracing::{debug, warn};

use crate::CheckpointError;
use crate::document::{CaseRecord, CaseStatus, CheckpointDocument, FileRecord, FileStatus};

/// Durable progress ledger backed by one JSON file.
///
/// Reads are served from memory. Every mutation persists the full document
/// before returning.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    doc: CheckpointDocument,
}

impl CheckpointStore {
    /// Loads the ledger at `path`.
    ///
    /// A missing file yields an empty ledger. A file that fails to parse is
    /// renamed aside with a timestamped `.corrupt.` suffix and replaced by an
    /// empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let path = path.into();
        let doc = load_document(&path)?;
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory document.
    pub fn document(&self) -> &CheckpointDocument {
        &self.doc
    }

    pub fn case(&self, case: &str) -> Option<&CaseRecord> {
        self.doc.cases.get(case)
    }

    pub fn is_case_completed(&self, case: &str) -> bool {
        self.case(case)
            .is_some_and(|c| c.status == CaseStatus::Completed)
    }

    pub fn is_file_completed(&self, case: &str, file: &str) -> bool {
        self.case(case)
            .and_then(|c| c.files.get(file))
            .is_some_and(|f| f.status == FileStatus::Completed)
    }

    /// Destination id recorded for a source folder of `case`.
    pub fn folder_id(&self, case: &str, folder: &str) -> Option<DestinationId> {
        self.case(case).and_then(|c| c.folders.get(folder)).copied()
    }

    /// Creates the case record. No-op when it already exists.
    pub fn mark_case_started(&mut self, case: &str) -> Result<(), CheckpointError> {
        if self.doc.cases.contains_key(case) {
            return Ok(());
        }
        self.doc.cases.insert(case.to_string(), CaseRecord::new());
        self.persist()
    }

    pub fn mark_case_completed(&mut self, case: &str) -> Result<(), CheckpointError> {
        self.case_mut(case)?.status = CaseStatus::Completed;
        self.persist()
    }

    pub fn mark_file_completed(
        &mut self,
        case: &str,
        file: &str,
        destination_folder_id: DestinationId,
        timestamp: DateTime<Utc>,
    ) -> Result<(), CheckpointError> {
        let record = FileRecord {
            status: FileStatus::Completed,
            destination_folder_id: Some(destination_folder_id),
            timestamp,
            error_message: None,
        };
        self.case_mut(case)?.files.insert(file.to_string(), record);
        self.persist()
    }

    pub fn mark_file_failed(
        &mut self,
        case: &str,
        file: &str,
        message: &str,
    ) -> Result<(), CheckpointError> {
        let record = FileRecord {
            status: FileStatus::Failed,
            destination_folder_id: None,
            timestamp: Utc::now(),
            error_message: Some(message.to_string()),
        };
        self.case_mut(case)?.files.insert(file.to_string(), record);
        self.persist()
    }

    /// Remembers the destination id created for a source folder.
    pub fn record_folder(
        &mut self,
        case: &str,
        folder: &str,
        destination_id: DestinationId,
    ) -> Result<(), CheckpointError> {
        self.case_mut(case)?
            .folders
            .insert(folder.to_string(), destination_id);
        self.persist()
    }

    fn case_mut(&mut self, case: &str) -> Result<&mut CaseRecord, CheckpointError> {
        self.doc
            .cases
            .get_mut(case)
            .ok_or_else(|| CheckpointError::CaseNotStarted(case.to_string()))
    }

    /// Writes the whole document to a sibling temp file, then renames it over
    /// the ledger.
    fn persist(&self) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(&self.doc)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&self.path);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(cases = self.doc.cases.len(), path = ?self.path, "checkpoint persisted");
        Ok(())
    }
}

fn load_document(path: &Path) -> Result<CheckpointDocument, CheckpointError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CheckpointDocument::default());
        }
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str::<CheckpointDocument>(&data) {
        Ok(doc) => {
            debug!(cases = doc.cases.len(), path = ?path, "checkpoint loaded");
            Ok(doc)
        }
        Err(parse_err) => {
            let archived = corrupt_path(path, Utc::now());
            std::fs::rename(path, &archived)?;
            warn!(
                error = %parse_err,
                archived = %archived.display(),
                "checkpoint file was invalid JSON, archived it and starting fresh"
            );
            Ok(CheckpointDocument::default())
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// `<stem>.corrupt.<timestamp>.<ext>` next to the original file.
fn corrupt_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let ts = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "checkpoint".into());
    let name = match path.extension() {
        Some(ext) => format!("{stem}.corrupt.{ts}.{}", ext.to_string_lossy()),
        None => format!("{stem}.corrupt.{ts}"),
    };
    path.with_file_name(name)
}
