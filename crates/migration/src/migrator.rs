//! Per-case migration state machine.

use std::collections::HashMap;

use docferry_checkpoint::CheckpointStore;
use docferry_model::{DestinationId, MappingEntry, ParentType, UploadTargets};
use docferry_schedule::{Clock, OffPeakWindow};
use docferry_transfer::{
    DEFAULT_MAX_PART_SIZE, DEFAULT_SINGLE_UPLOAD_THRESHOLD, UploadStrategy, plan_parts,
    reconcile_parts,
};
use docferry_tree::{FolderTree, Node};
use tracing::{debug, error, info, warn};

use crate::error::MigrationError;
use crate::provider::{DestinationProvider, SourceProvider, UploadRequest, list_tree};

/// Tunables of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    /// Name of the container created under each matter to hold the
    /// migrated hierarchy.
    pub root_folder_name: String,
    /// Files smaller than this are uploaded in one `PUT`.
    pub single_upload_threshold: u64,
    pub max_part_size: u64,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            root_folder_name: "Dropbox Migration".into(),
            single_upload_threshold: DEFAULT_SINGLE_UPLOAD_THRESHOLD,
            max_part_size: DEFAULT_MAX_PART_SIZE,
        }
    }
}

/// Result of [`Migrator::migrate_case`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    /// The checkpoint already marked the case completed; nothing was done.
    AlreadyCompleted,
    /// Every file was uploaded, skipped as already done, or recorded failed.
    Completed {
        uploaded: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Totals of a [`Migrator::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub already_completed: usize,
    pub files_uploaded: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    /// Cases aborted by a case-level error, with the error message.
    pub failed_cases: Vec<(String, String)>,
}

/// Drives cases from source to destination, one at a time.
pub struct Migrator<'a> {
    source: &'a dyn SourceProvider,
    destination: &'a dyn DestinationProvider,
    clock: &'a dyn Clock,
    window: Option<OffPeakWindow>,
    settings: MigrationSettings,
    checkpoint: CheckpointStore,
}

impl<'a> Migrator<'a> {
    /// Creates a migrator gated by the default off-peak window.
    pub fn new(
        source: &'a dyn SourceProvider,
        destination: &'a dyn DestinationProvider,
        clock: &'a dyn Clock,
        checkpoint: CheckpointStore,
    ) -> Self {
        Self {
            source,
            destination,
            clock,
            window: Some(OffPeakWindow::default()),
            settings: MigrationSettings::default(),
            checkpoint,
        }
    }

    /// Replaces the off-peak window; `None` disables the gate.
    pub fn with_window(mut self, window: Option<OffPeakWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn with_settings(mut self, settings: MigrationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    pub fn into_checkpoint(self) -> CheckpointStore {
        self.checkpoint
    }

    /// Migrates every mapping in order.
    ///
    /// A case-level failure is logged and leaves that case in progress; the
    /// run moves on to the next case.
    pub async fn run(&mut self, mappings: &[MappingEntry]) -> RunSummary {
        let mut summary = RunSummary::default();
        let total = mappings.len();

        for (i, mapping) in mappings.iter().enumerate() {
            info!(
                "[{}/{}] migrating {} into matter {}",
                i + 1,
                total,
                mapping.source_folder_path,
                mapping.label()
            );
            match self.migrate_case(mapping).await {
                Ok(CaseOutcome::AlreadyCompleted) => summary.already_completed += 1,
                Ok(CaseOutcome::Completed {
                    uploaded,
                    skipped,
                    failed,
                }) => {
                    summary.completed += 1;
                    summary.files_uploaded += uploaded;
                    summary.files_skipped += skipped;
                    summary.files_failed += failed;
                }
                Err(e) => {
                    error!(case = %mapping.source_folder_path, error = %e, "case migration failed");
                    summary
                        .failed_cases
                        .push((mapping.source_folder_path.clone(), e.to_string()));
                }
            }
        }

        info!(
            completed = summary.completed,
            already_completed = summary.already_completed,
            failed_cases = summary.failed_cases.len(),
            files_uploaded = summary.files_uploaded,
            files_failed = summary.files_failed,
            "migration run finished"
        );
        summary
    }

    /// Migrates one case.
    ///
    /// Per-file failures are recorded and do not abort the case. Any other
    /// error aborts it before completion; a later call resumes from folder
    /// recreation, reusing folders already recorded in the checkpoint.
    pub async fn migrate_case(
        &mut self,
        mapping: &MappingEntry,
    ) -> Result<CaseOutcome, MigrationError> {
        let case = mapping.source_folder_path.as_str();

        if self.checkpoint.is_case_completed(case) {
            info!(case, "case already completed, skipping");
            return Ok(CaseOutcome::AlreadyCompleted);
        }

        if let Some(window) = &self.window {
            window.wait(self.clock).await;
        }

        self.checkpoint.mark_case_started(case)?;

        let root_key = case.trim_end_matches('/').to_lowercase();
        let root_name = self.settings.root_folder_name.clone();
        let root_id = self
            .ensure_folder(
                case,
                &root_key,
                &root_name,
                mapping.matter_id,
                ParentType::Matter,
            )
            .await?;

        let tree = list_tree(self.source, case).await?;
        let folder_ids = self.recreate_folders(case, &tree, root_id).await?;

        let mut uploaded = 0;
        let mut skipped = 0;
        let mut failed = 0;

        for id in tree.files() {
            let Some(node) = tree.node(id) else {
                continue;
            };
            if self.checkpoint.is_file_completed(case, &node.path) {
                debug!(case, file = %node.path, "already uploaded, skipping");
                skipped += 1;
                continue;
            }

            let parent_id = tree
                .parent_path(&node.path)
                .and_then(|p| folder_ids.get(p).copied());
            let result = match parent_id {
                Some(parent_id) => self.upload_file(node, parent_id).await.map(|()| parent_id),
                None => Err(MigrationError::MissingParent(node.path.clone())),
            };

            match result {
                Ok(parent_id) => {
                    self.checkpoint
                        .mark_file_completed(case, &node.path, parent_id, self.clock.now())?;
                    info!(case, file = %node.path, "uploaded");
                    uploaded += 1;
                }
                Err(e) => {
                    self.checkpoint
                        .mark_file_failed(case, &node.path, &e.to_string())?;
                    warn!(case, file = %node.path, error = %e, "upload failed");
                    failed += 1;
                }
            }
        }

        self.checkpoint.mark_case_completed(case)?;
        info!(case, uploaded, skipped, failed, "case completed");
        Ok(CaseOutcome::Completed {
            uploaded,
            skipped,
            failed,
        })
    }

    /// Creates every folder of `tree` beneath `root_id`, parents first.
    /// Returns destination ids keyed by lowercase source path, root included.
    async fn recreate_folders(
        &mut self,
        case: &str,
        tree: &FolderTree,
        root_id: DestinationId,
    ) -> Result<HashMap<String, DestinationId>, MigrationError> {
        let mut ids = HashMap::from([(tree.root().path.clone(), root_id)]);

        for id in tree.folders_depth_first() {
            let Some(node) = tree.node(id) else {
                continue;
            };
            let parent_id = tree
                .parent_path(&node.path)
                .and_then(|p| ids.get(p).copied())
                .ok_or_else(|| MigrationError::MissingParent(node.path.clone()))?;
            let folder_id = self
                .ensure_folder(case, &node.path, &node.name, parent_id, ParentType::Folder)
                .await?;
            ids.insert(node.path.clone(), folder_id);
        }

        Ok(ids)
    }

    /// Returns the recorded destination id for `path`, creating and
    /// recording the folder first when there is none.
    async fn ensure_folder(
        &mut self,
        case: &str,
        path: &str,
        name: &str,
        parent_id: DestinationId,
        parent_type: ParentType,
    ) -> Result<DestinationId, MigrationError> {
        if let Some(id) = self.checkpoint.folder_id(case, path) {
            debug!(case, path, id, "reusing recorded folder");
            return Ok(id);
        }
        let id = self
            .destination
            .create_folder(name, parent_id, parent_type)
            .await?;
        self.checkpoint.record_folder(case, path, id)?;
        debug!(case, path, id, "created folder");
        Ok(id)
    }

    async fn upload_file(&self, node: &Node, parent_id: DestinationId) -> Result<(), MigrationError> {
        let size = node.size().unwrap_or(0);
        let strategy = UploadStrategy::for_size(size, self.settings.single_upload_threshold);
        let parts = match strategy {
            UploadStrategy::Single => Vec::new(),
            UploadStrategy::Multipart => plan_parts(size, self.settings.max_part_size)?,
        };

        let request = UploadRequest {
            name: node.name.clone(),
            parent_id,
            parent_type: ParentType::Folder,
            size,
            parts,
        };
        let upload = self.destination.initiate_upload(&request).await?;

        match (strategy, &upload.targets) {
            (UploadStrategy::Single, UploadTargets::Single(target)) => {
                let body = self.source.open_read_stream(&node.path, None).await?;
                self.destination.upload_bytes(target, body, size).await?;
            }
            (UploadStrategy::Multipart, UploadTargets::Multipart(targets)) => {
                let merged = reconcile_parts(&request.parts, targets)?;
                for part in &merged {
                    let range = part.part.range();
                    debug!(
                        file = %node.path,
                        part = part.part.part_number,
                        start = range.start,
                        end = range.end,
                        "uploading part"
                    );
                    let body = self.source.open_read_stream(&node.path, Some(range)).await?;
                    self.destination
                        .upload_bytes(&part.target, body, part.part.content_length)
                        .await?;
                }
            }
            (strategy, targets) => {
                return Err(MigrationError::TargetMismatch {
                    expected: strategy_name(strategy),
                    issued: targets_name(targets),
                });
            }
        }

        self.destination
            .finalize_upload(upload.document_id, &upload.upload_uuid)
            .await
    }
}

fn strategy_name(strategy: UploadStrategy) -> &'static str {
    match strategy {
        UploadStrategy::Single => "single",
        UploadStrategy::Multipart => "multipart",
    }
}

fn targets_name(targets: &UploadTargets) -> &'static str {
    match targets {
        UploadTargets::Single(_) => "single",
        UploadTargets::Multipart(_) => "multipart",
    }
}
