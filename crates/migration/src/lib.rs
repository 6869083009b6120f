//! Checkpointed, resumable migration of source folder trees into
//! destination cases.
//!
//! [`Migrator`] drives one case at a time: it waits for the off-peak window,
//! recreates the folder hierarchy under a per-case root container, then
//! uploads every file, recording each outcome in the checkpoint so an
//! interrupted run resumes where it stopped.

mod error;
mod migrator;
mod provider;

pub use error::MigrationError;
pub use migrator::{CaseOutcome, MigrationSettings, Migrator, RunSummary};
pub use provider::{DestinationProvider, SourceProvider, UploadRequest, list_tree};
