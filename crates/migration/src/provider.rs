//! Provider seams consumed by the migrator.
//!
//! The binary implements these traits on top of the HTTP clients. Keeping
//! them as traits keeps the migrator decoupled from transport and testable
//! with mocks.

use std::future::Future;
use std::pin::Pin;

use docferry_model::{
    ByteRange, ByteStream, DestinationId, InitiatedUpload, ListPage, ParentType, PutTarget,
    RemoteEntry,
};
use docferry_transfer::UploadPart;
use docferry_tree::FolderTree;
use tracing::debug;

use crate::error::MigrationError;

/// Source storage holding the files to migrate.
pub trait SourceProvider: Send + Sync {
    /// Fetches one page of the recursive listing under `root`. `cursor` is
    /// `None` for the first page and the previous page's cursor afterwards.
    fn list_page(
        &self,
        root: &str,
        cursor: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<ListPage, MigrationError>> + Send + '_>>;

    /// Opens a byte stream over a file, optionally limited to `range`.
    fn open_read_stream(
        &self,
        path: &str,
        range: Option<ByteRange>,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream, MigrationError>> + Send + '_>>;
}

/// Document upload request passed to [`DestinationProvider::initiate_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub name: String,
    pub parent_id: DestinationId,
    pub parent_type: ParentType,
    pub size: u64,
    /// Planned parts for a multipart upload; empty for a single-shot upload.
    pub parts: Vec<UploadPart>,
}

/// Document-management system receiving the files.
pub trait DestinationProvider: Send + Sync {
    /// Creates a folder and returns its id.
    fn create_folder(
        &self,
        name: &str,
        parent_id: DestinationId,
        parent_type: ParentType,
    ) -> Pin<Box<dyn Future<Output = Result<DestinationId, MigrationError>> + Send + '_>>;

    /// Creates a document and obtains its upload targets.
    fn initiate_upload(
        &self,
        request: &UploadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InitiatedUpload, MigrationError>> + Send + '_>>;

    /// Sends exactly `content_length` raw bytes to one upload target.
    fn upload_bytes(
        &self,
        target: &PutTarget,
        body: ByteStream,
        content_length: u64,
    ) -> Pin<Box<dyn Future<Output = Result<(), MigrationError>> + Send + '_>>;

    /// Marks a document's uploaded version as complete.
    fn finalize_upload(
        &self,
        document_id: DestinationId,
        upload_uuid: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), MigrationError>> + Send + '_>>;
}

/// Lists everything under `root`, following cursors until the last page,
/// and builds the folder tree.
pub async fn list_tree(
    source: &dyn SourceProvider,
    root: &str,
) -> Result<FolderTree, MigrationError> {
    let mut entries: Vec<RemoteEntry> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = source.list_page(root, cursor.as_deref()).await?;
        pages += 1;
        entries.extend(page.entries);
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    debug!(root, pages, entries = entries.len(), "listed source tree");
    Ok(FolderTree::build(root, &entries))
}
