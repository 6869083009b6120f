//! Binds the HTTP clients to the migrator's provider traits.

use std::future::Future;
use std::pin::Pin;

use docferry_migration::{DestinationProvider, MigrationError, SourceProvider, UploadRequest};
use docferry_model::{
    ByteRange, ByteStream, DestinationId, InitiatedUpload, ListPage, ParentType, PutTarget,
};

/// Dropbox as the migration source.
pub struct DropboxSource {
    client: docferry_dropbox::Client,
}

impl DropboxSource {
    pub fn new(client: docferry_dropbox::Client) -> Self {
        Self { client }
    }
}

fn source_error(e: docferry_dropbox::Error) -> MigrationError {
    MigrationError::Source(e.to_string())
}

impl SourceProvider for DropboxSource {
    fn list_page(
        &self,
        root: &str,
        cursor: Option<&str>,
    ) -> Pin<Box<dyn Future<Output = Result<ListPage, MigrationError>> + Send + '_>> {
        let root = root.to_string();
        let cursor = cursor.map(str::to_string);
        Box::pin(async move {
            self.client
                .list_page(&root, cursor.as_deref())
                .await
                .map_err(source_error)
        })
    }

    fn open_read_stream(
        &self,
        path: &str,
        range: Option<ByteRange>,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream, MigrationError>> + Send + '_>> {
        let path = path.to_string();
        Box::pin(async move {
            self.client
                .download(&path, range)
                .await
                .map_err(source_error)
        })
    }
}

/// Clio as the migration destination.
pub struct ClioDestination {
    client: docferry_clio::Client,
}

impl ClioDestination {
    pub fn new(client: docferry_clio::Client) -> Self {
        Self { client }
    }
}

fn destination_error(e: docferry_clio::Error) -> MigrationError {
    MigrationError::Destination(e.to_string())
}

impl DestinationProvider for ClioDestination {
    fn create_folder(
        &self,
        name: &str,
        parent_id: DestinationId,
        parent_type: ParentType,
    ) -> Pin<Box<dyn Future<Output = Result<DestinationId, MigrationError>> + Send + '_>> {
        let name = name.to_string();
        Box::pin(async move {
            self.client
                .create_folder(&name, parent_id, parent_type)
                .await
                .map_err(destination_error)
        })
    }

    fn initiate_upload(
        &self,
        request: &UploadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InitiatedUpload, MigrationError>> + Send + '_>> {
        let request = request.clone();
        Box::pin(async move {
            let parts = (!request.parts.is_empty()).then_some(request.parts.as_slice());
            self.client
                .initiate_upload(&request.name, request.parent_id, request.parent_type, parts)
                .await
                .map_err(destination_error)
        })
    }

    fn upload_bytes(
        &self,
        target: &PutTarget,
        body: ByteStream,
        content_length: u64,
    ) -> Pin<Box<dyn Future<Output = Result<(), MigrationError>> + Send + '_>> {
        let target = target.clone();
        Box::pin(async move {
            self.client
                .upload_bytes(&target, body, content_length)
                .await
                .map_err(destination_error)
        })
    }

    fn finalize_upload(
        &self,
        document_id: DestinationId,
        upload_uuid: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), MigrationError>> + Send + '_>> {
        let upload_uuid = upload_uuid.to_string();
        Box::pin(async move {
            self.client
                .finalize_upload(document_id, &upload_uuid)
                .await
                .map_err(destination_error)
        })
    }
}
