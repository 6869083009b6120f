//! Shared data types for the docferry migration engine.
//!
//! Everything that crosses a crate boundary lives here: remote listing
//! entries from the source provider, the case mapping supplied by the
//! caller, and the upload descriptors issued by the destination provider.

pub mod entry;
pub mod mapping;
pub mod upload;

pub use entry::{EntryKind, ListPage, RemoteEntry};
pub use mapping::{MappingEntry, load_mappings};
pub use upload::{
    ByteRange, ByteStream, InitiatedUpload, ParentType, PartTarget, PutTarget, UploadTargets,
};

/// Identifier issued by the destination document-management API.
pub type DestinationId = u64;
