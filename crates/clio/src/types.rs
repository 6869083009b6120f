//! Wire types of the Clio v4 folders and documents endpoints.

use docferry_model::{
    DestinationId, InitiatedUpload, ParentType, PartTarget, PutTarget, UploadTargets,
};
use docferry_transfer::UploadPart;
use serde::{Deserialize, Serialize};

/// `{"data": ...}` envelope used by every Clio v4 endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub(crate) struct ParentRef {
    pub id: DestinationId,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ParentRef {
    pub fn new(id: DestinationId, parent_type: ParentType) -> Self {
        Self {
            id,
            kind: parent_type.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewFolder<'a> {
    pub name: &'a str,
    pub parent: ParentRef,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewDocument<'a> {
    pub name: &'a str,
    pub parent: ParentRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiparts: Option<&'a [UploadPart]>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FinalizeVersion<'a> {
    pub uuid: &'a str,
    pub fully_uploaded: bool,
}

#[derive(Debug, Deserialize)]
pub struct Created {
    pub id: DestinationId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Multipart {
    pub part_number: u32,
    pub put_url: String,
    #[serde(default)]
    pub put_headers: Vec<HeaderPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentVersion {
    pub uuid: String,
    #[serde(default)]
    pub put_url: Option<String>,
    #[serde(default)]
    pub put_headers: Vec<HeaderPair>,
    #[serde(default)]
    pub multiparts: Option<Vec<Multipart>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub id: DestinationId,
    pub latest_document_version: DocumentVersion,
}

fn headers(pairs: Vec<HeaderPair>) -> Vec<(String, String)> {
    pairs.into_iter().map(|h| (h.name, h.value)).collect()
}

impl Document {
    /// Extracts the upload targets. Returns `None` when the version carries
    /// neither a `put_url` nor any multiparts.
    pub fn into_initiated(self) -> Option<InitiatedUpload> {
        let version = self.latest_document_version;
        let targets = match version.multiparts {
            Some(parts) if !parts.is_empty() => UploadTargets::Multipart(
                parts
                    .into_iter()
                    .map(|p| PartTarget {
                        part_number: p.part_number,
                        target: PutTarget {
                            url: p.put_url,
                            headers: headers(p.put_headers),
                        },
                    })
                    .collect(),
            ),
            _ => UploadTargets::Single(PutTarget {
                url: version.put_url?,
                headers: headers(version.put_headers),
            }),
        };
        Some(InitiatedUpload {
            document_id: self.id,
            upload_uuid: version.uuid,
            targets,
        })
    }
}
