use docferry_model::PartTarget;

use crate::TransferError;
use crate::types::{MergedPart, UploadPart};

/// Joins provider part targets with locally planned ranges by part number.
///
/// Local offsets are authoritative; the provider only contributes targets.
/// A provider part with no local counterpart means the two sides disagree
/// about the part size and the file cannot be uploaded.
pub fn reconcile_parts(
    local: &[UploadPart],
    provider: &[PartTarget],
) -> Result<Vec<MergedPart>, TransferError> {
    let mut merged = provider
        .iter()
        .map(|remote| {
            local
                .iter()
                .find(|p| p.part_number == remote.part_number)
                .map(|part| MergedPart {
                    part: *part,
                    target: remote.target.clone(),
                })
                .ok_or(TransferError::UnmatchedPart(remote.part_number))
        })
        .collect::<Result<Vec<_>, _>>()?;

    merged.sort_by_key(|m| m.part.part_number);
    Ok(merged)
}
