use crate::{MAX_PARTS, TransferError};
use crate::types::UploadPart;

/// Partitions `[0, size)` into consecutive 1-indexed parts of at most
/// `max_part_size` bytes; only the last part may be shorter.
///
/// Plans needing more than [`MAX_PARTS`] parts are rejected before anything
/// is allocated.
pub fn plan_parts(size: u64, max_part_size: u64) -> Result<Vec<UploadPart>, TransferError> {
    if max_part_size == 0 {
        return Err(TransferError::InvalidPartSize);
    }

    let count = size.div_ceil(max_part_size);
    if count > MAX_PARTS {
        return Err(TransferError::TooManyParts(count));
    }

    let mut parts = Vec::with_capacity(count as usize);
    let mut start = 0u64;
    let mut part_number = 1u32;

    while start < size {
        let end = start.saturating_add(max_part_size).min(size) - 1;
        parts.push(UploadPart {
            part_number,
            start,
            end,
            content_length: end - start + 1,
        });
        start = end + 1;
        part_number += 1;
    }

    Ok(parts)
}
