//! Splitting a merged complaint back into one record per source.
//!
//! The victim name decides the source count K. Every other joinable field
//! must carry exactly K segments (or be null); a mismatch is refused before
//! anything is written. Reconstructed records get fresh ids.

use casefold_core::field::{MULTI_VALUE_JOINER, SEGMENT_JOINER};
use casefold_core::{ComplaintRecord, Field, FieldKind, FieldSet, FieldValue, RecordId};
use casefold_storage::{RecordStore, StorageError, StoreBatch};

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct UnmergeOutcome {
    pub merged_id: RecordId,
    /// Ids of the reconstructed records, in segment order.
    pub created_ids: Vec<RecordId>,
    /// Fields written for each reconstructed record, parallel to `created_ids`.
    pub created_fields: Vec<FieldSet>,
    /// The merged record as it was before the split.
    pub merged: ComplaintRecord,
}

/// Replace the merged record at `merged_id` with its reconstructed sources,
/// as a single store batch.
pub fn unmerge_record<S: RecordStore + ?Sized>(
    store: &mut S,
    merged_id: RecordId,
) -> Result<UnmergeOutcome, EngineError> {
    let merged = store
        .get(merged_id)?
        .ok_or(EngineError::RecordNotFound(merged_id))?;

    let parts = split_fields(&merged)?;
    let batch = parts
        .iter()
        .cloned()
        .fold(StoreBatch::new(), StoreBatch::insert)
        .delete(merged_id);

    let outcome = store
        .apply(&batch)
        .map_err(|e| unmerge_write_error(merged_id, e))?;

    tracing::info!(%merged_id, created = ?outcome.inserted, "unmerged complaint");

    Ok(UnmergeOutcome {
        merged_id,
        created_ids: outcome.inserted,
        created_fields: parts,
        merged,
    })
}

/// Classify a failed unmerge-shaped batch.
pub(crate) fn unmerge_write_error(merged_id: RecordId, e: StorageError) -> EngineError {
    let applied = e.applied_steps();
    if applied == 0 {
        EngineError::StoreWriteFailure(e)
    } else {
        tracing::error!(%merged_id, applied, error = %e, "unmerge left the store partially written");
        EngineError::PartialUnmergeFailure {
            merged_id,
            applied,
            source: e,
        }
    }
}

/// Split a merged record's fields into one field set per source.
pub fn split_fields(merged: &ComplaintRecord) -> Result<Vec<FieldSet>, EngineError> {
    let expected = segments(merged.get(Field::REFERENCE), SEGMENT_JOINER).len();
    if expected < 2 {
        return Err(EngineError::NotMerged(merged.id));
    }

    let mut split: Vec<(Field, Vec<String>)> = Vec::with_capacity(Field::ALL.len());
    for field in Field::ALL {
        let value = merged.get(field);
        let parts = match field.joiner() {
            Some(joiner) => {
                let parts = segments(value, joiner);
                if !parts.is_empty() && parts.len() != expected {
                    return Err(EngineError::SegmentCountMismatch {
                        record: merged.id,
                        field,
                        expected,
                        found: parts.len(),
                    });
                }
                parts
            }
            None => segments(value, ","),
        };
        split.push((field, parts));
    }

    let records = (0..expected)
        .map(|i| {
            split
                .iter()
                .map(|(field, parts)| {
                    let part = parts.get(i).map(String::as_str).unwrap_or("");
                    (*field, rebuild_value(*field, part))
                })
                .collect()
        })
        .collect();
    Ok(records)
}

/// Null has no segments; numbers are a single segment.
fn segments(value: &FieldValue, joiner: &str) -> Vec<String> {
    match value {
        FieldValue::Null => Vec::new(),
        FieldValue::Text(s) => s.split(joiner).map(str::to_string).collect(),
        other => vec![other.to_segment()],
    }
}

fn rebuild_value(field: Field, part: &str) -> FieldValue {
    let text = match field.kind() {
        FieldKind::Scalar | FieldKind::Description => part.to_string(),
        FieldKind::MultiValue => part
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(MULTI_VALUE_JOINER),
        FieldKind::AttachmentPath => part.trim().to_string(),
    };
    if text.is_empty() {
        FieldValue::Null
    } else {
        FieldValue::Text(text)
    }
}
