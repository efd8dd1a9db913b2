//! Folding duplicate complaints into one record.
//!
//! The merged record lives at the smallest source id. Every joinable field
//! holds one segment per source in ascending id order, joined with `<br>`
//! (description: `" | "`). Multi-value fields are cleaned before joining,
//! so the fold is lossy for them. Attachment paths are pooled and
//! de-duplicated rather than segmented.

use casefold_core::codec::clean_field_value;
use casefold_core::field::{ATTACHMENT_JOINER, DESCRIPTION_JOINER, SEGMENT_JOINER};
use casefold_core::{ComplaintRecord, Field, FieldKind, FieldSet, FieldValue, RecordId};
use casefold_storage::{RecordStore, StorageError, StoreBatch};

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged_id: RecordId,
    /// Ids that were folded, ascending. Includes `merged_id`.
    pub source_ids: Vec<RecordId>,
    pub merged_fields: FieldSet,
    /// Source records as they were before the merge, ascending by id.
    pub snapshots: Vec<ComplaintRecord>,
}

/// Merge the records behind `ids` into the one with the smallest id and
/// delete the rest, as a single store batch.
pub fn merge_records<S: RecordStore + ?Sized>(
    store: &mut S,
    ids: &[RecordId],
) -> Result<MergeOutcome, EngineError> {
    let mut requested = ids.to_vec();
    requested.sort();
    requested.dedup();
    if requested.len() < 2 {
        return Err(EngineError::InsufficientOperands {
            supplied: requested.len(),
        });
    }

    let mut records = store.fetch_by_ids(&requested)?;
    if records.len() < 2 {
        return Err(EngineError::RecordsNotFound {
            requested: requested.len(),
            found: records.len(),
        });
    }
    records.sort_by_key(|r| r.id);

    let merged_id = records[0].id;
    let merged_fields = fold_fields(&records);

    let batch = records[1..]
        .iter()
        .fold(StoreBatch::new().update(merged_id, merged_fields.clone()), |batch, r| {
            batch.delete(r.id)
        });

    store
        .apply(&batch)
        .map_err(|e| merge_write_error(merged_id, e))?;

    let source_ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
    tracing::info!(%merged_id, sources = ?source_ids, "merged complaints");

    Ok(MergeOutcome {
        merged_id,
        source_ids,
        merged_fields,
        snapshots: records,
    })
}

/// Classify a failed merge-shaped batch: nothing applied is a clean failure,
/// anything else left duplicates behind.
pub(crate) fn merge_write_error(merged_id: RecordId, e: StorageError) -> EngineError {
    let applied = e.applied_steps();
    if applied == 0 {
        EngineError::StoreWriteFailure(e)
    } else {
        tracing::error!(%merged_id, applied, error = %e, "merge left the store partially written");
        EngineError::PartialMergeFailure {
            merged_id,
            applied,
            source: e,
        }
    }
}

/// Combine the field values of `records` (already sorted by id).
pub fn fold_fields(records: &[ComplaintRecord]) -> FieldSet {
    Field::ALL
        .iter()
        .map(|&field| (field, fold_field(field, records)))
        .collect()
}

fn fold_field(field: Field, records: &[ComplaintRecord]) -> FieldValue {
    let joined = match field.kind() {
        FieldKind::Scalar => join_segments(records, field, SEGMENT_JOINER, FieldValue::to_segment),
        FieldKind::Description => {
            join_segments(records, field, DESCRIPTION_JOINER, FieldValue::to_segment)
        }
        FieldKind::MultiValue => join_segments(records, field, SEGMENT_JOINER, clean_field_value),
        FieldKind::AttachmentPath => {
            merge_attachment_paths(records.iter().map(|r| r.get(field)))
        }
    };
    FieldValue::Text(joined)
}

fn join_segments(
    records: &[ComplaintRecord],
    field: Field,
    joiner: &str,
    render: fn(&FieldValue) -> String,
) -> String {
    records
        .iter()
        .map(|r| render(r.get(field)))
        .collect::<Vec<_>>()
        .join(joiner)
}

/// Pool comma-separated paths from every source, dropping blanks and
/// repeats. No paths at all gives the empty string.
pub fn merge_attachment_paths<'a>(values: impl IntoIterator<Item = &'a FieldValue>) -> String {
    let mut paths: Vec<String> = Vec::new();
    for value in values {
        let Some(text) = value.as_text() else {
            continue;
        };
        for path in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }
    }
    paths.join(ATTACHMENT_JOINER)
}
