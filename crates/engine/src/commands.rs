//! Reversible record operations kept on the engine's history.
//!
//! Every command stores the ids produced by its latest run, so a redo that
//! assigns fresh ids (unmerge) still undoes cleanly afterwards.

use casefold_core::{ComplaintRecord, FieldSet, RecordId};
use casefold_storage::{RecordStore, StoreBatch};

use crate::error::EngineError;
use crate::history::Command;
use crate::merge::{merge_records, merge_write_error, MergeOutcome};
use crate::unmerge::{unmerge_record, unmerge_write_error, UnmergeOutcome};

#[derive(Debug, Clone)]
pub struct MergeCommand {
    source_ids: Vec<RecordId>,
    merged_id: RecordId,
    snapshots: Vec<ComplaintRecord>,
    merged_fingerprint: [u8; 32],
}

impl MergeCommand {
    /// Build from a merge that has just been applied to `store`. The merge
    /// is already committed, so this never fails: when the merged record
    /// cannot be read back the fingerprint comes from the written fields.
    pub fn capture<S: RecordStore + ?Sized>(store: &S, outcome: MergeOutcome) -> Self {
        let merged_fingerprint =
            written_fingerprint(store, outcome.merged_id, &outcome.merged_fields);
        Self {
            source_ids: outcome.source_ids,
            merged_id: outcome.merged_id,
            snapshots: outcome.snapshots,
            merged_fingerprint,
        }
    }

    pub fn merged_id(&self) -> RecordId {
        self.merged_id
    }

    pub fn source_ids(&self) -> &[RecordId] {
        &self.source_ids
    }
}

impl<S: RecordStore + ?Sized> Command<S> for MergeCommand {
    fn label(&self) -> &'static str {
        "merge"
    }

    fn forward(&mut self, store: &mut S) -> Result<(), EngineError> {
        let outcome = merge_records(store, &self.source_ids)?;
        *self = Self::capture(store, outcome);
        Ok(())
    }

    fn backward(&mut self, store: &mut S) -> Result<(), EngineError> {
        if fingerprint_of(store, self.merged_id)? != self.merged_fingerprint {
            tracing::warn!(merged_id = %self.merged_id, "refusing to undo merge of an edited record");
            return Err(EngineError::RecordDrifted(self.merged_id));
        }
        let Some((target, others)) = self.snapshots.split_first() else {
            return Err(EngineError::RecordNotFound(self.merged_id));
        };
        let batch = others.iter().cloned().fold(
            StoreBatch::new().update(target.id, target.fields.complete()),
            StoreBatch::restore,
        );
        store
            .apply(&batch)
            .map_err(|e| unmerge_write_error(self.merged_id, e))?;
        tracing::info!(merged_id = %self.merged_id, restored = ?self.source_ids, "merge undone");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UnmergeCommand {
    merged: ComplaintRecord,
    created_ids: Vec<RecordId>,
    created_fingerprints: Vec<[u8; 32]>,
}

impl UnmergeCommand {
    /// Build from an unmerge that has just been applied to `store`. Like
    /// [`MergeCommand::capture`] this falls back to the written fields.
    pub fn capture<S: RecordStore + ?Sized>(store: &S, outcome: UnmergeOutcome) -> Self {
        let created_fingerprints = outcome
            .created_ids
            .iter()
            .zip(&outcome.created_fields)
            .map(|(id, fields)| written_fingerprint(store, *id, fields))
            .collect();
        Self {
            merged: outcome.merged,
            created_ids: outcome.created_ids,
            created_fingerprints,
        }
    }

    pub fn merged_id(&self) -> RecordId {
        self.merged.id
    }

    pub fn created_ids(&self) -> &[RecordId] {
        &self.created_ids
    }
}

impl<S: RecordStore + ?Sized> Command<S> for UnmergeCommand {
    fn label(&self) -> &'static str {
        "unmerge"
    }

    fn forward(&mut self, store: &mut S) -> Result<(), EngineError> {
        let outcome = unmerge_record(store, self.merged.id)?;
        *self = Self::capture(store, outcome);
        Ok(())
    }

    fn backward(&mut self, store: &mut S) -> Result<(), EngineError> {
        for (id, expected) in self.created_ids.iter().zip(&self.created_fingerprints) {
            if fingerprint_of(store, *id)? != *expected {
                tracing::warn!(record = %id, "refusing to undo unmerge of an edited record");
                return Err(EngineError::RecordDrifted(*id));
            }
        }
        let batch = self
            .created_ids
            .iter()
            .fold(StoreBatch::new(), |batch, id| batch.delete(*id))
            .restore(self.merged.clone());
        store
            .apply(&batch)
            .map_err(|e| merge_write_error(self.merged.id, e))?;
        tracing::info!(merged_id = %self.merged.id, removed = ?self.created_ids, "unmerge undone");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeleteCommand {
    snapshot: ComplaintRecord,
}

impl DeleteCommand {
    /// Snapshot the record at `id` ahead of deleting it.
    pub fn prepare<S: RecordStore + ?Sized>(store: &S, id: RecordId) -> Result<Self, EngineError> {
        let snapshot = store.get(id)?.ok_or(EngineError::RecordNotFound(id))?;
        Ok(Self { snapshot })
    }

    pub fn id(&self) -> RecordId {
        self.snapshot.id
    }
}

impl<S: RecordStore + ?Sized> Command<S> for DeleteCommand {
    fn label(&self) -> &'static str {
        "delete"
    }

    fn forward(&mut self, store: &mut S) -> Result<(), EngineError> {
        let id = self.snapshot.id;
        self.snapshot = store.get(id)?.ok_or(EngineError::RecordNotFound(id))?;
        store
            .apply(&StoreBatch::new().delete(id))
            .map_err(EngineError::StoreWriteFailure)?;
        tracing::debug!(%id, "deleted complaint");
        Ok(())
    }

    fn backward(&mut self, store: &mut S) -> Result<(), EngineError> {
        store
            .apply(&StoreBatch::new().restore(self.snapshot.clone()))
            .map_err(EngineError::StoreWriteFailure)?;
        tracing::debug!(id = %self.snapshot.id, "restored complaint");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EditCommand {
    id: RecordId,
    changes: FieldSet,
    previous: FieldSet,
}

impl EditCommand {
    pub fn new(id: RecordId, changes: FieldSet) -> Self {
        Self {
            id,
            changes,
            previous: FieldSet::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn changes(&self) -> &FieldSet {
        &self.changes
    }
}

impl<S: RecordStore + ?Sized> Command<S> for EditCommand {
    fn label(&self) -> &'static str {
        "edit"
    }

    fn forward(&mut self, store: &mut S) -> Result<(), EngineError> {
        let current = store
            .get(self.id)?
            .ok_or(EngineError::RecordNotFound(self.id))?;
        let previous = current.fields.project(self.changes.fields());
        store
            .apply(&StoreBatch::new().update(self.id, self.changes.clone()))
            .map_err(EngineError::StoreWriteFailure)?;
        self.previous = previous;
        tracing::debug!(id = %self.id, fields = self.changes.len(), "edited complaint");
        Ok(())
    }

    fn backward(&mut self, store: &mut S) -> Result<(), EngineError> {
        store
            .apply(&StoreBatch::new().update(self.id, self.previous.clone()))
            .map_err(EngineError::StoreWriteFailure)?;
        tracing::debug!(id = %self.id, "reverted edit");
        Ok(())
    }
}

/// Every command kind the engine records.
#[derive(Debug, Clone)]
pub enum HistoryCommand {
    Merge(MergeCommand),
    Unmerge(UnmergeCommand),
    Delete(DeleteCommand),
    Edit(EditCommand),
}

impl<S: RecordStore + ?Sized> Command<S> for HistoryCommand {
    fn label(&self) -> &'static str {
        match self {
            Self::Merge(c) => Command::<S>::label(c),
            Self::Unmerge(c) => Command::<S>::label(c),
            Self::Delete(c) => Command::<S>::label(c),
            Self::Edit(c) => Command::<S>::label(c),
        }
    }

    fn forward(&mut self, store: &mut S) -> Result<(), EngineError> {
        match self {
            Self::Merge(c) => c.forward(store),
            Self::Unmerge(c) => c.forward(store),
            Self::Delete(c) => c.forward(store),
            Self::Edit(c) => c.forward(store),
        }
    }

    fn backward(&mut self, store: &mut S) -> Result<(), EngineError> {
        match self {
            Self::Merge(c) => c.backward(store),
            Self::Unmerge(c) => c.backward(store),
            Self::Delete(c) => c.backward(store),
            Self::Edit(c) => c.backward(store),
        }
    }
}

/// Fingerprint of a record this command just wrote. A failed read-back is
/// logged and answered from `written`; numeric text in `written` then hashes
/// as text, which makes a later undo refuse with `RecordDrifted`.
fn written_fingerprint<S: RecordStore + ?Sized>(
    store: &S,
    id: RecordId,
    written: &FieldSet,
) -> [u8; 32] {
    match store.get(id) {
        Ok(Some(record)) => record.fingerprint(),
        Ok(None) => {
            tracing::warn!(%id, "written record not found on read-back; fingerprinting written fields");
            ComplaintRecord::new(id, written.clone()).fingerprint()
        }
        Err(e) => {
            tracing::warn!(%id, error = %e, "read-back failed; fingerprinting written fields");
            ComplaintRecord::new(id, written.clone()).fingerprint()
        }
    }
}

fn fingerprint_of<S: RecordStore + ?Sized>(store: &S, id: RecordId) -> Result<[u8; 32], EngineError> {
    store
        .get(id)?
        .map(|r| r.fingerprint())
        .ok_or(EngineError::RecordNotFound(id))
}
