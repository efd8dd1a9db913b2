pub mod attachments;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod merge;
pub mod unmerge;

pub use attachments::AttachmentStore;
pub use commands::{DeleteCommand, EditCommand, HistoryCommand, MergeCommand, UnmergeCommand};
pub use config::EngineConfig;
pub use error::EngineError;
pub use history::{Command, CommandHistory, CommandId, CommandState, HistoryOutcome};
pub use merge::{merge_records, MergeOutcome};
pub use unmerge::{unmerge_record, UnmergeOutcome};

use std::path::{Path, PathBuf};

use casefold_core::{CaseStatus, ComplaintRecord, Field, FieldSet, FieldValue, RecordId};
use casefold_storage::{RecordFilter, RecordStore, SqliteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total: u64,
    pub pending: u64,
    pub resolved: u64,
}

/// The complaint desk: a record store plus the in-memory undo/redo history
/// of the operator's actions.
pub struct Engine<S: RecordStore = SqliteStore> {
    store: S,
    history: CommandHistory<HistoryCommand>,
    attachments: Option<AttachmentStore>,
}

impl Engine<SqliteStore> {
    /// Open the store and upload directory named by `config`.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        let options = config.store.options();
        let store = match &config.store.path {
            Some(path) => {
                let path = path.to_str().ok_or_else(|| {
                    EngineError::Config(format!("store path is not valid UTF-8: {}", path.display()))
                })?;
                SqliteStore::open_with(path, options)?
            }
            None => SqliteStore::open_in_memory_with(options)?,
        };
        tracing::info!(path = ?config.store.path, atomic = options.atomic_batches, "opened complaint store");
        Self::new(store, config)
    }
}

impl<S: RecordStore> Engine<S> {
    pub fn new(store: S, config: &EngineConfig) -> Result<Self, EngineError> {
        let attachments = config
            .attachments
            .upload_dir
            .as_ref()
            .map(AttachmentStore::open)
            .transpose()?;
        Ok(Self {
            store,
            history: CommandHistory::new(config.history.max_depth),
            attachments,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access. Writes made here bypass the history.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn history(&self) -> &CommandHistory<HistoryCommand> {
        &self.history
    }

    pub fn attachments(&self) -> Option<&AttachmentStore> {
        self.attachments.as_ref()
    }

    // -- Reads --

    pub fn get(&self, id: RecordId) -> Result<Option<ComplaintRecord>, EngineError> {
        Ok(self.store.get(id)?)
    }

    pub fn search(&self, filter: &RecordFilter) -> Result<Vec<ComplaintRecord>, EngineError> {
        Ok(self.store.fetch_by_filter(filter)?)
    }

    pub fn dashboard_stats(&self) -> Result<DashboardStats, EngineError> {
        Ok(DashboardStats {
            total: self.store.count()?,
            pending: self.store.count_by_status(CaseStatus::Pending)?,
            resolved: self.store.count_by_status(CaseStatus::Resolved)?,
        })
    }

    // -- Writes --

    /// Register a new complaint. Intake is not part of the history.
    pub fn intake(&mut self, fields: FieldSet) -> Result<RecordId, EngineError> {
        let id = self.store.insert(&fields)?;
        tracing::info!(%id, "registered complaint");
        Ok(id)
    }

    pub fn record_merge(&mut self, ids: &[RecordId]) -> Result<MergeOutcome, EngineError> {
        let outcome = merge_records(&mut self.store, ids)?;
        let command = MergeCommand::capture(&self.store, outcome.clone());
        self.history.push(HistoryCommand::Merge(command));
        Ok(outcome)
    }

    pub fn record_unmerge(&mut self, merged_id: RecordId) -> Result<UnmergeOutcome, EngineError> {
        let outcome = unmerge_record(&mut self.store, merged_id)?;
        let command = UnmergeCommand::capture(&self.store, outcome.clone());
        self.history.push(HistoryCommand::Unmerge(command));
        Ok(outcome)
    }

    pub fn record_delete(&mut self, id: RecordId) -> Result<(), EngineError> {
        let mut command = DeleteCommand::prepare(&self.store, id)?;
        command.forward(&mut self.store)?;
        self.history.push(HistoryCommand::Delete(command));
        Ok(())
    }

    pub fn record_edit(
        &mut self,
        id: RecordId,
        field: Field,
        value: impl Into<FieldValue>,
    ) -> Result<(), EngineError> {
        self.record_edit_fields(id, FieldSet::new().with(field, value))
    }

    /// Overwrite several fields as one undoable step.
    pub fn record_edit_fields(&mut self, id: RecordId, changes: FieldSet) -> Result<(), EngineError> {
        let mut command = EditCommand::new(id, changes);
        command.forward(&mut self.store)?;
        self.history.push(HistoryCommand::Edit(command));
        Ok(())
    }

    pub fn undo_last(&mut self) -> Result<HistoryOutcome, EngineError> {
        self.history.undo(&mut self.store).inspect_err(|e| {
            tracing::warn!(error = %e, "undo refused; history unchanged");
        })
    }

    pub fn redo_last(&mut self) -> Result<HistoryOutcome, EngineError> {
        self.history.redo(&mut self.store).inspect_err(|e| {
            tracing::warn!(error = %e, "redo refused; history unchanged");
        })
    }

    pub fn can_undo(&self) -> bool {
        self.history.undo_depth() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history.redo_depth() > 0
    }

    // -- Attachments --

    /// Copy `source` into the upload directory and point the complaint's
    /// file fields at the copy, as an undoable edit. Undo reverts the fields
    /// and leaves the copied file in place.
    pub fn attach_file(&mut self, id: RecordId, source: &Path) -> Result<PathBuf, EngineError> {
        let record = self.attachable(id)?;
        let stored = self
            .attachment_store()?
            .import(&record.get(Field::AcknowledgmentNo).to_segment(), source)?;
        self.record_file_fields(id, &stored)?;
        Ok(stored)
    }

    /// Store `bytes` as the complaint's new attachment. The previous file
    /// stays on disk so undo can point the record back at it.
    pub fn replace_attachment(
        &mut self,
        id: RecordId,
        ext: Option<&str>,
        bytes: &[u8],
    ) -> Result<PathBuf, EngineError> {
        let record = self.attachable(id)?;
        let stored = self.attachment_store()?.replace(
            &record.get(Field::AcknowledgmentNo).to_segment(),
            ext,
            bytes,
        )?;
        self.record_file_fields(id, &stored)?;
        Ok(stored)
    }

    /// A merged record's acknowledgment number is `<br>`-joined, so it
    /// cannot name a file.
    fn attachable(&self, id: RecordId) -> Result<ComplaintRecord, EngineError> {
        let record = self.store.get(id)?.ok_or(EngineError::RecordNotFound(id))?;
        if record.is_merged() {
            return Err(EngineError::MergedRecord(id));
        }
        Ok(record)
    }

    fn attachment_store(&self) -> Result<&AttachmentStore, EngineError> {
        self.attachments
            .as_ref()
            .ok_or_else(|| EngineError::Config("no upload directory configured".into()))
    }

    fn record_file_fields(&mut self, id: RecordId, stored: &Path) -> Result<(), EngineError> {
        let file_name = stored
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record_edit_fields(
            id,
            FieldSet::new()
                .with(Field::FileName, file_name)
                .with(Field::FilePath, stored.to_string_lossy().into_owned()),
        )
    }
}

impl<S: RecordStore + std::fmt::Debug> std::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("undo_depth", &self.history.undo_depth())
            .field("redo_depth", &self.history.redo_depth())
            .finish()
    }
}
