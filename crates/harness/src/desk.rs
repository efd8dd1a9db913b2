use std::path::PathBuf;

use casefold_core::{ComplaintRecord, Field, FieldSet, FieldValue, RecordId};
use casefold_engine::{Engine, EngineConfig, EngineError};
use casefold_storage::{RecordStore, StorageError};
use tempfile::TempDir;

/// An engine over an in-memory store, with helpers for seeding complaints
/// and forcing store failures.
pub struct TestDesk {
    pub engine: Engine,
    next_ack: u32,
    triggers: Vec<String>,
    upload_dir: Option<TempDir>,
}

impl TestDesk {
    pub fn new() -> Result<Self, EngineError> {
        Self::with_config(EngineConfig::default())
    }

    /// Batches run step by step without a transaction, so a failing step
    /// leaves the earlier ones applied.
    pub fn non_atomic() -> Result<Self, EngineError> {
        let mut config = EngineConfig::default();
        config.store.atomic_batches = false;
        Self::with_config(config)
    }

    /// A desk with an upload directory that lives as long as the desk.
    pub fn with_uploads() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let mut config = EngineConfig::default();
        config.attachments.upload_dir = Some(dir.path().join("uploads"));
        let mut desk = Self::with_config(config)?;
        desk.upload_dir = Some(dir);
        Ok(desk)
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        crate::init_tracing();
        Ok(Self {
            engine: Engine::open(&config)?,
            next_ack: 0,
            triggers: Vec::new(),
            upload_dir: None,
        })
    }

    /// Scratch directory beside the upload directory, if this desk has one.
    pub fn scratch_dir(&self) -> Option<PathBuf> {
        self.upload_dir.as_ref().map(|d| d.path().to_path_buf())
    }

    /// Register a complaint for `victim` with a fresh acknowledgment number.
    pub fn register(&mut self, victim: &str) -> Result<RecordId, EngineError> {
        self.register_with(FieldSet::new().with(Field::VictimName, victim))
    }

    /// Register `fields`, filling in an acknowledgment number when absent.
    pub fn register_with(&mut self, mut fields: FieldSet) -> Result<RecordId, EngineError> {
        if fields.get(Field::AcknowledgmentNo).is_blank() {
            self.next_ack += 1;
            fields.set(Field::AcknowledgmentNo, format!("ACK-{:04}", self.next_ack));
        }
        self.engine.intake(fields)
    }

    pub fn record(&self, id: RecordId) -> Result<Option<ComplaintRecord>, EngineError> {
        self.engine.get(id)
    }

    pub fn field(&self, id: RecordId, field: Field) -> Result<Option<FieldValue>, EngineError> {
        Ok(self.engine.get(id)?.map(|r| r.get(field).clone()))
    }

    pub fn count(&self) -> Result<u64, StorageError> {
        self.engine.store().count()
    }

    /// Make every delete of `id` fail until [`lift_failures`](Self::lift_failures).
    pub fn fail_deletes_of(&mut self, id: RecordId) -> Result<(), StorageError> {
        let name = format!("fail_delete_{id}");
        self.install_trigger(
            &name,
            &format!("BEFORE DELETE ON complaint WHEN OLD.id = {id}"),
        )
    }

    /// Make inserts of records with this victim name fail.
    pub fn fail_inserts_of(&mut self, victim: &str) -> Result<(), StorageError> {
        let name = format!("fail_insert_{}", self.triggers.len());
        let victim = victim.replace('\'', "''");
        self.install_trigger(
            &name,
            &format!("BEFORE INSERT ON complaint WHEN NEW.victim_name = '{victim}'"),
        )
    }

    pub fn lift_failures(&mut self) -> Result<(), StorageError> {
        for name in self.triggers.drain(..) {
            self.engine
                .store()
                .conn()
                .execute_batch(&format!("DROP TRIGGER IF EXISTS {name};"))?;
        }
        Ok(())
    }

    fn install_trigger(&mut self, name: &str, when: &str) -> Result<(), StorageError> {
        self.engine.store().conn().execute_batch(&format!(
            "CREATE TRIGGER {name} {when} BEGIN SELECT RAISE(ABORT, 'forced failure'); END;"
        ))?;
        self.triggers.push(name.to_string());
        Ok(())
    }
}
