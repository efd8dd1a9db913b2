use casefold_core::{CaseStatus, ComplaintRecord, FieldSet, RecordId};

use crate::error::StorageError;

/// One staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    /// Insert with a store-assigned id.
    Insert { fields: FieldSet },
    /// Re-insert a record at the id it previously held.
    Restore { record: ComplaintRecord },
    /// Overwrite the listed fields. Fails if the record is gone.
    Update { id: RecordId, fields: FieldSet },
    /// Fails if the record is gone.
    Delete { id: RecordId },
}

impl StoreOp {
    pub fn op_type_name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Restore { .. } => "restore",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Writes applied as one unit by [`RecordStore::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreBatch {
    ops: Vec<StoreOp>,
}

impl StoreBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, fields: FieldSet) -> Self {
        self.ops.push(StoreOp::Insert { fields });
        self
    }

    pub fn restore(mut self, record: ComplaintRecord) -> Self {
        self.ops.push(StoreOp::Restore { record });
        self
    }

    pub fn update(mut self, id: RecordId, fields: FieldSet) -> Self {
        self.ops.push(StoreOp::Update { id, fields });
        self
    }

    pub fn delete(mut self, id: RecordId) -> Self {
        self.ops.push(StoreOp::Delete { id });
        self
    }

    pub fn push(&mut self, op: StoreOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Result of a successful batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Ids assigned to `Insert` steps, in step order.
    pub inserted: Vec<RecordId>,
    /// Rows touched across all steps.
    pub changed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Id,
    Newest,
    Oldest,
}

/// Search criteria. Text criteria are substring matches unless noted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub victim_name: Option<String>,
    pub acknowledgment_no: Option<String>,
    pub victim_mobile_numbers: Option<String>,
    pub police_station: Option<String>,
    pub investigation_officer: Option<String>,
    pub action_taken: Option<String>,
    /// Exact match.
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub lost_amount: Option<String>,
    pub lien_amount: Option<String>,
    /// Exact match.
    pub bns_section: Option<String>,
    /// Exact match.
    pub it_act_section: Option<String>,
    /// Inclusive `date_of_complaint` range; applied only when both ends are set.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub status: Option<CaseStatus>,
    pub sort: SortOrder,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn victim_name(mut self, s: impl Into<String>) -> Self {
        self.victim_name = Some(s.into());
        self
    }

    pub fn acknowledgment_no(mut self, s: impl Into<String>) -> Self {
        self.acknowledgment_no = Some(s.into());
        self
    }

    pub fn police_station(mut self, s: impl Into<String>) -> Self {
        self.police_station = Some(s.into());
        self
    }

    pub fn category(mut self, s: impl Into<String>) -> Self {
        self.category = Some(s.into());
        self
    }

    pub fn date_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.date_from = Some(from.into());
        self.date_to = Some(to.into());
        self
    }

    pub fn status(mut self, status: CaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

/// The persistent record store. Reads return records in ascending id order
/// unless a filter asks otherwise.
pub trait RecordStore {
    fn fetch_by_ids(&self, ids: &[RecordId]) -> Result<Vec<ComplaintRecord>, StorageError>;

    fn fetch_by_filter(&self, filter: &RecordFilter) -> Result<Vec<ComplaintRecord>, StorageError>;

    fn get(&self, id: RecordId) -> Result<Option<ComplaintRecord>, StorageError>;

    fn insert(&mut self, fields: &FieldSet) -> Result<RecordId, StorageError>;

    /// Returns the number of records changed (0 or 1).
    fn update(&mut self, id: RecordId, fields: &FieldSet) -> Result<usize, StorageError>;

    /// Returns the number of records removed (0 or 1).
    fn delete(&mut self, id: RecordId) -> Result<usize, StorageError>;

    /// Apply every step or none of them. On failure the error is a
    /// [`StorageError::BatchAborted`] describing what was left applied.
    fn apply(&mut self, batch: &StoreBatch) -> Result<BatchOutcome, StorageError>;

    fn count(&self) -> Result<u64, StorageError>;

    fn count_by_status(&self, status: CaseStatus) -> Result<u64, StorageError>;
}
