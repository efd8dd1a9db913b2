use casefold_core::{CoreError, Field, RecordId};
use casefold_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("at least two complaints are required to merge (got {supplied})")]
    InsufficientOperands { supplied: usize },

    #[error("only {found} of the {requested} selected complaints still exist")]
    RecordsNotFound { requested: usize, found: usize },

    #[error("complaint {0} not found")]
    RecordNotFound(RecordId),

    #[error("complaint {0} is not a merged record")]
    NotMerged(RecordId),

    #[error("complaint {0} is a merged record; unmerge it before attaching files")]
    MergedRecord(RecordId),

    #[error("cannot unmerge complaint {record}: {field} has {found} segment(s), expected {expected}")]
    SegmentCountMismatch {
        record: RecordId,
        field: Field,
        expected: usize,
        found: usize,
    },

    #[error("store rejected the write: {0}")]
    StoreWriteFailure(#[source] StorageError),

    #[error("merge into {merged_id} stopped after {applied} step(s); records need manual reconciliation: {source}")]
    PartialMergeFailure {
        merged_id: RecordId,
        applied: usize,
        #[source]
        source: StorageError,
    },

    #[error("unmerge of {merged_id} stopped after {applied} step(s); records need manual reconciliation: {source}")]
    PartialUnmergeFailure {
        merged_id: RecordId,
        applied: usize,
        #[source]
        source: StorageError,
    },

    #[error("complaint {0} changed since this action was recorded")]
    RecordDrifted(RecordId),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("attachment error: {0}")]
    Attachment(#[from] std::io::Error),
}

impl EngineError {
    /// The store was left half-written and needs manual reconciliation.
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Self::PartialMergeFailure { .. } | Self::PartialUnmergeFailure { .. }
        )
    }
}
