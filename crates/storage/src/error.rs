use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A batch step failed. `applied` counts the steps that remain committed;
    /// it is zero whenever the store rolled the batch back.
    #[error("batch aborted at step {step} ({applied} step(s) left applied): {source}")]
    BatchAborted {
        step: usize,
        applied: usize,
        #[source]
        source: Box<StorageError>,
    },

    #[error("core error: {0}")]
    Core(#[from] casefold_core::CoreError),
}

impl StorageError {
    /// Number of batch steps left committed by a failed batch.
    pub fn applied_steps(&self) -> usize {
        match self {
            Self::BatchAborted { applied, .. } => *applied,
            _ => 0,
        }
    }
}
