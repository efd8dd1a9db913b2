use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown case status: {0}")]
    UnknownStatus(String),

    #[error("invalid record id: {0}")]
    InvalidRecordId(i64),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
