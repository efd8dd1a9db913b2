use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Store-assigned identifier of a complaint record. Always positive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct RecordId(i64);

impl RecordId {
    pub fn new(raw: i64) -> Result<Self, CoreError> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(CoreError::InvalidRecordId(raw))
        }
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for RecordId {
    type Error = CoreError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<RecordId> for i64 {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a list of raw integers into ids, rejecting any non-positive value.
pub fn record_ids(raw: &[i64]) -> Result<Vec<RecordId>, CoreError> {
    raw.iter().map(|&r| RecordId::new(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive() {
        assert!(RecordId::new(0).is_err());
        assert!(RecordId::new(-4).is_err());
        assert_eq!(RecordId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn ordering_follows_raw_value() {
        let ids = record_ids(&[9, 3, 7]).unwrap();
        assert_eq!(ids.iter().min().unwrap().get(), 3);
    }
}
