use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::{Field, SEGMENT_JOINER};
use crate::field_value::FieldValue;
use crate::ids::RecordId;
use crate::CoreError;

static NULL: FieldValue = FieldValue::Null;

/// A sparse set of field values. Absent fields read as `Null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(BTreeMap<Field, FieldValue>);

impl FieldSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.0.insert(field, value.into());
        self
    }

    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) {
        self.0.insert(field, value.into());
    }

    pub fn get(&self, field: Field) -> &FieldValue {
        self.0.get(&field).unwrap_or(&NULL)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
        self.0.remove(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.0.iter().map(|(f, v)| (*f, v))
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The values this set currently holds for the given fields, Null where absent.
    pub fn project(&self, fields: impl IntoIterator<Item = Field>) -> FieldSet {
        fields
            .into_iter()
            .map(|f| (f, self.get(f).clone()))
            .collect()
    }

    /// Every catalogue field, filling gaps with Null.
    pub fn complete(&self) -> FieldSet {
        self.project(Field::ALL)
    }
}

impl FromIterator<(Field, FieldValue)> for FieldSet {
    fn from_iter<I: IntoIterator<Item = (Field, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Pending,
    Resolved,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            _ => Err(CoreError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    pub id: RecordId,
    pub fields: FieldSet,
}

impl ComplaintRecord {
    pub fn new(id: RecordId, fields: FieldSet) -> Self {
        Self { id, fields }
    }

    pub fn get(&self, field: Field) -> &FieldValue {
        self.fields.get(field)
    }

    /// A case is resolved once any action has been recorded against it.
    pub fn status(&self) -> CaseStatus {
        if self.get(Field::ActionTaken).is_blank() {
            CaseStatus::Pending
        } else {
            CaseStatus::Resolved
        }
    }

    /// Built by a merge: the reference field holds more than one segment.
    pub fn is_merged(&self) -> bool {
        self.get(Field::REFERENCE)
            .as_text()
            .is_some_and(|s| s.contains(SEGMENT_JOINER))
    }

    /// blake3 digest over the id and every catalogue field.
    /// Absent fields hash the same as explicit nulls.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.id.get().to_be_bytes());
        for field in Field::ALL {
            hasher.update(field.as_str().as_bytes());
            match self.get(field) {
                FieldValue::Null => {
                    hasher.update(&[0]);
                }
                FieldValue::Integer(n) => {
                    hasher.update(&[1]);
                    hasher.update(&n.to_be_bytes());
                }
                FieldValue::Real(r) => {
                    hasher.update(&[2]);
                    hasher.update(&r.to_bits().to_be_bytes());
                }
                FieldValue::Text(s) => {
                    hasher.update(&[3]);
                    hasher.update(&(s.len() as u64).to_be_bytes());
                    hasher.update(s.as_bytes());
                }
            }
        }
        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, fields: FieldSet) -> ComplaintRecord {
        ComplaintRecord::new(RecordId::new(id).unwrap(), fields)
    }

    #[test]
    fn absent_fields_read_null() {
        let set = FieldSet::new().with(Field::VictimName, "Alice");
        assert_eq!(set.get(Field::VictimName), &FieldValue::text("Alice"));
        assert!(set.get(Field::SuspectName).is_null());
        assert_eq!(set.complete().len(), Field::ALL.len());
    }

    #[test]
    fn status_follows_action_taken() {
        let pending = record(1, FieldSet::new().with(Field::ActionTaken, "  "));
        assert_eq!(pending.status(), CaseStatus::Pending);
        let resolved = record(1, FieldSet::new().with(Field::ActionTaken, "FIR registered"));
        assert_eq!(resolved.status(), CaseStatus::Resolved);
    }

    #[test]
    fn merged_records_carry_joined_names() {
        assert!(record(1, FieldSet::new().with(Field::VictimName, "Alice<br>Bob")).is_merged());
        assert!(record(2, FieldSet::new().with(Field::VictimName, "<br>")).is_merged());
        assert!(!record(3, FieldSet::new().with(Field::VictimName, "Alice")).is_merged());
        assert!(!record(4, FieldSet::new()).is_merged());
    }

    #[test]
    fn fingerprint_ignores_explicit_nulls_but_not_values() {
        let a = record(3, FieldSet::new().with(Field::VictimName, "Alice"));
        let b = record(
            3,
            FieldSet::new()
                .with(Field::VictimName, "Alice")
                .with(Field::SuspectName, FieldValue::Null),
        );
        let c = record(3, FieldSet::new().with(Field::VictimName, "Alicia"));
        let d = record(4, FieldSet::new().with(Field::VictimName, "Alice"));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_ne!(a.fingerprint(), d.fingerprint());
    }
}
