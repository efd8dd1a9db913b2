pub mod codec;
pub mod error;
pub mod field;
pub mod field_value;
pub mod ids;
pub mod record;

pub use error::CoreError;
pub use field::{Field, FieldKind};
pub use field_value::FieldValue;
pub use ids::*;
pub use record::{CaseStatus, ComplaintRecord, FieldSet};
