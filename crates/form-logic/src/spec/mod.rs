pub mod field;
pub mod form;
pub mod rule;

pub use field::{Constraint, FieldSpec, FieldType};
pub use form::{FormSettings, FormSpec, FormStatus};
pub use rule::{Action, Condition, LogicRule};
