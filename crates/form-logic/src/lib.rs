#![allow(missing_docs)]

pub mod answers;
pub mod answers_schema;
pub mod authoring;
pub mod condition;
pub mod render;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod value;
pub mod visibility;

pub use answers::{ValidationError, ValidationResult};
pub use answers_schema::generate as answers_schema;
pub use authoring::{
    AuthoringError, FormIssue, available_trigger_fields, check_form_logic, check_rule,
    legal_conditions_for_type, lint_form, sanitize_rules, set_field_logic,
};
pub use condition::evaluate_condition;
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use spec::{
    Action, Condition, Constraint, FieldSpec, FieldType, FormSettings, FormSpec, FormStatus,
    LogicRule,
};
pub use submission::{Submission, SubmissionMeta, completion_percentage, transform_submission};
pub use validate::validate;
pub use value::AnswerValue;
pub use visibility::{
    EffectsMap, FieldEffects, VisibilityMap, condition_met, evaluate_rule, field_effects,
    is_field_visible, resolve_effects, resolve_visibility,
};

/// JSON Schema describing a form document.
pub fn form_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormSpec)).unwrap_or(serde_json::Value::Null)
}
