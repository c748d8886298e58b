use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator applied to a trigger field's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
    MatchesRegex,
    /// Operator written by a newer or foreign builder. Never satisfied.
    #[serde(other)]
    Unknown,
}

impl Condition {
    /// Whether the rule's `value` operand takes part in the comparison.
    pub fn needs_value(&self) -> bool {
        !matches!(self, Condition::IsEmpty | Condition::IsNotEmpty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Equals => "equals",
            Condition::NotEquals => "not_equals",
            Condition::Contains => "contains",
            Condition::NotContains => "not_contains",
            Condition::GreaterThan => "greater_than",
            Condition::LessThan => "less_than",
            Condition::IsEmpty => "is_empty",
            Condition::IsNotEmpty => "is_not_empty",
            Condition::MatchesRegex => "matches_regex",
            Condition::Unknown => "unknown",
        }
    }
}

/// What the dependent field does when the rule's condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Show,
    Hide,
    Require,
    Disable,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Show => "show",
            Action::Hide => "hide",
            Action::Require => "require",
            Action::Disable => "disable",
        }
    }

    /// Show and hide rules gate visibility; the rest only change how a visible field behaves.
    pub fn affects_visibility(&self) -> bool {
        matches!(self, Action::Show | Action::Hide)
    }
}

/// One conditional clause attached to a dependent field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogicRule {
    pub id: String,
    pub trigger_field_id: String,
    pub condition: Condition,
    #[serde(default)]
    pub value: Value,
    pub action: Action,
}

impl LogicRule {
    /// A rule missing its trigger, or its operand when the condition needs one, is incomplete.
    pub fn is_complete(&self) -> bool {
        if self.trigger_field_id.trim().is_empty() {
            return false;
        }
        !self.condition.needs_value() || !operand_is_blank(&self.value)
    }
}

fn operand_is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
