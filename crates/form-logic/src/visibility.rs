use serde_json::Value;

use crate::condition::evaluate_condition;
use crate::spec::field::FieldSpec;
use crate::spec::form::FormSpec;
use crate::spec::rule::{Action, LogicRule};
use crate::value::AnswerValue;

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;
pub type EffectsMap = std::collections::BTreeMap<String, FieldEffects>;

/// How a field should be presented for the current answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEffects {
    pub visible: bool,
    pub required: bool,
    pub disabled: bool,
}

/// Whether the rule's condition holds against the current answers.
/// A missing trigger answer compares as empty.
pub fn condition_met(rule: &LogicRule, answers: &Value) -> bool {
    let trigger = AnswerValue::lookup(answers, &rule.trigger_field_id);
    let operand = AnswerValue::from_json(&rule.value);
    evaluate_condition(rule.condition, &trigger, &operand)
}

/// Per-rule visibility verdict: a show rule passes when its condition holds,
/// any other action passes when it does not.
pub fn evaluate_rule(rule: &LogicRule, answers: &Value) -> bool {
    let met = condition_met(rule, answers);
    let result = if rule.action == Action::Show { met } else { !met };
    tracing::trace!(
        rule = %rule.id,
        trigger = %rule.trigger_field_id,
        condition = rule.condition.as_str(),
        action = rule.action.as_str(),
        met,
        result,
        "evaluated logic rule"
    );
    result
}

/// A field is visible when every show/hide rule attached to it passes.
/// Fields without such rules are always visible.
pub fn is_field_visible(field: &FieldSpec, answers: &Value) -> bool {
    field
        .logic
        .iter()
        .filter(|rule| rule.action.affects_visibility())
        .all(|rule| evaluate_rule(rule, answers))
}

/// Combines the field's own flags with its require/disable rules.
/// Hidden or disabled fields are never required.
pub fn field_effects(field: &FieldSpec, answers: &Value) -> FieldEffects {
    let visible = is_field_visible(field, answers);
    let disabled = all_met(field, Action::Disable, answers);
    let required = visible
        && !disabled
        && (field.required || all_met(field, Action::Require, answers));
    FieldEffects {
        visible,
        required,
        disabled,
    }
}

/// True when the field carries at least one rule with `action` and every one of them is met.
fn all_met(field: &FieldSpec, action: Action, answers: &Value) -> bool {
    let mut rules = field.logic.iter().filter(|rule| rule.action == action).peekable();
    rules.peek().is_some() && rules.all(|rule| condition_met(rule, answers))
}

pub fn resolve_visibility(form: &FormSpec, answers: &Value) -> VisibilityMap {
    form.fields
        .iter()
        .map(|field| (field.id.clone(), is_field_visible(field, answers)))
        .collect()
}

pub fn resolve_effects(form: &FormSpec, answers: &Value) -> EffectsMap {
    form.fields
        .iter()
        .map(|field| (field.id.clone(), field_effects(field, answers)))
        .collect()
}
