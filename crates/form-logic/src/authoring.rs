//! Guards used while rules are being written, before they ever reach the evaluator.
//!
//! Rules may only reference fields positioned earlier in the form. Offering
//! triggers through [`available_trigger_fields`] makes cycles unrepresentable;
//! [`check_form_logic`] re-establishes the same guarantee for documents that
//! were assembled without going through the builder.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::FormSpec;
use crate::spec::rule::{Condition, LogicRule};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthoringError {
    #[error("field '{0}' does not exist")]
    UnknownField(String),
    #[error("rule '{rule_id}' on '{field_id}' references missing trigger '{trigger_id}'")]
    UnknownTrigger {
        field_id: String,
        rule_id: String,
        trigger_id: String,
    },
    #[error("rule '{rule_id}' on '{field_id}' must reference a field placed before it, not '{trigger_id}'")]
    ForwardReference {
        field_id: String,
        rule_id: String,
        trigger_id: String,
    },
    #[error("condition '{condition}' is not available for {field_type} field '{trigger_id}'")]
    IllegalCondition {
        trigger_id: String,
        field_type: &'static str,
        condition: &'static str,
    },
    #[error("rule '{rule_id}' on '{field_id}' is incomplete")]
    IncompleteRule { field_id: String, rule_id: String },
    #[error("rule ids must be unique per field; '{rule_id}' repeats on '{field_id}'")]
    DuplicateRule { field_id: String, rule_id: String },
    #[error("logic rules form a cycle through: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Operators offered for rules triggered by a field of `field_type`.
pub fn legal_conditions_for_type(field_type: FieldType) -> Vec<Condition> {
    let mut conditions = vec![
        Condition::Equals,
        Condition::NotEquals,
        Condition::IsEmpty,
        Condition::IsNotEmpty,
    ];
    match field_type {
        FieldType::Text | FieldType::Textarea | FieldType::Email => {
            conditions.extend([Condition::Contains, Condition::NotContains]);
        }
        FieldType::Number | FieldType::Date => {
            conditions.extend([Condition::GreaterThan, Condition::LessThan]);
        }
        _ => {}
    }
    conditions
}

/// Fields that may gate `dependent_id`: everything strictly before it.
/// An unknown dependent id yields no candidates.
pub fn available_trigger_fields<'a>(
    dependent_id: &str,
    fields: &'a [FieldSpec],
) -> &'a [FieldSpec] {
    match fields.iter().position(|field| field.id == dependent_id) {
        Some(index) => &fields[..index],
        None => &[],
    }
}

/// Drops rules that are missing a trigger or a required operand.
pub fn sanitize_rules(rules: Vec<LogicRule>) -> Vec<LogicRule> {
    rules.into_iter().filter(LogicRule::is_complete).collect()
}

/// Checks a single rule as the builder would before saving it onto `dependent_id`.
pub fn check_rule(
    form: &FormSpec,
    dependent_id: &str,
    rule: &LogicRule,
) -> Result<(), AuthoringError> {
    if form.field(dependent_id).is_none() {
        return Err(AuthoringError::UnknownField(dependent_id.to_string()));
    }
    if !rule.is_complete() {
        return Err(AuthoringError::IncompleteRule {
            field_id: dependent_id.to_string(),
            rule_id: rule.id.clone(),
        });
    }
    let Some(trigger) = form.field(&rule.trigger_field_id) else {
        return Err(AuthoringError::UnknownTrigger {
            field_id: dependent_id.to_string(),
            rule_id: rule.id.clone(),
            trigger_id: rule.trigger_field_id.clone(),
        });
    };
    if !available_trigger_fields(dependent_id, &form.fields)
        .iter()
        .any(|candidate| candidate.id == trigger.id)
    {
        return Err(AuthoringError::ForwardReference {
            field_id: dependent_id.to_string(),
            rule_id: rule.id.clone(),
            trigger_id: trigger.id.clone(),
        });
    }
    if !legal_conditions_for_type(trigger.kind).contains(&rule.condition) {
        return Err(AuthoringError::IllegalCondition {
            trigger_id: trigger.id.clone(),
            field_type: trigger.kind.label(),
            condition: rule.condition.as_str(),
        });
    }
    Ok(())
}

/// Replaces the logic of `dependent_id` with the complete subset of `rules`.
/// Returns the number of rules kept.
pub fn set_field_logic(
    form: &mut FormSpec,
    dependent_id: &str,
    rules: Vec<LogicRule>,
) -> Result<usize, AuthoringError> {
    let submitted = rules.len();
    let rules = sanitize_rules(rules);
    let mut seen = BTreeSet::new();
    for rule in &rules {
        if !seen.insert(rule.id.as_str()) {
            return Err(AuthoringError::DuplicateRule {
                field_id: dependent_id.to_string(),
                rule_id: rule.id.clone(),
            });
        }
        if let Err(error) = check_rule(form, dependent_id, rule) {
            tracing::debug!(field = dependent_id, %error, "rejected logic rule");
            return Err(error);
        }
    }
    let kept = rules.len();
    if kept < submitted {
        tracing::debug!(
            field = dependent_id,
            dropped = submitted - kept,
            "dropped incomplete logic rules"
        );
    }
    let field = form
        .field_mut(dependent_id)
        .ok_or_else(|| AuthoringError::UnknownField(dependent_id.to_string()))?;
    field.logic = rules;
    Ok(kept)
}

/// Validates logic on a form that did not come through the builder.
///
/// Rejects triggers that do not exist and any dependency cycle. Backward
/// references in a different order than the field list are tolerated as long
/// as the dependency graph stays acyclic.
pub fn check_form_logic(form: &FormSpec) -> Result<(), AuthoringError> {
    let ids: BTreeSet<&str> = form.fields.iter().map(|field| field.id.as_str()).collect();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = ids.iter().map(|id| (*id, 0)).collect();

    for field in &form.fields {
        let triggers: BTreeSet<&str> = field
            .logic
            .iter()
            .map(|rule| rule.trigger_field_id.as_str())
            .collect();
        for trigger in triggers {
            if !ids.contains(trigger) {
                let rule_id = field
                    .logic
                    .iter()
                    .find(|rule| rule.trigger_field_id == trigger)
                    .map(|rule| rule.id.clone())
                    .unwrap_or_default();
                return Err(AuthoringError::UnknownTrigger {
                    field_id: field.id.clone(),
                    rule_id,
                    trigger_id: trigger.to_string(),
                });
            }
            dependents.entry(trigger).or_default().push(field.id.as_str());
            *in_degree.entry(field.id.as_str()).or_default() += 1;
        }
    }

    let mut ready: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut ordered = 0usize;
    while let Some(id) = ready.pop_front() {
        ordered += 1;
        for dependent in dependents.get(id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(*dependent);
                }
            }
        }
    }

    if ordered < in_degree.len() {
        let mut remaining: BTreeSet<&str> = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(id, _)| id)
            .collect();
        // Fields that only hang off a cycle are left over too; peel them away.
        loop {
            let downstream: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|id| {
                    !dependents
                        .get(id)
                        .into_iter()
                        .flatten()
                        .any(|dependent| remaining.contains(dependent))
                })
                .collect();
            if downstream.is_empty() {
                break;
            }
            for id in downstream {
                remaining.remove(id);
            }
        }
        let cycle = remaining.into_iter().map(str::to_string).collect();
        return Err(AuthoringError::Cycle(cycle));
    }
    Ok(())
}

/// Configuration problem found on a field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormIssue {
    pub field_id: String,
    pub message: String,
    pub code: String,
}

/// Field-configuration checks the builder runs before publishing.
pub fn lint_form(form: &FormSpec) -> Vec<FormIssue> {
    let mut issues = Vec::new();
    let mut seen = BTreeSet::new();
    for field in &form.fields {
        if !seen.insert(field.id.as_str()) {
            issues.push(issue(field, "field id is used more than once", "duplicate_id"));
        }
        if field.label.trim().is_empty() {
            issues.push(issue(field, "field label is required", "missing_label"));
        }
        if field.kind.has_options() && field.options.is_empty() {
            issues.push(issue(
                field,
                "options are required for this field type",
                "missing_options",
            ));
        }
        for rule in field.logic.iter().filter(|rule| !rule.is_complete()) {
            issues.push(FormIssue {
                field_id: field.id.clone(),
                message: format!("rule '{}' is incomplete", rule.id),
                code: "incomplete_rule".into(),
            });
        }
        for rule in field.logic.iter().filter(|rule| rule.condition == Condition::MatchesRegex) {
            let pattern = rule.value.as_str().unwrap_or_default();
            if let Err(error) = Regex::new(pattern) {
                issues.push(FormIssue {
                    field_id: field.id.clone(),
                    message: format!("rule '{}' has an invalid pattern: {error}", rule.id),
                    code: "invalid_pattern".into(),
                });
            }
        }
    }
    issues
}

fn issue(field: &FieldSpec, message: &str, code: &str) -> FormIssue {
    FormIssue {
        field_id: field.id.clone(),
        message: message.into(),
        code: code.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::rule::Action;
    use serde_json::json;

    fn form(fields: Vec<FieldSpec>) -> FormSpec {
        FormSpec {
            id: "authoring".into(),
            title: "Authoring".into(),
            version: "1".into(),
            description: None,
            status: Default::default(),
            settings: None,
            fields,
        }
    }

    fn catalog() -> FormSpec {
        form(vec![
            FieldSpec::new("name", FieldType::Text, "Name"),
            FieldSpec::new("age", FieldType::Number, "Age"),
            FieldSpec::new("plan", FieldType::Radio, "Plan").with_options(["Free", "Pro"]),
            FieldSpec::new("notes", FieldType::Textarea, "Notes"),
        ])
    }

    fn rule(id: &str, trigger: &str, condition: Condition, value: serde_json::Value) -> LogicRule {
        LogicRule {
            id: id.into(),
            trigger_field_id: trigger.into(),
            condition,
            value,
            action: Action::Show,
        }
    }

    #[test]
    fn conditions_per_type() {
        assert_eq!(legal_conditions_for_type(FieldType::Radio).len(), 4);
        assert!(legal_conditions_for_type(FieldType::Email).contains(&Condition::Contains));
        assert!(legal_conditions_for_type(FieldType::Date).contains(&Condition::LessThan));
        assert!(!legal_conditions_for_type(FieldType::Checkbox).contains(&Condition::Contains));
        assert!(!legal_conditions_for_type(FieldType::Text).contains(&Condition::MatchesRegex));
    }

    #[test]
    fn triggers_are_the_preceding_fields() {
        let form = catalog();
        assert!(available_trigger_fields("name", &form.fields).is_empty());
        let ids: Vec<_> = available_trigger_fields("notes", &form.fields)
            .iter()
            .map(|field| field.id.as_str())
            .collect();
        assert_eq!(ids, ["name", "age", "plan"]);
        assert!(available_trigger_fields("missing", &form.fields).is_empty());
    }

    #[test]
    fn set_field_logic_drops_incomplete_rules() {
        let mut form = catalog();
        let kept = set_field_logic(
            &mut form,
            "notes",
            vec![
                rule("r1", "plan", Condition::Equals, json!("Pro")),
                rule("r2", "", Condition::Equals, json!("Pro")),
                rule("r3", "age", Condition::GreaterThan, json!("")),
                rule("r4", "name", Condition::IsEmpty, json!(null)),
            ],
        )
        .expect("logic accepted");
        assert_eq!(kept, 2);
        let ids: Vec<_> = form.fields[3].logic.iter().map(|rule| rule.id.as_str()).collect();
        assert_eq!(ids, ["r1", "r4"]);
    }

    #[test]
    fn set_field_logic_rejects_forward_and_self_references() {
        let mut form = catalog();
        let forward = set_field_logic(
            &mut form,
            "age",
            vec![rule("r1", "plan", Condition::Equals, json!("Pro"))],
        );
        assert!(matches!(forward, Err(AuthoringError::ForwardReference { .. })));

        let own = set_field_logic(
            &mut form,
            "age",
            vec![rule("r1", "age", Condition::IsEmpty, json!(null))],
        );
        assert!(matches!(own, Err(AuthoringError::ForwardReference { .. })));
    }

    #[test]
    fn set_field_logic_rejects_illegal_condition() {
        let mut form = catalog();
        let result = set_field_logic(
            &mut form,
            "notes",
            vec![rule("r1", "plan", Condition::Contains, json!("Pro"))],
        );
        assert_eq!(
            result,
            Err(AuthoringError::IllegalCondition {
                trigger_id: "plan".into(),
                field_type: "radio",
                condition: "contains",
            })
        );
    }

    #[test]
    fn set_field_logic_rejects_duplicate_rule_ids() {
        let mut form = catalog();
        let result = set_field_logic(
            &mut form,
            "notes",
            vec![
                rule("r1", "plan", Condition::Equals, json!("Pro")),
                rule("r1", "name", Condition::IsNotEmpty, json!(null)),
            ],
        );
        assert!(matches!(result, Err(AuthoringError::DuplicateRule { .. })));
    }

    #[test]
    fn cycle_is_detected() {
        let form = form(vec![
            FieldSpec::new("a", FieldType::Text, "A")
                .with_rule(rule("r1", "b", Condition::IsNotEmpty, json!(null))),
            FieldSpec::new("b", FieldType::Text, "B")
                .with_rule(rule("r2", "a", Condition::IsNotEmpty, json!(null))),
            FieldSpec::new("c", FieldType::Text, "C"),
        ]);
        assert_eq!(
            check_form_logic(&form),
            Err(AuthoringError::Cycle(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn cycle_report_leaves_out_downstream_fields() {
        let form = form(vec![
            FieldSpec::new("a", FieldType::Text, "A")
                .with_rule(rule("r1", "b", Condition::IsNotEmpty, json!(null))),
            FieldSpec::new("b", FieldType::Text, "B")
                .with_rule(rule("r2", "a", Condition::IsNotEmpty, json!(null))),
            FieldSpec::new("c", FieldType::Text, "C")
                .with_rule(rule("r3", "a", Condition::IsNotEmpty, json!(null))),
            FieldSpec::new("d", FieldType::Text, "D")
                .with_rule(rule("r4", "c", Condition::IsNotEmpty, json!(null))),
        ]);
        let error = check_form_logic(&form).expect_err("cycle");
        assert_eq!(error, AuthoringError::Cycle(vec!["a".into(), "b".into()]));
        assert_eq!(error.to_string(), "logic rules form a cycle through: a, b");
    }

    #[test]
    fn acyclic_form_with_dangling_trigger_is_rejected() {
        let mut form = catalog();
        assert!(check_form_logic(&form).is_ok());
        form.fields[3]
            .logic
            .push(rule("r1", "ghost", Condition::IsEmpty, json!(null)));
        assert!(matches!(
            check_form_logic(&form),
            Err(AuthoringError::UnknownTrigger { .. })
        ));
    }

    #[test]
    fn lint_flags_missing_options_and_labels() {
        let form = form(vec![
            FieldSpec::new("choice", FieldType::Select, "Choice"),
            FieldSpec::new("blank", FieldType::Text, " "),
            FieldSpec::new("blank", FieldType::Text, "Again"),
        ]);
        let codes: Vec<_> = lint_form(&form).into_iter().map(|issue| issue.code).collect();
        assert_eq!(codes, ["missing_options", "missing_label", "duplicate_id"]);
    }

    #[test]
    fn lint_flags_invalid_regex_patterns() {
        let form = form(vec![
            FieldSpec::new("code", FieldType::Text, "Code"),
            FieldSpec::new("notes", FieldType::Text, "Notes")
                .with_rule(rule("good", "code", Condition::MatchesRegex, json!(r"^\d+$")))
                .with_rule(rule("bad", "code", Condition::MatchesRegex, json!("(unclosed"))),
        ]);
        let issues = lint_form(&form);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "invalid_pattern");
        assert!(issues[0].message.contains("'bad'"));
    }
}
