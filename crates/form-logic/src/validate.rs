use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::answers::{ValidationError, ValidationResult};
use crate::spec::field::{Constraint, FieldSpec, FieldType};
use crate::spec::form::FormSpec;
use crate::value::AnswerValue;
use crate::visibility::resolve_effects;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+\S*$").expect("url pattern compiles")
});
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])([T ]\S*)?$")
        .expect("date pattern compiles")
});

/// Validates a submission. Hidden fields are neither required nor checked.
pub fn validate(form: &FormSpec, answers: &Value) -> ValidationResult {
    let effects = resolve_effects(form, answers);
    let answers_map = answers.as_object().cloned().unwrap_or_default();

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for field in &form.fields {
        let Some(state) = effects.get(&field.id) else {
            continue;
        };
        if !state.visible {
            continue;
        }

        match answers_map.get(&field.id) {
            Some(value) if !AnswerValue::from_json(value).is_empty() => {
                if let Some(error) = validate_value(field, value) {
                    errors.push(error);
                }
            }
            _ => {
                if state.required {
                    missing_required.push(field.id.clone());
                }
            }
        }
    }

    let unknown_fields: Vec<String> = answers_map
        .keys()
        .filter(|key| form.field(key).is_none())
        .cloned()
        .collect();

    let result = ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    };
    tracing::debug!(
        form = %form.id,
        valid = result.valid,
        errors = result.errors.len(),
        missing = result.missing_required.len(),
        "validated submission"
    );
    result
}

fn validate_value(field: &FieldSpec, value: &Value) -> Option<ValidationError> {
    if let Some(error) = check_type(field, value) {
        return Some(error);
    }

    if let Some(constraint) = &field.constraint
        && let Some(error) = enforce_constraint(field, value, constraint)
    {
        return Some(error);
    }

    None
}

fn check_type(field: &FieldSpec, value: &Value) -> Option<ValidationError> {
    match field.kind {
        FieldType::Email => match value.as_str() {
            Some(text) if EMAIL.is_match(text) => None,
            _ => Some(base_error(
                field,
                "please enter a valid email address",
                "invalid_email",
            )),
        },
        FieldType::Number => {
            if AnswerValue::from_json(value).to_number().is_finite() && !value.is_boolean() {
                None
            } else {
                Some(base_error(field, "please enter a valid number", "invalid_number"))
            }
        }
        FieldType::Url => match value.as_str() {
            Some(text) if URL.is_match(text) => None,
            _ => Some(base_error(field, "please enter a valid URL", "invalid_url")),
        },
        FieldType::Date => match value.as_str() {
            Some(text) if DATE.is_match(text) => None,
            _ => Some(base_error(field, "please enter a valid date", "invalid_date")),
        },
        FieldType::Select | FieldType::Radio => match value.as_str() {
            Some(text) if field.options.iter().any(|option| option == text) => None,
            Some(_) => Some(base_error(field, "invalid option", "option_mismatch")),
            None => Some(type_mismatch(field)),
        },
        FieldType::Checkbox => match value.as_array() {
            Some(items)
                if items.iter().all(|item| {
                    item.as_str()
                        .is_some_and(|text| field.options.iter().any(|option| option == text))
                }) =>
            {
                None
            }
            Some(_) => Some(base_error(field, "invalid option", "option_mismatch")),
            None => Some(type_mismatch(field)),
        },
        FieldType::Toggle => (!value.is_boolean()).then(|| type_mismatch(field)),
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Phone
        | FieldType::Image
        | FieldType::File => (!value.is_string()).then(|| type_mismatch(field)),
    }
}

fn enforce_constraint(
    field: &FieldSpec,
    value: &Value,
    constraint: &Constraint,
) -> Option<ValidationError> {
    if let Some(pattern) = &constraint.pattern
        && let Some(text) = value.as_str()
        && let Ok(regex) = Regex::new(pattern)
        && !regex.is_match(text)
    {
        return Some(base_error(
            field,
            "value does not match pattern",
            "pattern_mismatch",
        ));
    }

    if let Some(min_len) = constraint.min_len
        && let Some(text) = value.as_str()
        && text.chars().count() < min_len
    {
        return Some(base_error(
            field,
            "string shorter than min length",
            "min_length",
        ));
    }

    if let Some(max_len) = constraint.max_len
        && let Some(text) = value.as_str()
        && text.chars().count() > max_len
    {
        return Some(base_error(
            field,
            "string longer than max length",
            "max_length",
        ));
    }

    let number = AnswerValue::from_json(value).to_number();
    if let Some(min) = constraint.min
        && number < min
    {
        return Some(base_error(field, "value below minimum", "min"));
    }

    if let Some(max) = constraint.max
        && number > max
    {
        return Some(base_error(field, "value above maximum", "max"));
    }

    None
}

fn type_mismatch(field: &FieldSpec) -> ValidationError {
    base_error(field, "type mismatch", "type_mismatch")
}

fn base_error(field: &FieldSpec, message: &str, code: &str) -> ValidationError {
    ValidationError {
        field_id: Some(field.id.clone()),
        path: Some(format!("/{}", field.id)),
        message: message.into(),
        code: Some(code.into()),
    }
}
