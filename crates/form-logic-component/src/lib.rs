//! String-in, string-out entry points for renderers and builders that talk to
//! the logic engine over JSON. Every function answers with a JSON document;
//! failures are reported as `{"error": "..."}` instead of panicking.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use form_logic::{
    AuthoringError, FieldType, FormSpec, LogicRule, available_trigger_fields,
    build_render_payload, field_effects as qa_field_effects, legal_conditions_for_type,
    render_json_ui as qa_render_json_ui, render_text as qa_render_text, resolve_visibility,
    set_field_logic as qa_set_field_logic, validate,
};

const DEFAULT_FORM: &str = include_str!("../../form-logic/tests/fixtures/feedback_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse {0}: {1}")]
    InputParse(&'static str, #[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("field '{0}' is not part of the form")]
    FieldUnavailable(String),
    #[error("unknown field type '{0}'")]
    FieldType(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_json: Option<String>,
}

fn load_form(config_json: &str) -> Result<FormSpec, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let form_json = config.form_json.as_deref().unwrap_or(DEFAULT_FORM);

    serde_json::from_str(form_json).map_err(ComponentError::ConfigParse)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSpec, ComponentError> {
    let form = load_form(config_json)?;
    if form.id != form_id {
        tracing::debug!(requested = form_id, loaded = %form.id, "form id mismatch");
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(form)
    }
}

/// Answers that fail to parse are treated as an empty answer map.
fn parse_answers(answers_json: &str) -> Value {
    serde_json::from_str(answers_json).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .and_then(|form| serde_json::to_value(form).map_err(ComponentError::JsonEncode)),
    )
}

/// Visibility of every field as `{ field_id: bool }`.
pub fn evaluate_visibility(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let answers = parse_answers(answers_json);
        serde_json::to_value(resolve_visibility(&form, &answers))
            .map_err(ComponentError::JsonEncode)
    }))
}

/// Visible/required/disabled flags for one field.
pub fn field_effects(
    form_id: &str,
    config_json: &str,
    field_id: &str,
    answers_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let field = form
            .field(field_id)
            .ok_or_else(|| ComponentError::FieldUnavailable(field_id.to_string()))?;
        let effects = qa_field_effects(field, &parse_answers(answers_json));
        Ok(json!({
            "field_id": field_id,
            "visible": effects.visible,
            "required": effects.required,
            "disabled": effects.disabled,
        }))
    }))
}

pub fn validate_answers(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        let answers = serde_json::from_str(answers_json)
            .map_err(|error| ComponentError::InputParse("answers", error))?;
        serde_json::to_value(validate(&form, &answers)).map_err(ComponentError::JsonEncode)
    }))
}

pub fn render_text(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond_string(ensure_form(form_id, config_json).map(|form| {
        let payload = build_render_payload(&form, &parse_answers(answers_json));
        qa_render_text(&payload)
    }))
}

pub fn render_json_ui(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).map(|form| {
        let payload = build_render_payload(&form, &parse_answers(answers_json));
        qa_render_json_ui(&payload)
    }))
}

/// Fields that may be offered as triggers when editing `field_id`'s logic.
pub fn trigger_fields(form_id: &str, config_json: &str, field_id: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|form| {
        if form.field(field_id).is_none() {
            return Err(ComponentError::FieldUnavailable(field_id.to_string()));
        }
        let candidates = available_trigger_fields(field_id, &form.fields)
            .iter()
            .map(|field| {
                let conditions = legal_conditions_for_type(field.kind)
                    .iter()
                    .map(|condition| condition.as_str())
                    .collect::<Vec<_>>();
                json!({
                    "id": field.id,
                    "label": field.label,
                    "type": field.kind.label(),
                    "options": field.options,
                    "conditions": conditions,
                })
            })
            .collect::<Vec<_>>();
        Ok(Value::Array(candidates))
    }))
}

/// Operators the builder offers for a trigger of `field_type`.
pub fn legal_conditions(field_type: &str) -> String {
    respond(
        serde_json::from_value::<FieldType>(Value::String(field_type.to_string()))
            .map_err(|_| ComponentError::FieldType(field_type.to_string()))
            .map(|kind| {
                Value::Array(
                    legal_conditions_for_type(kind)
                        .iter()
                        .map(|condition| Value::String(condition.as_str().to_string()))
                        .collect(),
                )
            }),
    )
}

/// Saves `rules_json` onto `field_id` and returns the updated form.
pub fn set_field_logic(
    form_id: &str,
    config_json: &str,
    field_id: &str,
    rules_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|mut form| {
        let rules: Vec<LogicRule> = serde_json::from_str(rules_json)
            .map_err(|error| ComponentError::InputParse("rules", error))?;
        let kept = qa_set_field_logic(&mut form, field_id, rules)?;
        tracing::debug!(form = form_id, field = field_id, kept, "saved field logic");
        serde_json::to_value(form).map_err(ComponentError::JsonEncode)
    }))
}
