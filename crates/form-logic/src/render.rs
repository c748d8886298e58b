use serde_json::{Map, Value, json};

use crate::{
    answers_schema,
    spec::{field::FieldType, form::FormSpec},
    value::AnswerValue,
    visibility::resolve_effects,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible required field is still unanswered.
    NeedInput,
    /// Every visible required field is filled.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Describes a single field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub kind: FieldType,
    pub required: bool,
    pub visible: bool,
    pub disabled: bool,
    pub current_value: Option<Value>,
    pub options: Vec<String>,
}

impl RenderField {
    fn is_answered(&self) -> bool {
        self.current_value
            .as_ref()
            .is_some_and(|value| !AnswerValue::from_json(value).is_empty())
    }
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub form_version: String,
    pub help: Option<String>,
    pub status: RenderStatus,
    pub next_field_id: Option<String>,
    pub progress: RenderProgress,
    pub fields: Vec<RenderField>,
    pub schema: Value,
}

impl RenderPayload {
    pub fn visible_count(&self) -> usize {
        self.fields.iter().filter(|field| field.visible).count()
    }
}

/// Build the renderer payload from the form and the current answers.
pub fn build_render_payload(form: &FormSpec, answers: &Value) -> RenderPayload {
    let effects = resolve_effects(form, answers);

    let fields = form
        .fields
        .iter()
        .map(|field| {
            let state = effects.get(&field.id).copied();
            RenderField {
                id: field.id.clone(),
                label: field.label.clone(),
                description: field.description.clone(),
                placeholder: field.placeholder.clone(),
                kind: field.kind,
                required: state.is_some_and(|state| state.required),
                visible: state.is_none_or(|state| state.visible),
                disabled: state.is_some_and(|state| state.disabled),
                current_value: answers.get(&field.id).cloned(),
                options: field.options.clone(),
            }
        })
        .collect::<Vec<_>>();

    let pending = |field: &&RenderField| field.visible && !field.disabled && !field.is_answered();
    let next_required = fields
        .iter()
        .filter(pending)
        .find(|field| field.required)
        .map(|field| field.id.clone());
    let status = if next_required.is_some() {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };
    let next_field_id =
        next_required.or_else(|| fields.iter().find(pending).map(|field| field.id.clone()));

    let answered = fields
        .iter()
        .filter(|field| field.visible && field.is_answered())
        .count();
    let total = fields.iter().filter(|field| field.visible).count();

    RenderPayload {
        form_id: form.id.clone(),
        form_title: form.title.clone(),
        form_version: form.version.clone(),
        help: form.description.clone(),
        status,
        next_field_id,
        progress: RenderProgress { answered, total },
        fields,
        schema: answers_schema::generate(form, &effects),
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert(
                "description".into(),
                field
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("type".into(), Value::String(field.kind.label().to_string()));
            if let Some(placeholder) = &field.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            map.insert("required".into(), Value::Bool(field.required));
            map.insert("visible".into(), Value::Bool(field.visible));
            map.insert("disabled".into(), Value::Bool(field.disabled));
            if let Some(current_value) = &field.current_value {
                map.insert("current_value".into(), current_value.clone());
            }
            if !field.options.is_empty() {
                map.insert(
                    "options".into(),
                    Value::Array(
                        field
                            .options
                            .iter()
                            .map(|option| Value::String(option.clone()))
                            .collect(),
                    ),
                );
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "form_version": payload.form_version,
        "status": payload.status.as_str(),
        "next_field_id": payload.next_field_id,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "fields": fields,
        "schema": payload.schema,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    if let Some(next_field) = &payload.next_field_id {
        lines.push(format!("Next field: {}", next_field));
        if let Some(field) = payload.fields.iter().find(|field| &field.id == next_field) {
            lines.push(format!("  Label: {}", field.label));
            if let Some(description) = &field.description {
                lines.push(format!("  Description: {}", description));
            }
            if field.required {
                lines.push("  Required: yes".to_string());
            }
            if !field.options.is_empty() {
                lines.push(format!("  Options: {}", field.options.join(", ")));
            }
        }
    } else {
        lines.push("All visible fields are answered.".to_string());
    }

    lines.push("Visible fields:".to_string());
    for field in payload.fields.iter().filter(|field| field.visible) {
        let mut entry = format!(" - {} ({})", field.id, field.label);
        if field.required {
            entry.push_str(" [required]");
        }
        if field.disabled {
            entry.push_str(" [disabled]");
        }
        if let Some(current_value) = &field.current_value {
            entry.push_str(&format!(" = {}", value_to_display(current_value)));
        }
        lines.push(entry);
    }

    let hidden = payload
        .fields
        .iter()
        .filter(|field| !field.visible)
        .map(|field| field.id.as_str())
        .collect::<Vec<_>>();
    if !hidden.is_empty() {
        lines.push(format!("Hidden fields: {}", hidden.join(", ")));
    }

    lines.join("\n")
}

fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
