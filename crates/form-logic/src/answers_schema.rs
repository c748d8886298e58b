use serde_json::{Map, Value, json};

use crate::spec::field::{FieldSpec, FieldType};
use crate::spec::form::FormSpec;
use crate::visibility::EffectsMap;

/// JSON Schema for the answers of the fields that are currently visible.
pub fn generate(form: &FormSpec, effects: &EffectsMap) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in &form.fields {
        let Some(state) = effects.get(&field.id) else {
            continue;
        };
        if !state.visible {
            continue;
        }
        properties.insert(field.id.clone(), field_schema(field));
        if state.required {
            required.push(Value::String(field.id.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": form.title,
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn field_schema(field: &FieldSpec) -> Value {
    let mut schema = match field.kind {
        FieldType::Number => json!({ "type": ["number", "string"] }),
        FieldType::Toggle => json!({ "type": "boolean" }),
        FieldType::Email => json!({ "type": "string", "format": "email" }),
        FieldType::Url => json!({ "type": "string", "format": "uri" }),
        FieldType::Date => json!({ "type": "string", "format": "date" }),
        FieldType::Select | FieldType::Radio => json!({ "type": "string", "enum": field.options }),
        FieldType::Checkbox => json!({
            "type": "array",
            "items": { "type": "string", "enum": field.options },
            "uniqueItems": true,
        }),
        FieldType::Text
        | FieldType::Textarea
        | FieldType::Phone
        | FieldType::Image
        | FieldType::File => json!({ "type": "string" }),
    };

    if let Some(map) = schema.as_object_mut() {
        map.insert("title".into(), Value::String(field.label.clone()));
        if let Some(description) = &field.description {
            map.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(constraint) = &field.constraint {
            if let Some(pattern) = &constraint.pattern {
                map.insert("pattern".into(), Value::String(pattern.clone()));
            }
            if let Some(min_len) = constraint.min_len {
                map.insert("minLength".into(), json!(min_len));
            }
            if let Some(max_len) = constraint.max_len {
                map.insert("maxLength".into(), json!(max_len));
            }
            if let Some(min) = constraint.min {
                map.insert("minimum".into(), json!(min));
            }
            if let Some(max) = constraint.max {
                map.insert("maximum".into(), json!(max));
            }
        }
    }
    schema
}
