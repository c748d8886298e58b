use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::spec::field::FieldType;
use crate::spec::form::FormSpec;
use crate::value::AnswerValue;

/// Optional metadata captured alongside a submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Normalized answers ready to be handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Submission {
    pub form_id: String,
    pub form_version: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SubmissionMeta>,
}

impl Submission {
    /// Builds a submission with answers shaped per field type.
    pub fn new(form: &FormSpec, answers: &Value) -> Self {
        Self {
            form_id: form.id.clone(),
            form_version: form.version.clone(),
            data: transform_submission(form, answers),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: SubmissionMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Serializes the submission as canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    /// Serializes the submission as indented JSON for debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Shapes raw answers for storage: checkbox answers become lists, number
/// answers become JSON numbers, dates become UTC RFC 3339 timestamps, empty
/// answers become `null`. Every field of the form gets an entry; answers for
/// unknown ids are dropped.
pub fn transform_submission(form: &FormSpec, answers: &Value) -> Value {
    let mut data = Map::new();
    for field in &form.fields {
        let raw = answers.get(&field.id).cloned().unwrap_or(Value::Null);
        let shaped = match field.kind {
            kind if kind.is_multi_valued() => match raw {
                Value::Array(items) => Value::Array(items),
                Value::Null => Value::Array(Vec::new()),
                Value::String(text) if text.is_empty() => Value::Array(Vec::new()),
                other => Value::Array(vec![other]),
            },
            FieldType::Number => {
                let number = AnswerValue::from_json(&raw);
                if number.is_empty() {
                    Value::Null
                } else {
                    serde_json::Number::from_f64(number.to_number())
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
            _ if AnswerValue::from_json(&raw).is_empty() => Value::Null,
            FieldType::Date => match raw.as_str().and_then(normalize_date) {
                Some(timestamp) => Value::String(timestamp),
                None => {
                    tracing::debug!(field = %field.id, "keeping unparseable date answer as-is");
                    raw
                }
            },
            _ => raw,
        };
        data.insert(field.id.clone(), shaped);
    }
    Value::Object(data)
}

/// Reads `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp and
/// writes it back in UTC.
fn normalize_date(text: &str) -> Option<String> {
    let moment = match OffsetDateTime::parse(text, &Rfc3339) {
        Ok(moment) => moment,
        Err(_) => parse_calendar_date(text)?.midnight().assume_utc(),
    };
    moment.to_offset(UtcOffset::UTC).format(&Rfc3339).ok()
}

fn parse_calendar_date(text: &str) -> Option<Date> {
    let mut parts = text.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}

/// Share of fields, rounded to a whole percent, whose required answer is present.
/// Optional fields always count as complete.
pub fn completion_percentage(form: &FormSpec, answers: &Value) -> u8 {
    if form.fields.is_empty() {
        return 100;
    }
    let filled = form
        .fields
        .iter()
        .filter(|field| !field.required || !AnswerValue::lookup(answers, &field.id).is_empty())
        .count();
    ((filled as f64 / form.fields.len() as f64) * 100.0).round() as u8
}
