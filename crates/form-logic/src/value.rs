use serde_json::Value;

/// Normalized shape of an answer or a rule operand.
///
/// Answers arrive as loosely typed JSON from the renderer. Conditions match on
/// this enum instead of inspecting JSON types ad hoc.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    /// Absent or `null`.
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Multi-select answer (checkbox) or a list operand. Items keep their own shape.
    Multi(Vec<AnswerValue>),
    /// A JSON object. Present, but never equal to, contained in, or matched by anything.
    Opaque,
}

impl AnswerValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => AnswerValue::Empty,
            Value::String(text) => AnswerValue::Text(text.clone()),
            Value::Number(number) => number
                .as_f64()
                .map(AnswerValue::Number)
                .unwrap_or(AnswerValue::Empty),
            Value::Bool(flag) => AnswerValue::Bool(*flag),
            Value::Array(items) => AnswerValue::Multi(items.iter().map(Self::from_json).collect()),
            Value::Object(_) => AnswerValue::Opaque,
        }
    }

    /// Looks up `field_id` in an answer map; a missing entry or non-object map is `Empty`.
    pub fn lookup(answers: &Value, field_id: &str) -> Self {
        answers
            .get(field_id)
            .map(Self::from_json)
            .unwrap_or(AnswerValue::Empty)
    }

    /// Absent, null, empty string, or empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Empty => true,
            AnswerValue::Text(text) => text.is_empty(),
            AnswerValue::Multi(items) => items.is_empty(),
            AnswerValue::Number(_) | AnswerValue::Bool(_) | AnswerValue::Opaque => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric coercion with the semantics of a browser `Number(...)` call.
    /// Anything that does not read as a number is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            AnswerValue::Empty => f64::NAN,
            AnswerValue::Number(number) => *number,
            AnswerValue::Bool(flag) => {
                if *flag {
                    1.0
                } else {
                    0.0
                }
            }
            AnswerValue::Text(text) => parse_numeric(text),
            // Lists coerce through their joined text form.
            AnswerValue::Multi(items) => match items.as_slice() {
                [] => 0.0,
                [AnswerValue::Empty] => 0.0,
                [AnswerValue::Bool(_)] | [AnswerValue::Opaque] => f64::NAN,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            AnswerValue::Opaque => f64::NAN,
        }
    }

    /// Strict equality: same shape and same payload, no coercion across shapes.
    /// Lists and objects compare by identity in the browser, so they never match here.
    pub fn strict_eq(&self, other: &AnswerValue) -> bool {
        match (self, other) {
            (AnswerValue::Empty, AnswerValue::Empty) => true,
            (AnswerValue::Text(left), AnswerValue::Text(right)) => left == right,
            (AnswerValue::Number(left), AnswerValue::Number(right)) => left == right,
            (AnswerValue::Bool(left), AnswerValue::Bool(right)) => left == right,
            _ => false,
        }
    }
}

fn parse_numeric(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(number) = parse_radix_literal(trimmed) {
        return number;
    }
    // Rust's float parser also accepts "inf" and "nan"; browsers do not.
    if trimmed
        .chars()
        .any(|ch| ch.is_ascii_alphabetic() && !matches!(ch, 'e' | 'E'))
    {
        return match trimmed {
            "Infinity" | "+Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            _ => f64::NAN,
        };
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Unsigned `0x`, `0o` and `0b` literals. Signs and separators are not allowed.
fn parse_radix_literal(text: &str) -> Option<f64> {
    let radix = match text.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() {
        return Some(f64::NAN);
    }
    let number = digits.chars().try_fold(0.0_f64, |acc, ch| {
        ch.to_digit(radix).map(|digit| acc * f64::from(radix) + f64::from(digit))
    });
    Some(number.unwrap_or(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_shapes_are_empty() {
        assert!(AnswerValue::lookup(&json!({}), "missing").is_empty());
        assert!(AnswerValue::from_json(&json!(null)).is_empty());
        assert!(AnswerValue::from_json(&json!("")).is_empty());
        assert!(AnswerValue::from_json(&json!([])).is_empty());
        assert!(!AnswerValue::from_json(&json!("x")).is_empty());
        assert!(!AnswerValue::from_json(&json!([1])).is_empty());
        assert!(!AnswerValue::from_json(&json!(0)).is_empty());
    }

    #[test]
    fn numeric_coercion_matches_browser_rules() {
        assert_eq!(AnswerValue::Text(" 42 ".into()).to_number(), 42.0);
        assert_eq!(AnswerValue::Text("".into()).to_number(), 0.0);
        assert_eq!(AnswerValue::Text("1e3".into()).to_number(), 1000.0);
        assert!(AnswerValue::Text("abc".into()).to_number().is_nan());
        assert!(AnswerValue::Text("nan".into()).to_number().is_nan());
        assert!(AnswerValue::Empty.to_number().is_nan());
        assert_eq!(AnswerValue::Text("0x10".into()).to_number(), 16.0);
        assert_eq!(AnswerValue::Text(" 0B101 ".into()).to_number(), 5.0);
        assert_eq!(AnswerValue::Text("0o17".into()).to_number(), 15.0);
        assert!(AnswerValue::Text("0x".into()).to_number().is_nan());
        assert!(AnswerValue::Text("0xG1".into()).to_number().is_nan());
        assert!(AnswerValue::Text("-0x10".into()).to_number().is_nan());
        assert!(AnswerValue::Text("0b2".into()).to_number().is_nan());
        assert_eq!(AnswerValue::from_json(&json!(["7"])).to_number(), 7.0);
        assert_eq!(AnswerValue::from_json(&json!([7])).to_number(), 7.0);
        assert_eq!(AnswerValue::from_json(&json!([null])).to_number(), 0.0);
        assert!(AnswerValue::from_json(&json!([true])).to_number().is_nan());
        assert!(AnswerValue::from_json(&json!(["1", "2"])).to_number().is_nan());
    }

    #[test]
    fn strict_equality_does_not_coerce() {
        assert!(AnswerValue::Text("5".into()).strict_eq(&AnswerValue::Text("5".into())));
        assert!(!AnswerValue::Text("5".into()).strict_eq(&AnswerValue::Number(5.0)));
        assert!(!AnswerValue::Empty.strict_eq(&AnswerValue::Text("".into())));
    }

    #[test]
    fn list_items_keep_their_shape() {
        assert_eq!(
            AnswerValue::from_json(&json!([1, "a", true])),
            AnswerValue::Multi(vec![
                AnswerValue::Number(1.0),
                AnswerValue::Text("a".into()),
                AnswerValue::Bool(true),
            ])
        );
    }

    #[test]
    fn objects_are_present_but_opaque() {
        let object = AnswerValue::from_json(&json!({ "text": "hello" }));
        assert_eq!(object, AnswerValue::Opaque);
        assert!(!object.is_empty());
        assert!(object.as_text().is_none());
        assert!(object.to_number().is_nan());
        assert!(!object.strict_eq(&AnswerValue::Opaque));
    }
}
