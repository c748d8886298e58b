use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use regex::Regex;

use crate::spec::rule::Condition;
use crate::value::AnswerValue;

const PATTERN_CACHE_LIMIT: usize = 256;

/// Compiled `matches_regex` operands, keyed by pattern text. `None` marks an invalid pattern.
static PATTERNS: LazyLock<Mutex<HashMap<String, Option<Regex>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Applies `condition` to the trigger field's answer and the rule's operand.
///
/// Never fails: operands of the wrong shape make the condition unsatisfied.
pub fn evaluate_condition(
    condition: Condition,
    trigger: &AnswerValue,
    rule_value: &AnswerValue,
) -> bool {
    match condition {
        Condition::Equals => equals(trigger, rule_value),
        Condition::NotEquals => !equals(trigger, rule_value),
        Condition::Contains => contains(trigger, rule_value).unwrap_or(false),
        Condition::NotContains => contains(trigger, rule_value)
            .map(|found| !found)
            .unwrap_or(false),
        // NaN compares false both ways.
        Condition::GreaterThan => trigger.to_number() > rule_value.to_number(),
        Condition::LessThan => trigger.to_number() < rule_value.to_number(),
        Condition::IsEmpty => trigger.is_empty(),
        Condition::IsNotEmpty => !trigger.is_empty(),
        Condition::MatchesRegex => matches_regex(trigger, rule_value),
        Condition::Unknown => false,
    }
}

/// Multi-select answers match when they share at least one item with the operand.
/// Items are compared strictly, so `["1"]` never equals `1`.
fn equals(trigger: &AnswerValue, rule_value: &AnswerValue) -> bool {
    match (trigger, rule_value) {
        (AnswerValue::Multi(selected), AnswerValue::Multi(wanted)) => selected
            .iter()
            .any(|item| wanted.iter().any(|candidate| item.strict_eq(candidate))),
        (AnswerValue::Multi(selected), scalar) => {
            selected.iter().any(|item| item.strict_eq(scalar))
        }
        (scalar, operand) => scalar.strict_eq(operand),
    }
}

fn contains(trigger: &AnswerValue, rule_value: &AnswerValue) -> Option<bool> {
    let haystack = trigger.as_text()?;
    let needle = rule_value.as_text()?;
    Some(haystack.to_lowercase().contains(&needle.to_lowercase()))
}

fn matches_regex(trigger: &AnswerValue, rule_value: &AnswerValue) -> bool {
    let (Some(text), Some(pattern)) = (trigger.as_text(), rule_value.as_text()) else {
        return false;
    };
    compiled_pattern(pattern).is_some_and(|regex| regex.is_match(text))
}

fn compiled_pattern(pattern: &str) -> Option<Regex> {
    let Ok(mut cache) = PATTERNS.lock() else {
        return compile_pattern(pattern);
    };
    if let Some(entry) = cache.get(pattern) {
        return entry.clone();
    }
    if cache.len() >= PATTERN_CACHE_LIMIT {
        cache.clear();
    }
    let compiled = compile_pattern(pattern);
    cache.insert(pattern.to_string(), compiled.clone());
    compiled
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::debug!(%pattern, %error, "ignoring invalid matches_regex pattern");
            None
        }
    }
}
