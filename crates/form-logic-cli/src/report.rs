use form_logic::{AuthoringError, FormIssue, ValidationResult};
use serde::Serialize;

/// Outcome of `form-logic check`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub ok: bool,
    pub issues: Vec<FormIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic_error: Option<String>,
}

impl CheckReport {
    pub fn new(issues: Vec<FormIssue>, logic_error: Option<AuthoringError>) -> Self {
        Self {
            ok: issues.is_empty() && logic_error.is_none(),
            issues,
            logic_error: logic_error.map(|error| error.to_string()),
        }
    }

    pub fn print(&self, form_id: &str) {
        if self.ok {
            println!("Form '{}' passed all checks.", form_id);
            return;
        }
        println!("Form '{}' has problems:", form_id);
        for issue in &self.issues {
            println!("  {} [{}] {}", issue.field_id, issue.code, issue.message);
        }
        if let Some(error) = &self.logic_error {
            println!("  logic: {}", error);
        }
    }
}

pub fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            );
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}
