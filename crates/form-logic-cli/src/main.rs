mod report;

use clap::{Parser, Subcommand, ValueEnum};
use form_logic::{
    FieldType, FormSpec, LogicRule, available_trigger_fields, check_form_logic, form_schema,
    legal_conditions_for_type, lint_form, set_field_logic, validate,
};
use form_logic_component::{render_json_ui, render_text};
use serde_json::{Value, json};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use report::{CheckReport, describe_validation};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "FORM_LOGIC_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Conditional form logic CLI",
    long_about = "Evaluates field visibility, validates submissions, and edits logic rules on form documents"
)]
struct Cli {
    /// Log evaluation details to stderr (overridden by FORM_LOGIC_LOG).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show which fields are visible, required, or disabled for a set of answers.
    Evaluate {
        /// Path to the form JSON document.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Optional JSON file containing the current answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate answers against a form; hidden fields are skipped.
    Validate {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// List the fields that may trigger rules on a given field.
    Triggers {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Id of the dependent field.
        #[arg(long, value_name = "FIELD")]
        field: String,
    },
    /// List the conditions offered for a trigger field type.
    Conditions {
        /// Field type, e.g. text, number, checkbox.
        #[arg(long = "type", value_name = "TYPE")]
        field_type: String,
    },
    /// Lint field definitions and reject unresolved or cyclic logic.
    Check {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the JSON Schema of form documents.
    Schema,
    /// Replace the logic rules of one field.
    SetLogic {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "FIELD")]
        field: String,
        /// JSON file holding an array of rules.
        #[arg(long, value_name = "RULES")]
        rules: PathBuf,
        /// Where to write the updated form (defaults to overwriting FORM).
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Command::Evaluate {
            form,
            answers,
            format,
        } => run_evaluate(form, answers, format),
        Command::Validate { form, answers } => run_validate(form, answers),
        Command::Triggers { form, field } => run_triggers(form, field),
        Command::Conditions { field_type } => run_conditions(&field_type),
        Command::Check { form, json } => run_check(form, json),
        Command::Schema => run_schema(),
        Command::SetLogic {
            form,
            field,
            rules,
            out,
        } => run_set_logic(form, field, rules, out),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = env::var(LOG_ENV)
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn load_form(path: &Path) -> CliResult<FormSpec> {
    let contents = fs::read_to_string(path)
        .map_err(|error| format!("failed to read form {}: {}", path.display(), error))?;
    let form: FormSpec = serde_json::from_str(&contents)
        .map_err(|error| format!("invalid form {}: {}", path.display(), error))?;
    tracing::debug!(
        form = %form.id,
        fields = form.fields.len(),
        has_logic = form.has_logic(),
        "loaded form"
    );
    Ok(form)
}

fn load_answers(path: &Path) -> CliResult<Value> {
    let contents = fs::read_to_string(path)
        .map_err(|error| format!("failed to read answers {}: {}", path.display(), error))?;
    let answers: Value = serde_json::from_str(&contents)
        .map_err(|error| format!("invalid answers {}: {}", path.display(), error))?;
    if !answers.is_object() {
        return Err("answers must be a JSON object keyed by field id".into());
    }
    Ok(answers)
}

fn run_evaluate(
    form_path: PathBuf,
    answers_path: Option<PathBuf>,
    format: RenderMode,
) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let answers = match answers_path {
        Some(path) => load_answers(&path)?,
        None => json!({}),
    };
    let config = json!({ "form_json": serde_json::to_string(&form)? }).to_string();
    let answers_json = answers.to_string();

    let output = match format {
        RenderMode::Text => render_text(&form.id, &config, &answers_json),
        RenderMode::Json => {
            let rendered = render_json_ui(&form.id, &config, &answers_json);
            let ui: Value = serde_json::from_str(&rendered)?;
            serde_json::to_string_pretty(&ui)?
        }
    };
    println!("{}", output);
    Ok(())
}

fn run_validate(form_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let answers = load_answers(&answers_path)?;

    let result = validate(&form, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_triggers(form_path: PathBuf, field_id: String) -> CliResult<()> {
    let form = load_form(&form_path)?;
    if form.field(&field_id).is_none() {
        return Err(format!("field '{}' is not part of form '{}'", field_id, form.id).into());
    }
    let candidates = available_trigger_fields(&field_id, &form.fields);
    if candidates.is_empty() {
        println!(
            "No fields are available as triggers for '{}'; add fields before it first.",
            field_id
        );
        return Ok(());
    }
    println!("Trigger fields for '{}':", field_id);
    for candidate in candidates {
        let conditions = legal_conditions_for_type(candidate.kind)
            .iter()
            .map(|condition| condition.as_str())
            .collect::<Vec<_>>();
        println!(
            " - {} ({}, {}): {}",
            candidate.id,
            candidate.label,
            candidate.kind.label(),
            conditions.join(", ")
        );
    }
    Ok(())
}

fn run_conditions(field_type: &str) -> CliResult<()> {
    let kind: FieldType = serde_json::from_value(Value::String(field_type.to_string()))
        .map_err(|_| format!("unknown field type '{}'", field_type))?;
    for condition in legal_conditions_for_type(kind) {
        println!("{}", condition.as_str());
    }
    Ok(())
}

fn run_check(form_path: PathBuf, as_json: bool) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let report = CheckReport::new(lint_form(&form), check_form_logic(&form).err());
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print(&form.id);
    }
    if report.ok {
        Ok(())
    } else {
        Err("form check failed".into())
    }
}

fn run_schema() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&form_schema())?);
    Ok(())
}

fn run_set_logic(
    form_path: PathBuf,
    field_id: String,
    rules_path: PathBuf,
    out: Option<PathBuf>,
) -> CliResult<()> {
    let mut form = load_form(&form_path)?;
    let contents = fs::read_to_string(&rules_path)?;
    let rules: Vec<LogicRule> = serde_json::from_str(&contents)
        .map_err(|error| format!("invalid rules {}: {}", rules_path.display(), error))?;
    let submitted = rules.len();
    let kept = set_field_logic(&mut form, &field_id, rules)?;

    let target = out.unwrap_or(form_path);
    fs::write(&target, serde_json::to_string_pretty(&form)?)?;
    println!(
        "Saved {} of {} rules on '{}' to {}",
        kept,
        submitted,
        field_id,
        target.display()
    );
    Ok(())
}
