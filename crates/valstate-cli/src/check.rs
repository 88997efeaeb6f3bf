//! # Check Subcommand
//!
//! Builds a validation state for a document, runs `validate()` once, and
//! prints the resulting errors keyed by path. Exit code 0 means valid, 1
//! means invalid or failed.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{json, Value};

use valstate_handler::{use_validation, Errors, ValidationOptions};
use valstate_schema::SchemaRef;

use crate::config::CliConfig;
use crate::load_schema;

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema file (JSON or YAML).
    pub schema: PathBuf,

    /// Document to check (JSON or YAML).
    pub document: PathBuf,

    /// Stop at the first failure.
    #[arg(long)]
    pub abort_early: bool,

    /// File whose content is passed to every validation call as context.
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Print a JSON report instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Outcome of one check.
#[derive(Debug)]
pub struct CheckReport {
    pub valid: bool,
    pub errors: Errors,
}

impl CheckReport {
    /// One line per error, `path: message`.
    pub fn render_text(&self) -> String {
        if self.valid {
            return "valid\n".to_string();
        }
        let mut out = format!("invalid ({} errors)\n", self.errors.len());
        for (path, message) in self.errors.flatten() {
            let _ = writeln!(out, "  {path}: {message}");
        }
        out
    }

    /// `{"valid": bool, "errors": <errors keyed like the data>}`.
    pub fn to_json(&self) -> Value {
        json!({
            "valid": self.valid,
            "errors": self.errors.to_value(),
        })
    }
}

/// Validate `document` against `schema` through a fresh validation state.
pub fn check_document(
    schema: SchemaRef,
    document: Value,
    abort_early: bool,
    context: Option<Value>,
) -> Result<CheckReport> {
    let mut options = ValidationOptions::new(schema)
        .value(document)
        .abort_early(abort_early);
    options.context = context;
    let mut state = use_validation(options).context("document does not fit the schema shape")?;
    let valid = state.validate().context("validation aborted")?;
    Ok(CheckReport {
        valid,
        errors: state.errors(),
    })
}

fn load_value(path: &Path, what: &str) -> Result<Value> {
    valstate_schema::load_document(path)
        .with_context(|| format!("failed to load {what}: {}", path.display()))
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs, config: &CliConfig) -> Result<u8> {
    let schema = load_schema(&args.schema)?;
    let document = load_value(&args.document, "document")?;
    let context = match &args.context {
        Some(path) => Some(load_value(path, "context")?),
        None => config.context.clone(),
    };
    let abort_early = args.abort_early || config.abort_early;
    tracing::info!(
        schema = %args.schema.display(),
        document = %args.document.display(),
        abort_early,
        "checking document"
    );

    let report = check_document(schema, document, abort_early, context)?;
    if args.json {
        let rendered =
            serde_json::to_string_pretty(&report.to_json()).context("failed to render report")?;
        println!("{rendered}");
    } else {
        print!("{}", report.render_text());
    }
    Ok(if report.valid { 0 } else { 1 })
}
