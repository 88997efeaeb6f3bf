//! # Defaults Subcommand
//!
//! Prints the value a fresh validation state holds for a schema: every
//! declared default applied, every other field `null`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use valstate_handler::{use_validation, ValidationOptions};
use valstate_schema::SchemaRef;

use crate::load_schema;

/// Arguments for the defaults subcommand.
#[derive(Args, Debug)]
pub struct DefaultsArgs {
    /// Schema file (JSON or YAML).
    pub schema: PathBuf,

    /// Print YAML instead of JSON.
    #[arg(long)]
    pub yaml: bool,
}

/// The initial value of a state built from `schema` with no value.
pub fn defaults_for(schema: SchemaRef) -> Result<Value> {
    let state = use_validation(ValidationOptions::new(schema))
        .context("schema defaults do not fit the schema shape")?;
    Ok(state.value())
}

/// Execute the defaults subcommand.
pub fn run_defaults(args: &DefaultsArgs) -> Result<u8> {
    let value = defaults_for(load_schema(&args.schema)?)?;
    let rendered = if args.yaml {
        serde_yaml::to_string(&value).context("failed to render YAML")?
    } else {
        serde_json::to_string_pretty(&value).context("failed to render JSON")? + "\n"
    };
    print!("{rendered}");
    Ok(0)
}
