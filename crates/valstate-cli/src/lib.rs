//! # valstate-cli — Command-Line Front End
//!
//! Provides the `valstate` command-line interface over the handler tree.
//!
//! ## Subcommands
//!
//! - `valstate check` — Build a validation state for a document, validate
//!   it, and report every error by path.
//! - `valstate defaults` — Print the value a fresh state holds for a schema.
//!
//! ```bash
//! valstate check schemas/order.yaml orders/1042.json
//! valstate check schemas/order.yaml orders/1042.json --abort-early --json
//! valstate --config valstate.yaml check schemas/order.yaml orders/1042.yaml
//! valstate defaults schemas/order.yaml
//! ```

pub mod check;
pub mod config;
pub mod defaults;

use std::path::Path;

use anyhow::{Context, Result};
use valstate_schema::{JsonSchema, SchemaRef};

/// Load a JSON or YAML schema file.
pub fn load_schema(path: &Path) -> Result<SchemaRef> {
    let schema = JsonSchema::from_file(path)
        .with_context(|| format!("failed to load schema: {}", path.display()))?;
    Ok(schema.into_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use valstate_schema::SchemaKind;

    #[test]
    fn load_schema_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, "type: array\nitems: {type: string}\n").unwrap();
        let schema = load_schema(&path).unwrap();
        assert_eq!(schema.kind(), SchemaKind::Array);
    }

    #[test]
    fn load_schema_missing_file_has_context() {
        let err = load_schema(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load schema"));
    }
}
