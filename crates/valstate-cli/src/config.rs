//! # CLI Configuration
//!
//! Optional defaults read from `--config FILE` (YAML or JSON). Flags given
//! on the command line take precedence.
//!
//! ```yaml
//! abort_early: true
//! context:
//!   reserved_names: [admin, root]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Defaults applied to every `check` run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Stop validation at the first failure.
    pub abort_early: bool,
    /// Context passed to every schema validation call.
    pub context: Option<Value>,
}

impl CliConfig {
    /// Load the config file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let document = valstate_schema::load_document(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_value(document)
            .with_context(|| format!("invalid config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), abort_early = config.abort_early, "loaded config");
        Ok(config)
    }
}
