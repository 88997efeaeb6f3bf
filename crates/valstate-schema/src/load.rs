//! # Document Loading
//!
//! Reads JSON or YAML files into `serde_json::Value`. Used for schema
//! documents, initial values, and validation context alike.

use std::path::Path;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::contract::SchemaError;

/// Load a JSON or YAML document from disk.
///
/// The format is chosen by extension: `.yaml`/`.yml` parse as YAML,
/// everything else as JSON.
///
/// # Errors
///
/// Returns [`SchemaError::Load`] if the file cannot be read or parsed.
pub fn load_document(path: &Path) -> Result<Value, SchemaError> {
    let load_error = |reason: String| SchemaError::Load {
        source_name: path.display().to_string(),
        reason,
    };

    let content =
        std::fs::read_to_string(path).map_err(|e| load_error(format!("cannot read file: {e}")))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        "yaml" | "yml" => {
            let yaml_value: serde_yaml::Value = serde_yaml::from_str(&content)
                .map_err(|e| load_error(format!("invalid YAML: {e}")))?;
            yaml_to_json_value(&yaml_value)
                .map_err(|e| load_error(format!("YAML has no JSON form: {e}")))
        }
        _ => serde_json::from_str(&content).map_err(|e| load_error(format!("invalid JSON: {e}"))),
    }
}

/// A YAML value with no JSON counterpart.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum YamlConversionError {
    /// JSON numbers cannot hold NaN or infinities.
    #[error("non-finite number {0} has no JSON form")]
    NonFiniteNumber(f64),

    /// JSON object keys are strings; only scalar YAML keys are stringified.
    #[error("mapping key {0:?} cannot become a JSON object key")]
    UnsupportedKey(serde_yaml::Value),
}

/// Convert a parsed YAML document to JSON.
///
/// Mapping order is kept. Tags are dropped and their inner value kept.
/// Numeric and boolean keys are rendered as strings.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, YamlConversionError> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => Value::Number(json_number(n)?),
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(
            items
                .iter()
                .map(yaml_to_json_value)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(entries) => {
            let mut object = Map::with_capacity(entries.len());
            for (key, item) in entries {
                let key = match key {
                    Yaml::String(s) => s.clone(),
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(YamlConversionError::UnsupportedKey(other.clone())),
                };
                object.insert(key, yaml_to_json_value(item)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json_value(&tagged.value)?,
    })
}

fn json_number(n: &serde_yaml::Number) -> Result<Number, YamlConversionError> {
    if let Some(i) = n.as_i64() {
        return Ok(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Ok(u.into());
    }
    let f = n.as_f64().unwrap_or(f64::NAN);
    Number::from_f64(f).ok_or(YamlConversionError::NonFiniteNumber(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_mapping_converts_in_order() {
        let yaml: serde_yaml::Value = serde_yaml::from_str(
            r#"
name: widget
count: 3
ratio: 0.5
enabled: true
tags: [a, b]
"#,
        )
        .unwrap();
        let value = yaml_to_json_value(&yaml).unwrap();
        assert_eq!(
            value,
            json!({"name": "widget", "count": 3, "ratio": 0.5, "enabled": true, "tags": ["a", "b"]})
        );
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["name", "count", "ratio", "enabled", "tags"]);
    }

    #[test]
    fn yaml_numeric_keys_become_strings() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one\n").unwrap();
        assert_eq!(yaml_to_json_value(&yaml).unwrap(), json!({"1": "one"}));
    }

    #[test]
    fn load_json_and_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("value.json");
        std::fs::write(&json_path, r#"{"a": [1, 2]}"#).unwrap();
        let yaml_path = dir.path().join("value.yaml");
        std::fs::write(&yaml_path, "a:\n  - 1\n  - 2\n").unwrap();

        assert_eq!(load_document(&json_path).unwrap(), json!({"a": [1, 2]}));
        assert_eq!(load_document(&yaml_path).unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn load_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SchemaError::Load { .. }), "got: {err}");
    }

    #[test]
    fn load_invalid_json_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"), "got: {err}");
    }

    #[test]
    fn yaml_infinity_and_complex_keys_are_rejected() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("limit: .inf\n").unwrap();
        assert!(matches!(
            yaml_to_json_value(&yaml),
            Err(YamlConversionError::NonFiniteNumber(f)) if f.is_infinite()
        ));

        let yaml: serde_yaml::Value = serde_yaml::from_str("? [a, b]\n: pair\n").unwrap();
        assert!(matches!(
            yaml_to_json_value(&yaml),
            Err(YamlConversionError::UnsupportedKey(_))
        ));
    }

    #[test]
    fn yaml_tags_keep_inner_value() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("when: !date 2024-01-01\n").unwrap();
        assert_eq!(yaml_to_json_value(&yaml).unwrap(), json!({"when": "2024-01-01"}));
    }
}
