//! # Value Helpers
//!
//! Handlers model the "undefined" value of a field as `Option<Value>::None`
//! and an explicit empty value as `Some(Value::Null)`. The helpers here keep
//! that distinction in one place.

use serde_json::Value;

/// Name of the JSON type of `value`, as used in shape-mismatch errors.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolve an optional value through a chain of fallbacks, ending in `null`.
///
/// The first `Some` wins. `Some(Value::Null)` counts as present: an explicit
/// `null` is never replaced by a later fallback.
pub fn resolve_or_null<I>(candidates: I) -> Value
where
    I: IntoIterator<Item = Option<Value>>,
{
    candidates
        .into_iter()
        .flatten()
        .next()
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(1.5)), "number");
        assert_eq!(json_type_name(&json!("x")), "string");
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
        assert_eq!(json_type_name(&json!(true)), "boolean");
    }

    #[test]
    fn resolve_takes_first_present() {
        assert_eq!(resolve_or_null([None, Some(json!("d"))]), json!("d"));
        assert_eq!(resolve_or_null([Some(json!(1)), Some(json!(2))]), json!(1));
    }

    #[test]
    fn explicit_null_is_kept() {
        assert_eq!(resolve_or_null([Some(Value::Null), Some(json!("d"))]), Value::Null);
    }

    #[test]
    fn nothing_resolves_to_null() {
        assert_eq!(resolve_or_null([None, None]), Value::Null);
    }
}
