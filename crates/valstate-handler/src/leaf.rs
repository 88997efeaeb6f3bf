//! # Leaf Handler
//!
//! The base case of the handler tree: one scalar (or opaque) value validated
//! as a whole by its schema.
//!
//! ## Value Resolution
//!
//! | Operation          | Fallback chain                                   |
//! |--------------------|--------------------------------------------------|
//! | construction       | option value → schema default → `null`           |
//! | `set_value(None)`  | schema default → `null`                          |
//! | `set_value(Some)`  | stored verbatim, including an explicit `null`    |
//! | `reset(None)`      | option value → schema default → `null`           |
//! | `reset(Some(v))`   | `v`                                              |

use std::rc::Rc;

use serde_json::Value;

use valstate_core::{resolve_or_null, ChangeEvent, ChangeKind, Notifier, Subscription};
use valstate_schema::{SchemaRef, ValidateOptions};

use crate::error::{capture, HandlerError};
use crate::options::HandlerOptions;

/// Handler for a primitive or unknown schema node.
#[derive(Debug)]
pub struct LeafHandler {
    schema: SchemaRef,
    options: Rc<ValidateOptions>,
    initial: Option<Value>,
    value: Value,
    baseline: Value,
    errors: Vec<String>,
    valid: bool,
    notifier: Notifier,
}

impl LeafHandler {
    /// Create a leaf. Starts unvalidated, clean, and without errors.
    pub fn new(schema: SchemaRef, options: &HandlerOptions) -> Self {
        let initial = options.value.clone();
        let value = resolve_or_null([initial.clone(), schema.default_value()]);
        Self {
            options: Rc::clone(&options.validate),
            baseline: value.clone(),
            value,
            initial,
            schema,
            errors: Vec::new(),
            valid: false,
            notifier: Notifier::new(),
        }
    }

    /// The schema node this leaf validates against.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Assign a value. `None` resolves to the schema default, else `null`.
    pub fn set_value(&mut self, value: Option<Value>) {
        let next = resolve_or_null([value, self.schema.default_value()]);
        if next == self.value {
            return;
        }
        self.value = next;
        self.notifier.emit(ChangeKind::Value);
    }

    /// Messages from the last validation.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Whether the last validation passed and no reset happened since.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the value differs from the construction/reset baseline.
    pub fn is_dirty(&self) -> bool {
        self.value != self.baseline
    }

    /// Validate the current value.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Schema`] if the schema fails for a reason
    /// other than invalid data. The handler's state is left untouched.
    pub fn validate(&mut self) -> Result<bool, HandlerError> {
        tracing::trace!(kind = %self.schema.kind(), "validating leaf");
        let result = self.schema.validate(&self.value, &self.options);
        self.valid = capture(result, &mut self.errors)?;
        self.notifier.emit(ChangeKind::Validation);
        Ok(self.valid)
    }

    /// Restore a baseline: `value` if given, else the construction value,
    /// else the schema default, else `null`. Clears errors and validity.
    pub fn reset(&mut self, value: Option<Value>) {
        self.value = resolve_or_null([value, self.initial.clone(), self.schema.default_value()]);
        self.baseline = self.value.clone();
        self.errors.clear();
        self.valid = false;
        self.notifier.emit(ChangeKind::Reset);
    }

    /// The leaf's change notifier.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Register a change listener on this leaf.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use valstate_schema::{JsonSchema, SchemaError};

    fn schema(doc: Value) -> SchemaRef {
        JsonSchema::from_value(doc).unwrap().into_ref()
    }

    fn leaf(doc: Value, value: Option<Value>) -> LeafHandler {
        LeafHandler::new(schema(doc), &HandlerOptions::default().with_value(value))
    }

    #[test]
    fn initial_value_falls_back_to_default_then_null() {
        assert_eq!(
            leaf(json!({"type": "string", "default": "default"}), None).value(),
            &json!("default")
        );
        assert_eq!(leaf(json!({"type": "string"}), None).value(), &Value::Null);
        assert_eq!(
            leaf(json!({"type": "string", "default": "d"}), Some(json!("given"))).value(),
            &json!("given")
        );
    }

    #[test]
    fn initial_state_is_unvalidated_and_clean() {
        let h = leaf(json!({"type": "string"}), Some(json!("x")));
        assert!(!h.is_valid());
        assert!(!h.is_dirty());
        assert!(h.errors().is_empty());
    }

    #[test]
    fn null_and_undefined_assignment_differ() {
        let mut h = leaf(json!({"type": "string", "default": "some default"}), Some(json!("x")));
        h.set_value(Some(Value::Null));
        assert_eq!(h.value(), &Value::Null);
        h.set_value(None);
        assert_eq!(h.value(), &json!("some default"));
    }

    #[test]
    fn dirty_tracks_baseline() {
        let mut h = leaf(json!({"type": "integer"}), Some(json!(1)));
        h.set_value(Some(json!(2)));
        assert!(h.is_dirty());
        h.set_value(Some(json!(1)));
        assert!(!h.is_dirty());
    }

    #[test]
    fn validate_records_and_clears_errors() {
        let mut h = leaf(json!({"type": "string", "minLength": 3}), Some(json!("ab")));
        assert!(!h.validate().unwrap());
        assert!(!h.is_valid());
        assert_eq!(h.errors().len(), 1);

        h.set_value(Some(json!("abc")));
        // Assignment alone does not revalidate.
        assert_eq!(h.errors().len(), 1);
        assert!(h.validate().unwrap());
        assert!(h.is_valid());
        assert!(h.errors().is_empty());
    }

    #[test]
    fn unexpected_schema_error_propagates() {
        let s = JsonSchema::from_value(json!({"type": "string"}))
            .unwrap()
            .refine("lookup", |_, _| {
                Err(SchemaError::Rule {
                    rule: "lookup".into(),
                    reason: "backend unavailable".into(),
                })
            })
            .into_ref();
        let mut h = LeafHandler::new(s, &HandlerOptions::default().with_value(Some(json!("x"))));
        let err = h.validate().unwrap_err();
        assert!(matches!(err, HandlerError::Schema(SchemaError::Rule { .. })));
        assert!(!h.is_valid());
        assert!(h.errors().is_empty());
    }

    #[test]
    fn reset_restores_initial_and_clears_state() {
        let mut h = leaf(json!({"type": "string", "minLength": 3}), Some(json!("ab")));
        h.validate().unwrap();
        h.set_value(Some(json!("changed")));
        h.reset(None);
        assert_eq!(h.value(), &json!("ab"));
        assert!(!h.is_valid());
        assert!(!h.is_dirty());
        assert!(h.errors().is_empty());

        h.reset(Some(json!("new baseline")));
        assert_eq!(h.value(), &json!("new baseline"));
        assert!(!h.is_dirty());
    }

    #[test]
    fn equal_assignment_emits_nothing() {
        let mut h = leaf(json!({"type": "string"}), Some(json!("a")));
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let _sub = h.subscribe(move |_| c.set(c.get() + 1));
        h.set_value(Some(json!("a")));
        assert_eq!(count.get(), 0);
        h.set_value(Some(json!("b")));
        assert_eq!(count.get(), 1);
    }
}
