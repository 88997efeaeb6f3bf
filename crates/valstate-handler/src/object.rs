//! # Object Handler
//!
//! One child handler per declared field, in declaration order.
//!
//! Assignment is a *partial replace*: fields present in the assigned object
//! take the given value, every other field falls back to its own schema
//! default (or `null`). Previous values are never carried over.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use valstate_core::{ChangeEvent, ChangeKind, FieldKey, FieldPath, Notifier, Subscription};
use valstate_schema::{SchemaFields, SchemaRef, ValidateOptions};

use crate::dispatch::{check_shape, create, expect_object};
use crate::error::{capture, HandlerError};
use crate::errors::{Errors, ErrorsShape};
use crate::handler::Handler;
use crate::options::HandlerOptions;

/// Handler for an object schema.
#[derive(Debug)]
pub struct ObjectHandler {
    schema: SchemaRef,
    options: Rc<ValidateOptions>,
    initial: Map<String, Value>,
    fields: IndexMap<String, Handler>,
    root_errors: Vec<String>,
    root_valid: bool,
    notifier: Notifier,
}

impl ObjectHandler {
    /// Build the handler and one child per declared field.
    ///
    /// The initial value is the option value, else the schema default,
    /// else `{}`. Each child is seeded with its slice of it; a missing slice
    /// lets the child fall back to its own default.
    pub fn new(schema: SchemaRef, options: &HandlerOptions) -> Result<Self, HandlerError> {
        let SchemaFields::Object(declared) = schema.fields() else {
            return Err(HandlerError::FieldsMismatch {
                path: FieldPath::root(),
                kind: schema.kind(),
            });
        };
        let initial = match expect_object(options.value.clone())? {
            Some(map) => map,
            None => expect_object(schema.default_value())?.unwrap_or_default(),
        };

        let notifier = Notifier::new();
        let mut fields = IndexMap::with_capacity(declared.len());
        for (name, field_schema) in declared {
            let child = create(field_schema, &options.with_value(initial.get(&name).cloned()))
                .map_err(|e| e.within(name.as_str()))?;
            child.notifier().attach(&notifier, FieldKey::Name(name.clone()));
            fields.insert(name, child);
        }

        Ok(Self {
            schema,
            options: Rc::clone(&options.validate),
            initial,
            fields,
            root_errors: Vec::new(),
            root_valid: false,
            notifier,
        })
    }

    /// Snapshot with every declared field, in declaration order.
    pub fn value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(name, child)| (name.clone(), child.value()))
                .collect(),
        )
    }

    /// Assign a partial object. Absent fields resolve to their defaults.
    ///
    /// `None` and `null` assign the schema's default object, or an empty
    /// partial when there is none. Emits one `Value` event if any field
    /// changed. On a shape error no field is assigned.
    pub fn set_value(&mut self, partial: Option<Value>) -> Result<(), HandlerError> {
        let partial = match expect_object(partial)? {
            Some(map) => map,
            None => expect_object(self.schema.default_value())?.unwrap_or_default(),
        };
        self.check_fields(&partial, false)?;
        let hold = self.notifier.hold();
        for (name, child) in &mut self.fields {
            child
                .set_value(partial.get(name).cloned())
                .map_err(|e| e.within(name.as_str()))?;
        }
        if hold.release() {
            self.notifier.emit(ChangeKind::Value);
        }
        Ok(())
    }

    /// Shape-check every field's share of `partial` before any is assigned.
    /// With `present_only`, fields absent from `partial` are skipped.
    fn check_fields(
        &self,
        partial: &Map<String, Value>,
        present_only: bool,
    ) -> Result<(), HandlerError> {
        let SchemaFields::Object(declared) = self.schema.fields() else {
            return Ok(());
        };
        for (name, schema) in &declared {
            let value = partial.get(name);
            if present_only && value.is_none() {
                continue;
            }
            check_shape(schema, value).map_err(|e| e.within(name.as_str()))?;
        }
        Ok(())
    }

    /// Assign one field, leaving the others untouched.
    pub fn set_field(&mut self, name: &str, value: Option<Value>) -> Result<(), HandlerError> {
        let child = self
            .fields
            .get_mut(name)
            .ok_or_else(|| HandlerError::UnknownPath {
                path: FieldPath::root().child(name),
            })?;
        child.set_value(value).map_err(|e| e.within(name))
    }

    /// Child handler of `name`.
    pub fn field(&self, name: &str) -> Option<&Handler> {
        self.fields.get(name)
    }

    /// Mutable child handler of `name`.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Handler> {
        self.fields.get_mut(name)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Handler)> {
        self.fields.iter()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true for an object schema without properties.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Root messages under `$root`, then one entry per field.
    pub fn errors(&self) -> Errors {
        Errors::composite(
            ErrorsShape::Object,
            self.root_errors.clone(),
            self.fields
                .iter()
                .map(|(name, child)| (FieldKey::Name(name.clone()), child.errors()))
                .collect(),
        )
    }

    /// Root validity and the validity of every field.
    pub fn is_valid(&self) -> bool {
        self.root_valid && self.fields.values().all(Handler::is_valid)
    }

    pub fn is_dirty(&self) -> bool {
        self.fields.values().any(Handler::is_dirty)
    }

    /// Root validation, then each field in declaration order.
    ///
    /// With `abort_early`, a root failure returns `false` without touching
    /// any field, and the first failing field stops the walk. Fields not
    /// reached keep their previous state.
    pub fn validate(&mut self) -> Result<bool, HandlerError> {
        let hold = self.notifier.hold();
        let valid = self.run_validation()?;
        drop(hold);
        self.notifier.emit(ChangeKind::Validation);
        Ok(valid)
    }

    fn run_validation(&mut self) -> Result<bool, HandlerError> {
        let abort_early = self.options.abort_early;
        tracing::trace!(fields = self.fields.len(), abort_early, "validating object");

        let result = self.schema.validate_root(&self.value(), &self.options);
        self.root_valid = capture(result, &mut self.root_errors)?;
        if !self.root_valid && abort_early {
            return Ok(false);
        }

        let mut valid = self.root_valid;
        for child in self.fields.values_mut() {
            let child_valid = child.validate()?;
            valid &= child_valid;
            if !child_valid && abort_early {
                break;
            }
        }
        Ok(valid)
    }

    /// Reset every field to `partial` merged over the construction value.
    ///
    /// A field present in `partial` resets to that value, otherwise to its
    /// construction slice, otherwise to its own default. Clears `$root`.
    pub fn reset(&mut self, partial: Option<Value>) -> Result<(), HandlerError> {
        let partial = expect_object(partial)?.unwrap_or_default();
        self.check_fields(&partial, true)?;
        let hold = self.notifier.hold();
        for (name, child) in &mut self.fields {
            let value = partial.get(name).or_else(|| self.initial.get(name)).cloned();
            child.reset(value).map_err(|e| e.within(name.as_str()))?;
        }
        drop(hold);
        self.root_errors.clear();
        self.root_valid = false;
        tracing::debug!(fields = self.fields.len(), "object reset");
        self.notifier.emit(ChangeKind::Reset);
        Ok(())
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Register a listener for changes to this object or any field.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }
}
