//! # Entry Point
//!
//! [`use_validation`] builds the handler tree for a schema and wraps its
//! root in a [`ValidationState`], the facade a host binding talks to.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use valstate_handler::{use_validation, ValidationOptions};
//! use valstate_schema::JsonSchema;
//!
//! let schema = JsonSchema::from_value(json!({
//!     "type": "object",
//!     "properties": {
//!         "email": {"type": "string", "minLength": 3},
//!         "tags": {"type": "array", "items": {"type": "string"}}
//!     }
//! }))?
//! .into_ref();
//!
//! let mut state = use_validation(
//!     ValidationOptions::new(schema).value(json!({"email": "a"})),
//! )?;
//! assert!(!state.validate()?);
//! state.set("email", Some(json!("ops@example.com")))?;
//! state.set("tags.0", Some(json!("urgent")))?;
//! assert!(state.validate()?);
//! assert!(state.is_dirty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde_json::Value;

use valstate_core::{ChangeEvent, FieldKey, FieldPath, Subscription};
use valstate_schema::{SchemaKind, SchemaRef, ValidateOptions};

use crate::dispatch::create;
use crate::error::HandlerError;
use crate::errors::Errors;
use crate::handler::Handler;
use crate::options::HandlerOptions;

/// Options accepted by [`use_validation`].
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Schema of the whole value.
    pub schema: SchemaRef,
    /// Initial value: full for arrays, partial for objects and tuples.
    pub value: Option<Value>,
    /// Stop validation at the first failure.
    pub abort_early: bool,
    /// Opaque state passed to every schema validation call.
    pub context: Option<Value>,
}

impl ValidationOptions {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            value: None,
            abort_early: false,
            context: None,
        }
    }

    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn abort_early(mut self, abort_early: bool) -> Self {
        self.abort_early = abort_early;
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Build the handler tree described by `options`.
///
/// # Errors
///
/// Returns [`HandlerError::ShapeMismatch`] if the initial value contradicts
/// the schema.
pub fn use_validation(options: ValidationOptions) -> Result<ValidationState, HandlerError> {
    ValidationState::new(options)
}

/// Facade over the root handler.
///
/// Paths are dotted (`"address.lines.0"`); numeric segments address array
/// elements and tuple slots, and also match object fields with numeric
/// names.
#[derive(Debug)]
pub struct ValidationState {
    handler: Handler,
}

impl ValidationState {
    pub fn new(options: ValidationOptions) -> Result<Self, HandlerError> {
        let handler_options = HandlerOptions::new(ValidateOptions {
            abort_early: options.abort_early,
            context: options.context,
        })
        .with_value(options.value);
        let handler = create(options.schema, &handler_options)?;
        tracing::debug!(kind = %handler.kind(), "validation state created");
        Ok(Self { handler })
    }

    pub fn kind(&self) -> SchemaKind {
        self.handler.kind()
    }

    pub fn value(&self) -> Value {
        self.handler.value()
    }

    pub fn set_value(&mut self, value: Option<Value>) -> Result<(), HandlerError> {
        self.handler.set_value(value)
    }

    pub fn errors(&self) -> Errors {
        self.handler.errors()
    }

    pub fn is_valid(&self) -> bool {
        self.handler.is_valid()
    }

    pub fn is_dirty(&self) -> bool {
        self.handler.is_dirty()
    }

    pub fn validate(&mut self) -> Result<bool, HandlerError> {
        self.handler.validate()
    }

    pub fn reset(&mut self, value: Option<Value>) -> Result<(), HandlerError> {
        self.handler.reset(value)
    }

    /// The backing root handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut Handler {
        &mut self.handler
    }

    /// Direct children of the root. `None` when the root is a leaf.
    pub fn fields(&self) -> Option<Vec<(FieldKey, &Handler)>> {
        self.handler.children()
    }

    /// Handler at a dotted path.
    pub fn at(&self, path: &str) -> Result<&Handler, HandlerError> {
        let path = FieldPath::parse(path)?;
        self.handler
            .at(&path)
            .ok_or(HandlerError::UnknownPath { path })
    }

    pub fn at_mut(&mut self, path: &str) -> Result<&mut Handler, HandlerError> {
        let path = FieldPath::parse(path)?;
        match self.handler.at_mut(&path) {
            Some(handler) => Ok(handler),
            None => Err(HandlerError::UnknownPath { path }),
        }
    }

    /// Value at a dotted path.
    pub fn get(&self, path: &str) -> Result<Value, HandlerError> {
        self.at(path).map(Handler::value)
    }

    /// Assign the value at a dotted path.
    ///
    /// An index one or more past the end of an array grows it, like
    /// [`ArrayHandler::set_index`](crate::ArrayHandler::set_index).
    pub fn set(&mut self, path: &str, value: Option<Value>) -> Result<(), HandlerError> {
        let full = FieldPath::parse(path)?;
        let Some((last, parent_keys)) = full.keys().split_last() else {
            return self.handler.set_value(value);
        };
        let unknown = || HandlerError::UnknownPath { path: full.clone() };
        let parent_path = FieldPath::from(parent_keys.to_vec());

        let parent = self.handler.at_mut(&parent_path).ok_or_else(unknown)?;
        let result = match parent {
            Handler::Array(array) => array.set_index(last.as_index().ok_or_else(unknown)?, value),
            Handler::Tuple(tuple) => tuple.set_index(last.as_index().ok_or_else(unknown)?, value),
            Handler::Object(object) => object.set_field(&last.as_name(), value),
            Handler::Leaf(_) => return Err(unknown()),
        };
        result.map_err(|e| match e {
            HandlerError::UnknownPath { .. } => unknown(),
            other => prefix(other, &parent_path),
        })
    }

    /// Register a listener for changes anywhere in the tree.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        self.handler.subscribe(listener)
    }
}

fn prefix(error: HandlerError, parent: &FieldPath) -> HandlerError {
    parent
        .keys()
        .iter()
        .rev()
        .fold(error, |error, key| error.within(key.clone()))
}
