//! # Handler Errors
//!
//! Validation failures never appear here: they are recorded as handler
//! state. `HandlerError` covers configuration mistakes (a value whose shape
//! contradicts the schema, a path that does not exist) and unexpected
//! schema failures that must reach the caller of `validate()`.

use thiserror::Error;

use valstate_core::{FieldKey, FieldPath, PathError};
use valstate_schema::{SchemaError, SchemaKind};

/// Error raised by handler construction, assignment, or validation.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A value's JSON shape contradicts the schema kind at `path`.
    #[error("shape mismatch at '{path}': {expected} schema cannot hold a {found} value")]
    ShapeMismatch {
        /// Location of the handler that rejected the value.
        path: FieldPath,
        /// Kind of the schema at that location.
        expected: SchemaKind,
        /// JSON type of the rejected value.
        found: &'static str,
    },

    /// A schema node's fields do not match its declared kind.
    #[error("schema at '{path}' declares kind {kind} but provides no matching fields")]
    FieldsMismatch {
        /// Location of the offending schema node.
        path: FieldPath,
        /// The declared kind.
        kind: SchemaKind,
    },

    /// No handler exists at `path`.
    #[error("no field at '{path}'")]
    UnknownPath {
        /// The requested path.
        path: FieldPath,
    },

    /// A positional operation referenced an index past the end.
    #[error("index {index} out of bounds at '{path}' (length {len})")]
    IndexOutOfBounds {
        /// Location of the array or tuple handler.
        path: FieldPath,
        /// The requested index.
        index: usize,
        /// Current length or arity.
        len: usize,
    },

    /// A textual path could not be parsed.
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// A schema failed for a reason other than invalid data.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl HandlerError {
    /// Prefix the error's location with the key of the child it came from.
    pub(crate) fn within(mut self, key: impl Into<FieldKey>) -> Self {
        match &mut self {
            Self::ShapeMismatch { path, .. }
            | Self::FieldsMismatch { path, .. }
            | Self::UnknownPath { path }
            | Self::IndexOutOfBounds { path, .. } => path.prepend(key.into()),
            Self::Path(_) | Self::Schema(_) => {}
        }
        self
    }

    pub(crate) fn shape(expected: SchemaKind, found: &serde_json::Value) -> Self {
        Self::ShapeMismatch {
            path: FieldPath::root(),
            expected,
            found: valstate_core::json_type_name(found),
        }
    }

    pub(crate) fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            path: FieldPath::root(),
            index,
            len,
        }
    }
}

/// Record the outcome of a schema call into `errors`.
///
/// `Invalid` becomes state and yields `Ok(false)`; any other schema error is
/// returned untouched, leaving `errors` as it was.
pub(crate) fn capture(
    result: Result<(), SchemaError>,
    errors: &mut Vec<String>,
) -> Result<bool, HandlerError> {
    match result {
        Ok(()) => {
            errors.clear();
            Ok(true)
        }
        Err(SchemaError::Invalid(failure)) => {
            *errors = failure.errors;
            Ok(false)
        }
        Err(other) => Err(other.into()),
    }
}
