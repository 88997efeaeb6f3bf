//! # Schema Contract
//!
//! The sole boundary between the handler tree and a concrete validation
//! library. Handlers hold schema nodes as [`SchemaRef`] and dispatch on
//! [`SchemaKind`] with an exhaustive `match`.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;

/// Shared, read-only reference to a schema node.
pub type SchemaRef = Rc<dyn Schema>;

/// Shape category of a schema node. Fixed for the lifetime of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Keyed structure with a fixed set of named fields.
    Object,
    /// Ordered, dynamically sized list sharing one element schema.
    Array,
    /// Ordered, fixed-arity list with one schema per slot.
    Tuple,
    /// Scalar (or opaque) value validated as a whole.
    Primitive,
    /// Anything; validated as a whole.
    Unknown,
}

impl SchemaKind {
    /// Whether handlers for this kind own child handlers.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object | Self::Array | Self::Tuple)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Tuple => "tuple",
            Self::Primitive => "primitive",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Child schemas of a node, keyed identically to the data.
#[derive(Debug, Clone)]
pub enum SchemaFields {
    /// Leaf node.
    None,
    /// Object fields in declaration order.
    Object(Vec<(String, SchemaRef)>),
    /// Element schema shared by every array element.
    Array(SchemaRef),
    /// Per-slot schemas in index order.
    Tuple(Vec<SchemaRef>),
}

/// Options forwarded to every validation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidateOptions {
    /// Stop at the first failure.
    pub abort_early: bool,
    /// Opaque caller state, passed through to refinement rules.
    pub context: Option<Value>,
}

/// Messages produced by a failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Human-readable messages, in the order they were produced.
    pub errors: Vec<String>,
}

impl ValidationFailure {
    /// A failure with a single message.
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {e}")?;
        }
        Ok(())
    }
}

impl From<Vec<String>> for ValidationFailure {
    fn from(errors: Vec<String>) -> Self {
        Self { errors }
    }
}

/// Error raised by schema construction or validation.
///
/// Only [`SchemaError::Invalid`] is an expected outcome of validation;
/// handlers record it as state. Every other variant propagates.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The value did not conform to the schema.
    #[error("validation failed:\n{0}")]
    Invalid(ValidationFailure),

    /// The schema document could not be loaded or normalized.
    #[error("schema load error for '{source_name}': {reason}")]
    Load {
        /// File name or JSON pointer of the offending schema.
        source_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// A node's validator could not be compiled.
    #[error("validator build error at '{pointer}': {reason}")]
    Build {
        /// JSON pointer of the node within the schema document.
        pointer: String,
        /// Compiler message.
        reason: String,
    },

    /// A refinement rule failed for a reason other than invalid data.
    #[error("refinement '{rule}' failed: {reason}")]
    Rule {
        /// Name the rule was registered under.
        rule: String,
        /// Description of the failure.
        reason: String,
    },

    /// A refinement target path does not exist in the schema tree.
    #[error("no schema node at '{path}'")]
    UnknownPath {
        /// The requested path.
        path: String,
    },

    /// A schema node is shared and can no longer be modified.
    #[error("schema node at '{path}' is shared and cannot be refined")]
    Shared {
        /// The requested path.
        path: String,
    },

    /// IO error reading a schema or document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// A validation failure with a single message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(ValidationFailure::single(message))
    }

    /// Whether this is an expected validation failure.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// The contract every schema node implements.
pub trait Schema: fmt::Debug {
    /// Shape category of this node.
    fn kind(&self) -> SchemaKind;

    /// Child schemas, matching [`Schema::kind`].
    fn fields(&self) -> SchemaFields;

    /// Default value of matching shape, if the schema declares one.
    fn default_value(&self) -> Option<Value>;

    /// Validate `value` against the whole schema, fields included.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Invalid`] when `value` does not conform; any other
    /// variant for unexpected failures.
    fn validate(&self, value: &Value, options: &ValidateOptions) -> Result<(), SchemaError>;

    /// Validate whole-value constraints of a composite without descending
    /// into its fields. Leaf schemas fall back to [`Schema::validate`].
    ///
    /// # Errors
    ///
    /// Same as [`Schema::validate`].
    fn validate_root(&self, value: &Value, options: &ValidateOptions) -> Result<(), SchemaError> {
        self.validate(value, options)
    }
}
