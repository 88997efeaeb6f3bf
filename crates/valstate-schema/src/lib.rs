//! # valstate-schema — Schema Contract & JSON Schema Facade
//!
//! Handlers never talk to a validation library directly. They consume the
//! [`Schema`] trait, a uniform contract of five operations:
//!
//! - [`Schema::kind`] — object, array, tuple, primitive, or unknown.
//! - [`Schema::fields`] — child schemas keyed like the data.
//! - [`Schema::default_value`] — optional default of matching shape.
//! - [`Schema::validate`] — full validation of a value.
//! - [`Schema::validate_root`] — whole-value validation of a composite
//!   without recursing into its fields.
//!
//! A validation failure is reported as [`SchemaError::Invalid`] carrying the
//! human-readable messages. Every other [`SchemaError`] is an unexpected
//! failure that handlers propagate instead of recording.
//!
//! ## JSON Schema Facade (`json`)
//!
//! [`JsonSchema`] implements the contract on top of the `jsonschema` crate
//! (Draft 2020-12). It walks a schema document, resolves local `$ref`s,
//! compiles one validator per node, and supports refinement rules for
//! whole-value constraints that JSON Schema cannot express.
//!
//! ## Crate Policy
//!
//! - Depends only on `valstate-core` internally.
//! - Supporting another validation library means implementing [`Schema`];
//!   nothing in `valstate-handler` changes.

#![forbid(unsafe_code)]

pub mod contract;
pub mod json;
pub mod load;

pub use contract::{
    Schema, SchemaError, SchemaFields, SchemaKind, SchemaRef, ValidateOptions, ValidationFailure,
};
pub use json::{JsonSchema, RefinementFn};
pub use load::{load_document, yaml_to_json_value, YamlConversionError};
