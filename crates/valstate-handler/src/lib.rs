//! # valstate-handler — Validation-Handler Composition Engine
//!
//! Builds a tree of *handlers* mirroring a schema: one [`ObjectHandler`]
//! per object node, one [`ArrayHandler`] per array node, one
//! [`TupleHandler`] per tuple node, and one [`LeafHandler`] per primitive
//! or unknown node. Every handler exposes the same state:
//!
//! - `value` — for composites, a snapshot derived from the children.
//! - `errors` — an [`Errors`] aggregate over the node and its descendants.
//! - `is_valid` — set only by `validate()`, cleared by `reset()`.
//! - `is_dirty` — the value differs from the construction/reset baseline.
//!
//! ## Entry Point
//!
//! [`use_validation`] takes [`ValidationOptions`] (schema, initial value,
//! `abort_early`, context) and returns a [`ValidationState`], the facade
//! over the root handler with dotted-path addressing.
//!
//! ## Notifications
//!
//! Every handler owns a `valstate_core::Notifier`. Mutations notify
//! listeners synchronously and bubble to the root. Composite operations
//! that touch several children emit one event of their own. Assigning a
//! value equal to the current one emits nothing.
//!
//! ## Validation Order
//!
//! Objects and tuples run root validation first, then their fields in
//! declaration/index order. With `abort_early`, a root failure skips field
//! validation entirely and the first failing field stops the walk.
//!
//! ## Crate Policy
//!
//! - Single-threaded: handler trees use `Rc` and are not `Send`.
//! - Validation failures are state, never `Err`. Unexpected schema errors
//!   always propagate as [`HandlerError::Schema`].

#![forbid(unsafe_code)]

pub mod array;
pub mod dispatch;
pub mod error;
pub mod errors;
pub mod handler;
pub mod leaf;
pub mod object;
pub mod options;
pub mod state;
pub mod tuple;

pub use array::ArrayHandler;
pub use dispatch::create;
pub use error::HandlerError;
pub use errors::{Errors, ErrorsIter, ErrorsShape, ROOT_KEY};
pub use handler::Handler;
pub use leaf::LeafHandler;
pub use object::ObjectHandler;
pub use options::HandlerOptions;
pub use state::{use_validation, ValidationOptions, ValidationState};
pub use tuple::TupleHandler;
