//! # valstate-core — Foundational Types for valstate
//!
//! The leaf of the valstate crate DAG. Defines the vocabulary shared by the
//! schema facade (`valstate-schema`) and the handler tree
//! (`valstate-handler`).
//!
//! ## Contents
//!
//! 1. **Field addressing** (`path.rs`). `FieldKey` names one child of a
//!    composite (an object field or an array/tuple index); `FieldPath` is a
//!    sequence of keys from a root handler down to a descendant.
//!
//! 2. **Change notification** (`notify.rs`). Every handler owns a
//!    `Notifier`. Listeners are called synchronously after a mutation and
//!    events bubble from child to parent with the child's key prepended.
//!
//! 3. **Value helpers** (`value.rs`). JSON shape names and the
//!    undefined/default/null fallback chain.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `valstate-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

#![forbid(unsafe_code)]

pub mod notify;
pub mod path;
pub mod value;

pub use notify::{ChangeEvent, ChangeKind, HoldGuard, Notifier, Subscription};
pub use path::{FieldKey, FieldPath, PathError};
pub use value::{json_type_name, resolve_or_null};
