//! # Handler Tree
//!
//! [`Handler`] is the closed set of handler variants. Every operation that
//! does not depend on the variant is routed through here, so callers can
//! treat a tree node uniformly and reach for the concrete handler only for
//! kind-specific operations (array splicing, tuple `set_length`).

use serde_json::Value;

use valstate_core::{ChangeEvent, FieldKey, FieldPath, Notifier, Subscription};
use valstate_schema::SchemaKind;

use crate::array::ArrayHandler;
use crate::error::HandlerError;
use crate::errors::Errors;
use crate::leaf::LeafHandler;
use crate::object::ObjectHandler;
use crate::tuple::TupleHandler;

/// One node of the handler tree.
#[derive(Debug)]
pub enum Handler {
    /// Primitive or unknown schema.
    Leaf(LeafHandler),
    /// Object schema with named fields.
    Object(ObjectHandler),
    /// Array schema with one element schema.
    Array(ArrayHandler),
    /// Tuple schema with fixed positional slots.
    Tuple(TupleHandler),
}

impl Handler {
    /// Kind of the schema this handler was built from.
    pub fn kind(&self) -> SchemaKind {
        match self {
            Self::Leaf(h) => h.schema().kind(),
            Self::Object(_) => SchemaKind::Object,
            Self::Array(_) => SchemaKind::Array,
            Self::Tuple(_) => SchemaKind::Tuple,
        }
    }

    /// Current value. Composites build a snapshot from their children.
    pub fn value(&self) -> Value {
        match self {
            Self::Leaf(h) => h.value().clone(),
            Self::Object(h) => h.value(),
            Self::Array(h) => h.value(),
            Self::Tuple(h) => h.value(),
        }
    }

    pub(crate) fn leaf_value(&self) -> Option<&Value> {
        match self {
            Self::Leaf(h) => Some(h.value()),
            _ => None,
        }
    }

    /// Assign a value. `None` is "undefined": the handler falls back to its
    /// schema default.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::ShapeMismatch`] if the value contradicts the
    /// schema kind of this handler or of a descendant.
    pub fn set_value(&mut self, value: Option<Value>) -> Result<(), HandlerError> {
        match self {
            Self::Leaf(h) => {
                h.set_value(value);
                Ok(())
            }
            Self::Object(h) => h.set_value(value),
            Self::Array(h) => h.set_value(value),
            Self::Tuple(h) => h.set_value(value),
        }
    }

    /// Error aggregate of this node and its descendants.
    pub fn errors(&self) -> Errors {
        match self {
            Self::Leaf(h) => Errors::leaf(h.errors().to_vec()),
            Self::Object(h) => h.errors(),
            Self::Array(h) => h.errors(),
            Self::Tuple(h) => h.errors(),
        }
    }

    /// Whether the last validation of this subtree passed.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Leaf(h) => h.is_valid(),
            Self::Object(h) => h.is_valid(),
            Self::Array(h) => h.is_valid(),
            Self::Tuple(h) => h.is_valid(),
        }
    }

    /// Whether the value differs from the construction/reset baseline.
    pub fn is_dirty(&self) -> bool {
        match self {
            Self::Leaf(h) => h.is_dirty(),
            Self::Object(h) => h.is_dirty(),
            Self::Array(h) => h.is_dirty(),
            Self::Tuple(h) => h.is_dirty(),
        }
    }

    /// Validate this subtree.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Schema`] for schema failures other than
    /// invalid data.
    pub fn validate(&mut self) -> Result<bool, HandlerError> {
        match self {
            Self::Leaf(h) => h.validate(),
            Self::Object(h) => h.validate(),
            Self::Array(h) => h.validate(),
            Self::Tuple(h) => h.validate(),
        }
    }

    /// Restore the baseline. `None` restores the construction value.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::ShapeMismatch`] if `value` contradicts the
    /// schema kind.
    pub fn reset(&mut self, value: Option<Value>) -> Result<(), HandlerError> {
        match self {
            Self::Leaf(h) => {
                h.reset(value);
                Ok(())
            }
            Self::Object(h) => h.reset(value),
            Self::Array(h) => h.reset(value),
            Self::Tuple(h) => h.reset(value),
        }
    }

    /// The notifier events of this subtree are delivered through.
    pub fn notifier(&self) -> &Notifier {
        match self {
            Self::Leaf(h) => h.notifier(),
            Self::Object(h) => h.notifier(),
            Self::Array(h) => h.notifier(),
            Self::Tuple(h) => h.notifier(),
        }
    }

    /// Register a listener for changes anywhere in this subtree.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        self.notifier().subscribe(listener)
    }

    /// Direct child at `key`. Always `None` for leaves.
    pub fn child(&self, key: &FieldKey) -> Option<&Handler> {
        match self {
            Self::Leaf(_) => None,
            Self::Object(h) => h.field(&key.as_name()),
            Self::Array(h) => key.as_index().and_then(|i| h.get(i)),
            Self::Tuple(h) => key.as_index().and_then(|i| h.get(i)),
        }
    }

    /// Mutable direct child at `key`.
    pub fn child_mut(&mut self, key: &FieldKey) -> Option<&mut Handler> {
        match self {
            Self::Leaf(_) => None,
            Self::Object(h) => h.field_mut(&key.as_name()),
            Self::Array(h) => key.as_index().and_then(|i| h.get_mut(i)),
            Self::Tuple(h) => key.as_index().and_then(|i| h.get_mut(i)),
        }
    }

    /// Children with their keys, in order. `None` for leaves.
    pub fn children(&self) -> Option<Vec<(FieldKey, &Handler)>> {
        match self {
            Self::Leaf(_) => None,
            Self::Object(h) => Some(
                h.fields()
                    .map(|(name, child)| (FieldKey::Name(name.clone()), child))
                    .collect(),
            ),
            Self::Array(h) => Some(
                h.iter()
                    .enumerate()
                    .map(|(i, child)| (FieldKey::Index(i), child))
                    .collect(),
            ),
            Self::Tuple(h) => Some(
                h.iter()
                    .enumerate()
                    .map(|(i, child)| (FieldKey::Index(i), child))
                    .collect(),
            ),
        }
    }

    /// Descendant at `path`. The root path addresses `self`.
    pub fn at(&self, path: &FieldPath) -> Option<&Handler> {
        path.iter().try_fold(self, |node, key| node.child(key))
    }

    /// Mutable descendant at `path`.
    pub fn at_mut(&mut self, path: &FieldPath) -> Option<&mut Handler> {
        let mut node = self;
        for key in path {
            node = node.child_mut(key)?;
        }
        Some(node)
    }

    /// The leaf handler, if this is one.
    pub fn as_leaf(&self) -> Option<&LeafHandler> {
        match self {
            Self::Leaf(h) => Some(h),
            _ => None,
        }
    }

    /// The object handler, if this is one.
    pub fn as_object(&self) -> Option<&ObjectHandler> {
        match self {
            Self::Object(h) => Some(h),
            _ => None,
        }
    }

    /// The array handler, if this is one.
    pub fn as_array(&self) -> Option<&ArrayHandler> {
        match self {
            Self::Array(h) => Some(h),
            _ => None,
        }
    }

    /// The tuple handler, if this is one.
    pub fn as_tuple(&self) -> Option<&TupleHandler> {
        match self {
            Self::Tuple(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafHandler> {
        match self {
            Self::Leaf(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectHandler> {
        match self {
            Self::Object(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayHandler> {
        match self {
            Self::Array(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_tuple_mut(&mut self) -> Option<&mut TupleHandler> {
        match self {
            Self::Tuple(h) => Some(h),
            _ => None,
        }
    }
}
