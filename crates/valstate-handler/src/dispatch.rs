//! # Dispatcher
//!
//! The single place that maps a [`SchemaKind`] to a handler variant.
//! Composite handlers call [`create`] for every child they own.

use serde_json::{Map, Value};

use valstate_core::FieldPath;
use valstate_schema::{SchemaFields, SchemaKind, SchemaRef};

use crate::array::ArrayHandler;
use crate::error::HandlerError;
use crate::handler::Handler;
use crate::leaf::LeafHandler;
use crate::object::ObjectHandler;
use crate::options::HandlerOptions;
use crate::tuple::TupleHandler;

/// Build the handler tree for `schema`.
///
/// # Errors
///
/// Returns [`HandlerError::ShapeMismatch`] if the initial value (or a
/// schema default) contradicts the schema's kind anywhere in the tree, and
/// [`HandlerError::FieldsMismatch`] if a composite schema exposes no fields
/// of its kind.
pub fn create(schema: SchemaRef, options: &HandlerOptions) -> Result<Handler, HandlerError> {
    let handler = match schema.kind() {
        SchemaKind::Object => Handler::Object(ObjectHandler::new(schema, options)?),
        SchemaKind::Array => Handler::Array(ArrayHandler::new(schema, options)?),
        SchemaKind::Tuple => Handler::Tuple(TupleHandler::new(schema, options)?),
        SchemaKind::Primitive | SchemaKind::Unknown => {
            Handler::Leaf(LeafHandler::new(schema, options))
        }
    };
    Ok(handler)
}

/// Check that assigning `value` to a handler built from `schema` would
/// succeed, without building or touching any handler.
///
/// Follows the assignment rules of each kind: `None` and `null` fall back
/// to the schema default, absent object fields to their own defaults, and a
/// partial tuple only reaches its leading slots. Composite handlers run this
/// before mutating anything so that a shape error leaves them unchanged.
pub(crate) fn check_shape(schema: &SchemaRef, value: Option<&Value>) -> Result<(), HandlerError> {
    let kind = schema.kind();
    if !kind.is_composite() {
        return Ok(());
    }
    let explicit = value.filter(|v| !v.is_null());
    let default = match explicit {
        Some(_) => None,
        None => schema.default_value().filter(|v| !v.is_null()),
    };
    let resolved = explicit.or(default.as_ref());

    match schema.fields() {
        SchemaFields::Object(declared) => {
            let map = match resolved {
                None => None,
                Some(Value::Object(map)) => Some(map),
                Some(other) => return Err(HandlerError::shape(kind, other)),
            };
            for (name, field) in &declared {
                check_shape(field, map.and_then(|m| m.get(name)))
                    .map_err(|e| e.within(name.as_str()))?;
            }
        }
        SchemaFields::Array(element) => {
            let items = match resolved {
                None => &[][..],
                Some(Value::Array(items)) => items.as_slice(),
                Some(other) => return Err(HandlerError::shape(kind, other)),
            };
            for (index, item) in items.iter().enumerate() {
                check_shape(&element, Some(item)).map_err(|e| e.within(index))?;
            }
        }
        SchemaFields::Tuple(slots) => {
            let items = match resolved {
                None => &[][..],
                Some(Value::Array(items)) => items.as_slice(),
                Some(other) => return Err(HandlerError::shape(kind, other)),
            };
            // An explicit partial leaves trailing slots as they are; a
            // fallback resolves every slot.
            let reach = if explicit.is_some() { items.len() } else { slots.len() };
            for (index, slot) in slots.iter().enumerate().take(reach) {
                check_shape(slot, items.get(index)).map_err(|e| e.within(index))?;
            }
        }
        SchemaFields::None => {
            return Err(HandlerError::FieldsMismatch {
                path: FieldPath::root(),
                kind,
            });
        }
    }
    Ok(())
}

/// Unwrap an object value. `None` and `null` mean "not provided".
pub(crate) fn expect_object(value: Option<Value>) -> Result<Option<Map<String, Value>>, HandlerError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(HandlerError::shape(SchemaKind::Object, &other)),
    }
}

/// Unwrap an array value for an array or tuple schema. `None` and `null`
/// mean "not provided".
pub(crate) fn expect_array(
    kind: SchemaKind,
    value: Option<Value>,
) -> Result<Option<Vec<Value>>, HandlerError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(HandlerError::shape(kind, &other)),
    }
}
