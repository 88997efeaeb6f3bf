//! Construction options shared by every handler.

use std::rc::Rc;

use serde_json::Value;
use valstate_schema::ValidateOptions;

/// Options a handler is constructed with.
///
/// `validate` is shared by the whole tree; each child receives its own
/// `value` slice.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    /// Initial value. `None` means "use the schema default".
    pub value: Option<Value>,
    /// Options forwarded to every schema validation call.
    pub validate: Rc<ValidateOptions>,
}

impl HandlerOptions {
    /// Options with the given validation settings and no initial value.
    pub fn new(validate: ValidateOptions) -> Self {
        Self {
            value: None,
            validate: Rc::new(validate),
        }
    }

    /// The same validation settings with a different initial value.
    pub fn with_value(&self, value: Option<Value>) -> Self {
        Self {
            value,
            validate: Rc::clone(&self.validate),
        }
    }
}
