//! # Error Aggregate
//!
//! [`Errors`] merges a node's own messages with the aggregates of its
//! children into one view:
//!
//! - [`Errors::messages`] — the `$root` messages of an object or tuple, or
//!   the validation messages of a leaf. Always empty for arrays.
//! - [`Errors::field`] — the aggregate of one child.
//! - [`Errors::iter`] — every message in the subtree, depth-first, own
//!   messages first, then children in declaration/index order.
//!
//! Iteration is implemented natively by [`ErrorsIter`]; no message is
//! yielded twice and none is skipped.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use valstate_core::{FieldKey, FieldPath};

/// Key under which root messages appear in the JSON rendering.
pub const ROOT_KEY: &str = "$root";

/// Which handler produced an aggregate; decides the JSON rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorsShape {
    /// Rendered as an array of messages.
    Leaf,
    /// Rendered as `{"$root": [...], "<field>": ...}`.
    Object,
    /// Rendered as an array of element aggregates.
    Array,
    /// Rendered as `{"$root": [...], "0": ..., "1": ...}`.
    Tuple,
}

/// Validation errors of a handler and its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Errors {
    shape: ErrorsShape,
    messages: Vec<String>,
    entries: Vec<(FieldKey, Errors)>,
}

impl Errors {
    pub(crate) fn leaf(messages: Vec<String>) -> Self {
        Self {
            shape: ErrorsShape::Leaf,
            messages,
            entries: Vec::new(),
        }
    }

    pub(crate) fn composite(
        shape: ErrorsShape,
        root: Vec<String>,
        entries: Vec<(FieldKey, Errors)>,
    ) -> Self {
        Self {
            shape,
            messages: root,
            entries,
        }
    }

    /// The shape of the handler that produced this aggregate.
    pub fn shape(&self) -> ErrorsShape {
        self.shape
    }

    /// Messages produced at this node: `$root` for objects and tuples, the
    /// validation messages for leaves.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// The aggregate of the child at `key`.
    pub fn field(&self, key: impl Into<FieldKey>) -> Option<&Errors> {
        let key = key.into();
        self.entries
            .iter()
            .find(|(k, _)| k == &key || k.as_name() == key.as_name())
            .map(|(_, e)| e)
    }

    /// The aggregate of the descendant at `path`.
    pub fn at(&self, path: &FieldPath) -> Option<&Errors> {
        path.iter()
            .try_fold(self, |errors, key| errors.field(key.clone()))
    }

    /// Child aggregates in declaration/index order.
    pub fn entries(&self) -> impl Iterator<Item = (&FieldKey, &Errors)> {
        self.entries.iter().map(|(k, e)| (k, e))
    }

    /// Every message in the subtree, depth-first.
    pub fn iter(&self) -> ErrorsIter<'_> {
        ErrorsIter {
            stack: vec![Frame {
                errors: self,
                message: 0,
                entry: 0,
            }],
        }
    }

    /// Total number of messages in the subtree.
    pub fn len(&self) -> usize {
        self.messages.len() + self.entries.iter().map(|(_, e)| e.len()).sum::<usize>()
    }

    /// Returns true if the subtree holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.entries.iter().all(|(_, e)| e.is_empty())
    }

    /// Every message paired with the path of the node that produced it,
    /// in iteration order.
    pub fn flatten(&self) -> Vec<(FieldPath, String)> {
        let mut out = Vec::new();
        self.flatten_into(&FieldPath::root(), &mut out);
        out
    }

    fn flatten_into(&self, path: &FieldPath, out: &mut Vec<(FieldPath, String)>) {
        out.extend(self.messages.iter().map(|m| (path.clone(), m.clone())));
        for (key, child) in &self.entries {
            child.flatten_into(&path.child(key.clone()), out);
        }
    }

    /// JSON rendering, keyed like the data.
    pub fn to_value(&self) -> Value {
        let messages = || Value::Array(self.messages.iter().cloned().map(Value::String).collect());
        match self.shape {
            ErrorsShape::Leaf => messages(),
            ErrorsShape::Array => {
                Value::Array(self.entries.iter().map(|(_, e)| e.to_value()).collect())
            }
            ErrorsShape::Object | ErrorsShape::Tuple => {
                let mut map = Map::new();
                map.insert(ROOT_KEY.to_string(), messages());
                for (key, child) in &self.entries {
                    map.insert(key.to_string(), child.to_value());
                }
                Value::Object(map)
            }
        }
    }
}

impl Serialize for Errors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a str;
    type IntoIter = ErrorsIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

struct Frame<'a> {
    errors: &'a Errors,
    message: usize,
    entry: usize,
}

/// Depth-first iterator over every message of an [`Errors`] subtree.
pub struct ErrorsIter<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> Iterator for ErrorsIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            let errors: &'a Errors = top.errors;
            if let Some(message) = errors.messages.get(top.message) {
                top.message += 1;
                return Some(message.as_str());
            }
            if let Some((_, child)) = errors.entries.get(top.entry) {
                top.entry += 1;
                self.stack.push(Frame {
                    errors: child,
                    message: 0,
                    entry: 0,
                });
                continue;
            }
            self.stack.pop();
        }
    }
}
