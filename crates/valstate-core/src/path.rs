//! # Field Addressing
//!
//! A [`FieldKey`] names one child of a composite handler: a named object
//! field or a positional array/tuple element. A [`FieldPath`] is the chain
//! of keys leading from some handler down to one of its descendants.
//!
//! ## Textual Form
//!
//! Paths are written with `.` separators: `address.lines.0`. Segments made
//! only of ASCII digits parse as [`FieldKey::Index`]; everything else is a
//! [`FieldKey::Name`]. An object field literally named `"0"` is still
//! reachable because object lookups accept an index key and fall back to
//! its decimal rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when parsing a textual field path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path segment was empty (e.g. `a..b` or a trailing `.`).
    #[error("empty segment at position {position} in path '{path}'")]
    EmptySegment {
        /// The full path text.
        path: String,
        /// Zero-based index of the empty segment.
        position: usize,
    },
}

/// One step in a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKey {
    /// Positional element of an array or tuple.
    Index(usize),
    /// Named field of an object.
    Name(String),
}

impl FieldKey {
    /// The key as an object field name. Index keys render in decimal.
    pub fn as_name(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Name(name) => std::borrow::Cow::Borrowed(name),
            Self::Index(i) => std::borrow::Cow::Owned(i.to_string()),
        }
    }

    /// The key as a positional index, if it is one or parses as one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Name(name) => name.parse().ok(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for FieldKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A sequence of [`FieldKey`]s from a handler to one of its descendants.
///
/// The empty path addresses the handler itself and displays as `(root)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    keys: Vec<FieldKey>,
}

impl FieldPath {
    /// The empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path. The empty string is the root path.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::EmptySegment`] for paths such as `a..b`.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let keys = text
            .split('.')
            .enumerate()
            .map(|(position, segment)| {
                if segment.is_empty() {
                    return Err(PathError::EmptySegment {
                        path: text.to_string(),
                        position,
                    });
                }
                if segment.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(i) = segment.parse::<usize>() {
                        return Ok(FieldKey::Index(i));
                    }
                }
                Ok(FieldKey::Name(segment.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { keys })
    }

    /// Returns true for the root path.
    pub fn is_root(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of keys in the path.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the path has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The keys of the path, outermost first.
    pub fn keys(&self) -> &[FieldKey] {
        &self.keys
    }

    /// Append a key to the end of the path.
    pub fn push(&mut self, key: impl Into<FieldKey>) {
        self.keys.push(key.into());
    }

    /// Insert a key at the front of the path.
    pub fn prepend(&mut self, key: FieldKey) {
        self.keys.insert(0, key);
    }

    /// A new path extended by one key.
    pub fn child(&self, key: impl Into<FieldKey>) -> Self {
        let mut next = self.clone();
        next.push(key);
        next
    }

    /// Iterate over the keys, outermost first.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldKey> {
        self.keys.iter()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keys.is_empty() {
            return f.write_str("(root)");
        }
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<FieldKey>> for FieldPath {
    fn from(keys: Vec<FieldKey>) -> Self {
        Self { keys }
    }
}

impl<'a> IntoIterator for &'a FieldPath {
    type Item = &'a FieldKey;
    type IntoIter = std::slice::Iter<'a, FieldKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}
