//! # Array Handler
//!
//! An ordered, dynamic list of children built from one element schema.
//!
//! ## Reconciliation
//!
//! Assigning a new array never rebuilds the list wholesale:
//!
//! - **Primitive/unknown elements**: each new element takes the first
//!   not-yet-consumed child whose current value is equal, wherever it sits;
//!   only elements without a match get a fresh child. Children left in the
//!   pool are discarded. A child that survives keeps its identity, its
//!   validation state and its listeners, even when it moved.
//! - **Composite elements**: children are reused positionally up to the
//!   overlap and assigned the new element; the length delta is created or
//!   discarded at the end.
//!
//! Every structural operation (`push`, `splice`, `sort_by`, ...) computes
//! the resulting plain array and goes through the same reconciliation.

use std::cmp::Ordering;
use std::ops::{Bound, Range, RangeBounds};

use serde_json::Value;

use valstate_core::{ChangeEvent, ChangeKind, FieldKey, FieldPath, Notifier, Subscription};
use valstate_schema::{SchemaFields, SchemaKind, SchemaRef};

use crate::dispatch::{check_shape, create, expect_array};
use crate::error::HandlerError;
use crate::errors::{Errors, ErrorsShape};
use crate::handler::Handler;
use crate::leaf::LeafHandler;
use crate::options::HandlerOptions;

/// Handler for an array schema.
#[derive(Debug)]
pub struct ArrayHandler {
    schema: SchemaRef,
    element: SchemaRef,
    options: HandlerOptions,
    initial: Option<Value>,
    children: Vec<Handler>,
    baseline: Vec<Value>,
    validated: bool,
    notifier: Notifier,
}

#[derive(Debug, Default)]
struct Reconciled {
    reused: usize,
    created: usize,
    discarded: usize,
    moved: bool,
}

impl Reconciled {
    fn is_structural(&self) -> bool {
        self.created > 0 || self.discarded > 0 || self.moved
    }
}

impl ArrayHandler {
    /// Build the handler with one child per element of the option value,
    /// else of the schema default, else none.
    pub fn new(schema: SchemaRef, options: &HandlerOptions) -> Result<Self, HandlerError> {
        let SchemaFields::Array(element) = schema.fields() else {
            return Err(HandlerError::FieldsMismatch {
                path: FieldPath::root(),
                kind: schema.kind(),
            });
        };
        let initial = options.value.clone();
        let values = first_array([initial.clone(), schema.default_value()])?;

        let mut handler = Self {
            schema,
            element,
            options: options.with_value(None),
            initial,
            children: Vec::new(),
            baseline: Vec::new(),
            validated: false,
            notifier: Notifier::new(),
        };
        handler.children = handler.build(values)?;
        handler.attach_children();
        handler.baseline = handler.values();
        Ok(handler)
    }

    /// The schema every element is built from.
    pub fn element(&self) -> &SchemaRef {
        &self.element
    }

    /// Snapshot of every element's current value.
    pub fn value(&self) -> Value {
        Value::Array(self.values())
    }

    fn values(&self) -> Vec<Value> {
        self.children.iter().map(Handler::value).collect()
    }

    /// Replace the whole array. `None` and `null` assign the schema
    /// default, else `[]`.
    pub fn set_value(&mut self, value: Option<Value>) -> Result<(), HandlerError> {
        let next = first_array([value, self.schema.default_value()])?;
        self.reconcile(next)
    }

    fn reconcile(&mut self, next: Vec<Value>) -> Result<(), HandlerError> {
        let hold = self.notifier.hold();
        let stats = if self.element.kind().is_composite() {
            self.reconcile_positional(next)?
        } else {
            self.reconcile_by_value(next)
        };
        self.attach_children();
        tracing::debug!(
            reused = stats.reused,
            created = stats.created,
            discarded = stats.discarded,
            "array reconciled"
        );
        if hold.release() || stats.is_structural() {
            self.notifier.emit(ChangeKind::Value);
        }
        Ok(())
    }

    fn reconcile_by_value(&mut self, next: Vec<Value>) -> Reconciled {
        let mut stats = Reconciled::default();
        let mut pool: Vec<Option<Handler>> =
            std::mem::take(&mut self.children).into_iter().map(Some).collect();

        let mut children = Vec::with_capacity(next.len());
        for (position, value) in next.into_iter().enumerate() {
            let found = pool
                .iter()
                .position(|slot| slot.as_ref().and_then(Handler::leaf_value) == Some(&value));
            match found.and_then(|origin| pool[origin].take().map(|child| (origin, child))) {
                Some((origin, child)) => {
                    stats.reused += 1;
                    stats.moved |= origin != position;
                    children.push(child);
                }
                None => {
                    stats.created += 1;
                    let options = self.options.with_value(Some(value));
                    children.push(Handler::Leaf(LeafHandler::new(
                        self.element.clone(),
                        &options,
                    )));
                }
            }
        }
        stats.discarded = pool.iter().flatten().count();
        self.children = children;
        stats
    }

    fn reconcile_positional(&mut self, next: Vec<Value>) -> Result<Reconciled, HandlerError> {
        for (index, value) in next.iter().enumerate() {
            check_shape(&self.element, Some(value)).map_err(|e| e.within(index))?;
        }
        let overlap = self.children.len().min(next.len());
        let discarded = self.children.len() - overlap;
        let mut next = next.into_iter();
        let kept: Vec<Value> = next.by_ref().take(overlap).collect();

        let tail: Vec<Value> = next.collect();
        let created = tail.len();
        let mut fresh = Vec::with_capacity(created);
        for (offset, value) in tail.into_iter().enumerate() {
            let child = create(self.element.clone(), &self.options.with_value(Some(value)))
                .map_err(|e| e.within(overlap + offset))?;
            fresh.push(child);
        }

        for (index, (child, value)) in self.children.iter_mut().zip(kept).enumerate() {
            child.set_value(Some(value)).map_err(|e| e.within(index))?;
        }
        self.children.truncate(overlap);
        self.children.extend(fresh);

        Ok(Reconciled {
            reused: overlap,
            created,
            discarded,
            moved: false,
        })
    }

    fn build(&self, values: Vec<Value>) -> Result<Vec<Handler>, HandlerError> {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                create(self.element.clone(), &self.options.with_value(Some(value)))
                    .map_err(|e| e.within(index))
            })
            .collect()
    }

    fn attach_children(&self) {
        for (index, child) in self.children.iter().enumerate() {
            child.notifier().attach(&self.notifier, FieldKey::Index(index));
        }
    }

    /// Run `edit` on a copy of the current values, then reconcile.
    fn with_values<R>(&mut self, edit: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, HandlerError> {
        let mut values = self.values();
        let out = edit(&mut values);
        self.reconcile(values)?;
        Ok(out)
    }

    /// Append an element. Returns the new length.
    pub fn push(&mut self, value: Value) -> Result<usize, HandlerError> {
        self.with_values(|v| {
            v.push(value);
            v.len()
        })
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Result<Option<Value>, HandlerError> {
        self.with_values(Vec::pop)
    }

    /// Remove and return the first element.
    pub fn shift(&mut self) -> Result<Option<Value>, HandlerError> {
        self.with_values(|v| (!v.is_empty()).then(|| v.remove(0)))
    }

    /// Prepend elements, keeping their order. Returns the new length.
    pub fn unshift(
        &mut self,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<usize, HandlerError> {
        self.with_values(|v| {
            v.splice(0..0, values);
            v.len()
        })
    }

    /// Insert an element at `index`, shifting later elements right.
    pub fn insert(&mut self, index: usize, value: Value) -> Result<(), HandlerError> {
        let len = self.len();
        if index > len {
            return Err(HandlerError::out_of_bounds(index, len));
        }
        self.with_values(|v| v.insert(index, value))
    }

    /// Remove and return the element at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Value, HandlerError> {
        let len = self.len();
        if index >= len {
            return Err(HandlerError::out_of_bounds(index, len));
        }
        self.with_values(|v| v.remove(index))
    }

    /// Remove `delete_count` elements from `start` and insert `items` in
    /// their place. Out-of-range arguments are clamped. Returns the removed
    /// elements.
    pub fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>, HandlerError> {
        self.with_values(|v| {
            let start = start.min(v.len());
            let end = start.saturating_add(delete_count).min(v.len());
            v.splice(start..end, items).collect()
        })
    }

    pub fn reverse(&mut self) -> Result<(), HandlerError> {
        self.with_values(|v| v.reverse())
    }

    /// Stable sort by `compare`.
    pub fn sort_by(
        &mut self,
        compare: impl FnMut(&Value, &Value) -> Ordering,
    ) -> Result<(), HandlerError> {
        self.with_values(|v| v.sort_by(compare))
    }

    /// Overwrite the elements in `range` (clamped) with `value`.
    pub fn fill(&mut self, value: Value, range: impl RangeBounds<usize>) -> Result<(), HandlerError> {
        self.with_values(|v| {
            let range = clamp_range(&range, v.len());
            v[range].fill(value);
        })
    }

    /// Copy the elements in `src` (clamped) to `dest`, overwriting. Copies
    /// only as many elements as fit before the end; the length never
    /// changes.
    pub fn copy_within(
        &mut self,
        src: impl RangeBounds<usize>,
        dest: usize,
    ) -> Result<(), HandlerError> {
        self.with_values(|v| copy_within_clamped(v, &src, dest))
    }

    /// Shorten to `len` elements. No effect if already shorter.
    pub fn truncate(&mut self, len: usize) -> Result<(), HandlerError> {
        self.with_values(|v| v.truncate(len))
    }

    /// Assign element `index`. In range the child is assigned directly;
    /// past the end the array grows, filling the gap with `null`.
    pub fn set_index(&mut self, index: usize, value: Option<Value>) -> Result<(), HandlerError> {
        if let Some(child) = self.children.get_mut(index) {
            return child.set_value(value).map_err(|e| e.within(index));
        }
        let value = value
            .or_else(|| self.element.default_value())
            .unwrap_or(Value::Null);
        self.with_values(|v| {
            v.resize(index, Value::Null);
            v.push(value);
        })
    }

    /// Child handler at `index`.
    pub fn get(&self, index: usize) -> Option<&Handler> {
        self.children.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Handler> {
        self.children.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Children in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, Handler> {
        self.children.iter()
    }

    /// One entry per element, keyed by index. Arrays have no `$root`.
    pub fn errors(&self) -> Errors {
        Errors::composite(
            ErrorsShape::Array,
            Vec::new(),
            self.children
                .iter()
                .enumerate()
                .map(|(index, child)| (FieldKey::Index(index), child.errors()))
                .collect(),
        )
    }

    /// Whether the array was validated since the last reset and every
    /// current element is valid.
    pub fn is_valid(&self) -> bool {
        self.validated && self.children.iter().all(Handler::is_valid)
    }

    /// Whether the current values differ from the baseline. Only values
    /// count: an element edited and restored is clean again.
    pub fn is_dirty(&self) -> bool {
        self.children.len() != self.baseline.len()
            || self
                .children
                .iter()
                .zip(&self.baseline)
                .any(|(child, base)| &child.value() != base)
    }

    /// Validate each element in index order. With `abort_early`, the first
    /// failing element stops the walk.
    pub fn validate(&mut self) -> Result<bool, HandlerError> {
        let abort_early = self.options.validate.abort_early;
        tracing::trace!(elements = self.children.len(), abort_early, "validating array");
        let hold = self.notifier.hold();
        let mut valid = true;
        for child in &mut self.children {
            let child_valid = child.validate()?;
            valid &= child_valid;
            if !child_valid && abort_early {
                break;
            }
        }
        drop(hold);
        self.validated = true;
        self.notifier.emit(ChangeKind::Validation);
        Ok(valid)
    }

    /// Rebuild every child from `value`, else the construction value, else
    /// the schema default, else `[]`. No child identity survives a reset.
    pub fn reset(&mut self, value: Option<Value>) -> Result<(), HandlerError> {
        let values = first_array([value, self.initial.clone(), self.schema.default_value()])?;
        self.children = self.build(values)?;
        self.attach_children();
        self.baseline = self.values();
        self.validated = false;
        tracing::debug!(elements = self.children.len(), "array reset");
        self.notifier.emit(ChangeKind::Reset);
        Ok(())
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Register a listener for changes to the list or any element.
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }
}

/// First candidate that holds an array. `null` counts as absent.
fn first_array<const N: usize>(candidates: [Option<Value>; N]) -> Result<Vec<Value>, HandlerError> {
    for candidate in candidates {
        if let Some(items) = expect_array(SchemaKind::Array, candidate)? {
            return Ok(items);
        }
    }
    Ok(Vec::new())
}

/// Resolve `range` against a sequence of `len` elements, clamping both ends.
pub(crate) fn clamp_range(range: &impl RangeBounds<usize>, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e.saturating_add(1),
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    let end = end.min(len);
    start.min(end)..end
}

/// Copy `src` over the elements starting at `dest` without changing length.
pub(crate) fn copy_within_clamped(values: &mut [Value], src: &impl RangeBounds<usize>, dest: usize) {
    let len = values.len();
    if dest >= len {
        return;
    }
    let src = clamp_range(src, len);
    let count = src.len().min(len - dest);
    let chunk: Vec<Value> = values[src.start..src.start + count].to_vec();
    values[dest..dest + count].clone_from_slice(&chunk);
}
