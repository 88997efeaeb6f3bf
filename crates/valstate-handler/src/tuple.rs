//! # Tuple Handler
//!
//! Fixed-arity positional slots, one child per `prefixItems` entry. Slot
//! handlers are created once and never replaced: every operation, structural
//! or not, only changes slot values.
//!
//! Assignment is partial from the front: the given elements are assigned to
//! the leading slots, trailing slots keep their values, and elements beyond
//! the arity are dropped.

use std::cmp::Ordering;
use std::ops::RangeBounds;
use std::rc::Rc;

use serde_json::Value;

use valstate_core::{ChangeEvent, ChangeKind, FieldKey, FieldPath, Notifier, Subscription};
use valstate_schema::{SchemaFields, SchemaKind, SchemaRef, ValidateOptions};

use crate::array::{clamp_range, copy_within_clamped};
use crate::dispatch::{check_shape, create, expect_array};
use crate::error::{capture, HandlerError};
use crate::errors::{Errors, ErrorsShape};
use crate::handler::Handler;
use crate::options::HandlerOptions;

/// Handler for a tuple schema.
#[derive(Debug)]
pub struct TupleHandler {
    schema: SchemaRef,
    options: Rc<ValidateOptions>,
    initial: Vec<Value>,
    slots: Vec<Handler>,
    root_errors: Vec<String>,
    root_valid: bool,
    notifier: Notifier,
}

impl TupleHandler {
    /// Build one child per slot, seeded from the option value, else the
    /// schema default. Slots without a seed use their own default.
    pub fn new(schema: SchemaRef, options: &HandlerOptions) -> Result<Self, HandlerError> {
        let SchemaFields::Tuple(slot_schemas) = schema.fields() else {
            return Err(HandlerError::FieldsMismatch {
                path: FieldPath::root(),
                kind: schema.kind(),
            });
        };
        let initial = match expect_array(SchemaKind::Tuple, options.value.clone())? {
            Some(items) => items,
            None => expect_array(SchemaKind::Tuple, schema.default_value())?.unwrap_or_default(),
        };
        warn_extra(slot_schemas.len(), initial.len());

        let notifier = Notifier::new();
        let mut slots = Vec::with_capacity(slot_schemas.len());
        for (index, slot_schema) in slot_schemas.into_iter().enumerate() {
            let slot = create(slot_schema, &options.with_value(initial.get(index).cloned()))
                .map_err(|e| e.within(index))?;
            slot.notifier().attach(&notifier, FieldKey::Index(index));
            slots.push(slot);
        }

        Ok(Self {
            schema,
            options: Rc::clone(&options.validate),
            initial,
            slots,
            root_errors: Vec::new(),
            root_valid: false,
            notifier,
        })
    }

    /// Number of slots. Fixed by the schema.
    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    /// Snapshot of every slot's value.
    pub fn value(&self) -> Value {
        Value::Array(self.values())
    }

    fn values(&self) -> Vec<Value> {
        self.slots.iter().map(Handler::value).collect()
    }

    /// Assign the leading slots from `partial`; later slots are untouched.
    ///
    /// `None` and `null` assign the schema's default tuple, or resolve
    /// every slot to its own default when the schema has none.
    pub fn set_value(&mut self, partial: Option<Value>) -> Result<(), HandlerError> {
        if let Some(items) = expect_array(SchemaKind::Tuple, partial)? {
            warn_extra(self.arity(), items.len());
            return self.assign(items.into_iter().map(Some).collect());
        }
        let defaults = expect_array(SchemaKind::Tuple, self.schema.default_value())?
            .unwrap_or_default();
        self.assign_all(defaults)
    }

    /// Assign slots in order, one per item. Stops at the arity. On a shape
    /// error no slot is assigned.
    fn assign(&mut self, items: Vec<Option<Value>>) -> Result<(), HandlerError> {
        self.check_slots(items.iter().map(Option::as_ref).enumerate())?;
        let hold = self.notifier.hold();
        for (index, (slot, value)) in self.slots.iter_mut().zip(items).enumerate() {
            slot.set_value(value).map_err(|e| e.within(index))?;
        }
        if hold.release() {
            self.notifier.emit(ChangeKind::Value);
        }
        Ok(())
    }

    fn check_slots<'a>(
        &self,
        items: impl IntoIterator<Item = (usize, Option<&'a Value>)>,
    ) -> Result<(), HandlerError> {
        let SchemaFields::Tuple(slot_schemas) = self.schema.fields() else {
            return Ok(());
        };
        for (index, value) in items {
            if let Some(schema) = slot_schemas.get(index) {
                check_shape(schema, value).map_err(|e| e.within(index))?;
            }
        }
        Ok(())
    }

    /// Assign every slot; slots past the end of `values` resolve to their
    /// default.
    fn assign_all(&mut self, values: Vec<Value>) -> Result<(), HandlerError> {
        let arity = self.arity();
        let mut values = values.into_iter();
        let items: Vec<Option<Value>> = (0..arity).map(|_| values.next()).collect();
        self.assign(items)
    }

    fn with_values<R>(&mut self, edit: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, HandlerError> {
        let mut values = self.values();
        let out = edit(&mut values);
        self.assign_all(values)?;
        Ok(out)
    }

    /// Tuples cannot grow. Returns the arity without touching any slot.
    pub fn push(&mut self, _value: Value) -> usize {
        self.arity()
    }

    /// Return the last slot's value and clear that slot.
    pub fn pop(&mut self) -> Result<Option<Value>, HandlerError> {
        self.with_values(Vec::pop)
    }

    /// Return the first slot's value and shift the rest left. The last slot
    /// is cleared.
    pub fn shift(&mut self) -> Result<Option<Value>, HandlerError> {
        self.with_values(|v| (!v.is_empty()).then(|| v.remove(0)))
    }

    /// Shift values right and assign `values` to the leading slots. Values
    /// pushed past the arity are dropped. Returns the arity.
    pub fn unshift(
        &mut self,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<usize, HandlerError> {
        let arity = self.arity();
        self.with_values(|v| {
            v.splice(0..0, values);
            arity
        })
    }

    /// Splice over the slot values. Slots left past the end are cleared and
    /// values past the arity dropped. Returns the removed values.
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

    pub fn sort_by(
        &mut self,
        compare: impl FnMut(&Value, &Value) -> Ordering,
    ) -> Result<(), HandlerError> {
        self.with_values(|v| v.sort_by(compare))
    }

    pub fn fill(&mut self, value: Value, range: impl RangeBounds<usize>) -> Result<(), HandlerError> {
        self.with_values(|v| {
            let range = clamp_range(&range, v.len());
            v[range].fill(value);
        })
    }

    pub fn copy_within(
        &mut self,
        src: impl RangeBounds<usize>,
        dest: usize,
    ) -> Result<(), HandlerError> {
        self.with_values(|v| copy_within_clamped(v, &src, dest))
    }

    /// Clear every slot at index `len` or above. The arity is unchanged and
    /// returned.
    pub fn set_length(&mut self, len: usize) -> Result<usize, HandlerError> {
        self.check_slots((len..self.arity()).map(|index| (index, None)))?;
        let hold = self.notifier.hold();
        for (index, slot) in self.slots.iter_mut().enumerate().skip(len) {
            slot.set_value(None).map_err(|e| e.within(index))?;
        }
        if hold.release() {
            self.notifier.emit(ChangeKind::Value);
        }
        Ok(self.arity())
    }

    /// Assign one slot.
    pub fn set_index(&mut self, index: usize, value: Option<Value>) -> Result<(), HandlerError> {
        let arity = self.arity();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| HandlerError::out_of_bounds(index, arity))?;
        slot.set_value(value).map_err(|e| e.within(index))
    }

    pub fn get(&self, index: usize) -> Option<&Handler> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Handler> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Handler> {
        self.slots.iter()
    }

    /// `$root` messages, then one entry per slot.
    pub fn errors(&self) -> Errors {
        Errors::composite(
            ErrorsShape::Tuple,
            self.root_errors.clone(),
            self.slots
                .iter()
                .enumerate()
                .map(|(index, slot)| (FieldKey::Index(index), slot.errors()))
                .collect(),
        )
    }

    pub fn is_valid(&self) -> bool {
        self.root_valid && self.slots.iter().all(Handler::is_valid)
    }

    pub fn is_dirty(&self) -> bool {
        self.slots.iter().any(Handler::is_dirty)
    }

    /// Root validation, then slots in ascending index order. `abort_early`
    /// behaves as for objects.
    pub fn validate(&mut self) -> Result<bool, HandlerError> {
        let hold = self.notifier.hold();
        let valid = self.run_validation()?;
        drop(hold);
        self.notifier.emit(ChangeKind::Validation);
        Ok(valid)
    }

    fn run_validation(&mut self) -> Result<bool, HandlerError> {
        let abort_early = self.options.abort_early;
        tracing::trace!(arity = self.slots.len(), abort_early, "validating tuple");

        let result = self.schema.validate_root(&self.value(), &self.options);
        self.root_valid = capture(result, &mut self.root_errors)?;
        if !self.root_valid && abort_early {
            return Ok(false);
        }

        let mut valid = self.root_valid;
        for slot in &mut self.slots {
            let slot_valid = slot.validate()?;
            valid &= slot_valid;
            if !slot_valid && abort_early {
                break;
            }
        }
        Ok(valid)
    }

    /// Reset each slot to `partial`, else its construction seed, else its
    /// own default. Clears `$root`.
    pub fn reset(&mut self, partial: Option<Value>) -> Result<(), HandlerError> {
        let partial = expect_array(SchemaKind::Tuple, partial)?.unwrap_or_default();
        warn_extra(self.arity(), partial.len());
        self.check_slots(partial.iter().map(Some).enumerate())?;
        let hold = self.notifier.hold();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let value = partial.get(index).or_else(|| self.initial.get(index)).cloned();
            slot.reset(value).map_err(|e| e.within(index))?;
        }
        drop(hold);
        self.root_errors.clear();
        self.root_valid = false;
        tracing::debug!(arity = self.slots.len(), "tuple reset");
        self.notifier.emit(ChangeKind::Reset);
        Ok(())
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        self.notifier.subscribe(listener)
    }
}

fn warn_extra(arity: usize, given: usize) {
    if given > arity {
        tracing::warn!(arity, dropped = given - arity, "ignoring elements beyond tuple arity");
    }
}
