//! Property tests for array reconciliation and reset.

use proptest::prelude::*;
use serde_json::{json, Value};
use valstate_core::Notifier;
use valstate_handler::{use_validation, ValidationOptions, ValidationState};
use valstate_schema::JsonSchema;

fn string_array(initial: &[String]) -> ValidationState {
    let schema = JsonSchema::from_value(json!({
        "type": "array",
        "items": {"type": "string"}
    }))
    .unwrap()
    .into_ref();
    use_validation(ValidationOptions::new(schema).value(json!(initial))).unwrap()
}

fn ids(state: &ValidationState) -> Vec<Notifier> {
    state
        .handler()
        .as_array()
        .unwrap()
        .iter()
        .map(|child| child.notifier().clone())
        .collect()
}

fn small_strings() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-d]", 0..8)
}

proptest! {
    /// After any reassignment the snapshot equals the assigned array.
    #[test]
    fn reconciled_value_matches_assignment(
        initial in small_strings(),
        next in small_strings(),
    ) {
        let mut state = string_array(&initial);
        state.set_value(Some(json!(next))).unwrap();
        prop_assert_eq!(state.value(), json!(next));
    }

    /// Every surviving child is reused: the number of reused handlers equals
    /// the size of the multiset intersection of old and new values.
    #[test]
    fn reconciliation_reuses_maximal_matching(
        initial in small_strings(),
        next in small_strings(),
    ) {
        let mut state = string_array(&initial);
        let before = ids(&state);
        state.set_value(Some(json!(next))).unwrap();
        let after = ids(&state);

        let reused = after
            .iter()
            .filter(|a| before.iter().any(|b| b.ptr_eq(a)))
            .count();
        let mut pool = initial.clone();
        let mut expected = 0;
        for value in &next {
            if let Some(i) = pool.iter().position(|p| p == value) {
                pool.remove(i);
                expected += 1;
            }
        }
        prop_assert_eq!(reused, expected);
    }

    /// A reused child still holds the value it had before.
    #[test]
    fn reused_children_keep_their_values(
        initial in small_strings(),
        next in small_strings(),
    ) {
        let mut state = string_array(&initial);
        let before: Vec<(Notifier, Value)> = state
            .handler()
            .as_array()
            .unwrap()
            .iter()
            .map(|c| (c.notifier().clone(), c.value()))
            .collect();
        state.set_value(Some(json!(next))).unwrap();
        for child in state.handler().as_array().unwrap().iter() {
            if let Some((_, old)) = before.iter().find(|(id, _)| id.ptr_eq(child.notifier())) {
                prop_assert_eq!(&child.value(), old);
            }
        }
    }

    /// `reset(v)` always leaves the value at `v`, unvalidated and clean.
    #[test]
    fn reset_round_trip(
        initial in small_strings(),
        edits in small_strings(),
        target in small_strings(),
    ) {
        let mut state = string_array(&initial);
        state.set_value(Some(json!(edits))).unwrap();
        state.validate().unwrap();
        state.reset(Some(json!(target))).unwrap();
        prop_assert_eq!(state.value(), json!(target));
        prop_assert!(!state.is_valid());
        prop_assert!(!state.is_dirty());
    }

    /// Dirtiness after an assignment is exactly "value differs from the
    /// construction value".
    #[test]
    fn dirty_matches_value_comparison(
        initial in small_strings(),
        next in small_strings(),
    ) {
        let mut state = string_array(&initial);
        state.set_value(Some(json!(next))).unwrap();
        prop_assert_eq!(state.is_dirty(), initial != next);
    }
}
