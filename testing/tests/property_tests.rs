//! Property-based tests for generated reducers

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use proptest::prelude::*;
use statekit_core::action::Action;
use statekit_core::bulk::{create_bulk_components, BulkConfig};
use statekit_core::property::{create_property_components, PropertyKind};
use statekit_core::reducer::Reducer;
use statekit_core::undo::{create_undo_components, UndoConfig};
use statekit_core::{json, ReplaceArgs, State, Value};
use statekit_testing::assertions::assert_handled;
use statekit_testing::properties::{
    arb_array, arb_object, arb_property_key, arb_state, arb_value,
};

proptest! {
    #[test]
    fn set_then_delete_leaves_property_absent(
        state in arb_state(),
        key in arb_property_key(),
        value in arb_value(),
    ) {
        let components = create_property_components("PREFIX", &key, PropertyKind::Generic).unwrap();
        let creators = &components.action_creators;

        let set = assert_handled(components.reducer.reduce(&state, &creators.set(value.clone())));
        prop_assert_eq!(set.get(&key), Some(&value));

        let deleted = assert_handled(components.reducer.reduce(&set, &creators.delete()));
        prop_assert!(!deleted.contains_key(&key));
        prop_assert_eq!(deleted.len(), state.without(&key).len());
    }

    #[test]
    fn toggle_twice_restores_truthiness(value in arb_value()) {
        let components =
            create_property_components("PREFIX", "flag", PropertyKind::Boolean).unwrap();
        let toggle = components.action_creators.boolean().unwrap().toggle();
        let state = State::new().with("flag", value);

        let once = assert_handled(components.reducer.reduce(&state, &toggle));
        let twice = assert_handled(components.reducer.reduce(&once, &toggle));

        prop_assert_eq!(
            statekit_core::state::is_truthy(twice.get("flag")),
            statekit_core::state::is_truthy(state.get("flag"))
        );
        prop_assert_ne!(once.get("flag"), twice.get("flag"));
    }

    #[test]
    fn push_never_changes_the_previous_array(items in arb_array(), value in arb_value()) {
        let components =
            create_property_components("PREFIX", "items", PropertyKind::Array).unwrap();
        let push = components.action_creators.array().unwrap().push(value.clone());
        let before = State::new().with("items", Value::Array(items.clone()));

        let after = assert_handled(components.reducer.reduce(&before, &push));

        prop_assert_eq!(before.get("items"), Some(&Value::Array(items.clone())));
        let mut expected = items;
        expected.push(value);
        prop_assert_eq!(after.get("items"), Some(&Value::Array(expected)));
    }

    #[test]
    fn merge_overlays_partial_object(base in arb_object(), partial in arb_object()) {
        let components =
            create_property_components("PREFIX", "prefs", PropertyKind::Object).unwrap();
        let merge = components.action_creators.object().unwrap().merge(partial.clone());
        let before = State::new().with("prefs", Value::Object(base.clone()));

        let after = assert_handled(components.reducer.reduce(&before, &merge));

        prop_assert_eq!(before.get("prefs"), Some(&Value::Object(base.clone())));
        let mut expected = base;
        expected.extend(partial);
        prop_assert_eq!(after.get("prefs"), Some(&Value::Object(expected)));
    }

    #[test]
    fn replace_without_matching_field_is_a_no_op(
        ids in proptest::collection::vec(0i64..100, 0..6),
    ) {
        let components = create_property_components("PREFIX", "rows", PropertyKind::Array).unwrap();
        let rows: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
        let before = State::new().with("rows", Value::Array(rows));

        let replace = components
            .action_creators
            .array()
            .unwrap()
            .replace(ReplaceArgs::property_to_check_equality(
                "id",
                json!({"id": 1000, "name": "x"}),
            ));
        let after = assert_handled(components.reducer.reduce(&before, &replace));

        prop_assert_eq!(after, before);
    }

    #[test]
    fn foreign_actions_are_declined(state in arb_state(), suffix in "[A-Z]{1,8}") {
        let components = create_bulk_components(&BulkConfig::new("PREFIX"), &state).unwrap();
        let action = Action::other(format!("FOREIGN_{suffix}"));

        prop_assert!(components.reducer.reduce(&state, &action).is_declined());
        let total = components.reducer.into_combined(State::new());
        prop_assert_eq!(total.apply(Some(&state), &action), state);
    }

    #[test]
    fn undo_stack_discipline(values in proptest::collection::vec(0i64..1000, 1..12)) {
        let defaults = State::new().with("n", json!(-1));
        let bulk = create_bulk_components(&BulkConfig::new("PREFIX"), &defaults).unwrap();
        let set = |v: i64| bulk.action_creators.property("n").unwrap().set(v);
        let undo = create_undo_components(&UndoConfig::new("PREFIX", ["n"]), bulk.reducer).unwrap();

        // A snapshot is pushed only when it differs from the last one
        let mut expected: Vec<Value> = Vec::new();
        let mut state = defaults.clone();
        for value in &values {
            let previous = state.get("n").cloned().unwrap();
            if expected.last() != Some(&previous) {
                expected.push(previous);
            }
            state = assert_handled(undo.reducer.reduce(&state, &set(*value)));
        }
        let past: Vec<Value> = undo
            .reducer
            .past(&state)
            .iter()
            .map(|snapshot| snapshot.get("n").cloned().unwrap())
            .collect();
        prop_assert_eq!(&past, &expected);

        let distinct = expected.len();
        for _ in 0..distinct {
            state = assert_handled(undo.reducer.reduce(&state, &undo.action_creators.undo()));
        }
        prop_assert_eq!(state.get("n"), defaults.get("n"));
        prop_assert!(undo.reducer.reduce(&state, &undo.action_creators.undo()).is_declined());
    }

    #[test]
    fn limit_evicts_oldest_first(limit in 0usize..5, extra in 1usize..4) {
        let defaults = State::new().with("n", json!(0));
        let bulk = create_bulk_components(&BulkConfig::new("PREFIX"), &defaults).unwrap();
        let creators = bulk.action_creators;
        let undo = create_undo_components(
            &UndoConfig::new("PREFIX", ["n"]).with_limit(limit),
            bulk.reducer,
        )
        .unwrap();

        // Every transition sets a new value, so every snapshot is distinct
        let transitions = limit + extra;
        let mut state = defaults;
        for value in 1..=transitions {
            let set = creators.property("n").unwrap().set(json!(value));
            state = assert_handled(undo.reducer.reduce(&state, &set));
        }

        let past: Vec<Value> = undo
            .reducer
            .past(&state)
            .iter()
            .map(|snapshot| snapshot.get("n").cloned().unwrap())
            .collect();
        let expected: Vec<Value> = (transitions - limit..transitions).map(|n| json!(n)).collect();
        prop_assert_eq!(past, expected);
    }
}
