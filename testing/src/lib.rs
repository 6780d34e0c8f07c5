//! # Statekit Testing
//!
//! Testing utilities and helpers for statekit reducers.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then harness for any [`Reducer`](statekit_core::Reducer)
//! - [`assertions`]: Assertion helpers for reductions and state records
//! - [`properties`]: proptest strategies for property keys, values and records
//! - [`init_test_tracing`]: Opt-in log output for tests
//!
//! ## Example
//!
//! ```
//! use statekit_core::property::{create_property_components, PropertyKind};
//! use statekit_core::{json, State};
//! use statekit_testing::ReducerTest;
//!
//! let flag = create_property_components("PREFIX", "flag", PropertyKind::Boolean).unwrap();
//! let toggle = flag.action_creators.boolean().unwrap().toggle();
//!
//! ReducerTest::new(flag.reducer)
//!     .given_state(State::new())
//!     .when_action(toggle)
//!     .then_state(|state| assert_eq!(state.get("flag"), Some(&json!(true))))
//!     .run();
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Install a `tracing` subscriber writing to the test output.
///
/// Honors `RUST_LOG` (default `statekit_core=debug`). Safe to call from every
/// test; only the first call installs the subscriber.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("statekit_core=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::collection::{btree_map, vec};
    use proptest::prelude::*;
    use serde_json::{Map, Value};
    use statekit_core::State;

    /// Identifier-shaped property keys.
    pub fn arb_property_key() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_]{0,8}"
    }

    /// JSON scalars: null, booleans, integers and short strings.
    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::String),
        ]
    }

    /// Arbitrary JSON values, nested up to three levels.
    pub fn arb_value() -> impl Strategy<Value = Value> {
        arb_scalar().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                vec(inner.clone(), 0..4).prop_map(Value::Array),
                btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
            ]
        })
    }

    /// JSON arrays of arbitrary values.
    pub fn arb_array() -> impl Strategy<Value = Vec<Value>> {
        vec(arb_value(), 0..6)
    }

    /// Flat JSON objects of arbitrary values.
    pub fn arb_object() -> impl Strategy<Value = Map<String, Value>> {
        btree_map("[a-z]{1,4}", arb_value(), 0..5)
            .prop_map(|entries| entries.into_iter().collect())
    }

    /// State records with up to five properties.
    pub fn arb_state() -> impl Strategy<Value = State> {
        btree_map(arb_property_key(), arb_value(), 0..6)
            .prop_map(|entries| entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::properties::*;
    use proptest::prelude::*;
    use statekit_core::property::validate_property_key;

    proptest! {
        #[test]
        fn generated_keys_are_valid(key in arb_property_key()) {
            prop_assert!(validate_property_key(&key).is_ok());
        }

        #[test]
        fn generated_states_round_trip_through_json(state in arb_state()) {
            let json = state.to_json();
            prop_assert_eq!(statekit_core::State::from_json(json).ok(), Some(state));
        }
    }

    #[test]
    fn init_test_tracing_is_idempotent() {
        super::init_test_tracing();
        super::init_test_tracing();
    }
}
