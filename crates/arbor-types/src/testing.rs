//! Proptest strategies for trees, shared by the arbor crates' tests.
//!
//! Enabled by the `testing` feature.

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

use crate::value::{Mapping, Value};

/// Arbitrary NaN-free trees. Keys come from a tiny alphabet so that two
/// independently generated trees overlap often.
pub fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-z ]{0,6}".prop_map(Value::Text),
        vec(any::<u8>(), 0..4).prop_map(Value::Bytes),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Value::Seq),
            btree_map("[a-c]", inner, 0..4).prop_map(Value::Map),
        ]
    })
}

/// Arbitrary root mappings over the same alphabet as [`arb_value`].
pub fn arb_mapping() -> impl Strategy<Value = Mapping> {
    btree_map("[a-c]", arb_value(), 0..4)
}
