//! Overlay: merge a patch tree over a base tree.
//!
//! Rule, applied to each key of the patch:
//! - both sides hold a mapping: recurse;
//! - otherwise the patch value replaces the base value (or is inserted).
//!
//! Sequences are never merged element-wise. Keys that exist only in the base
//! are left alone.

use std::collections::btree_map::Entry;

use arbor_types::{Mapping, Value};
use tracing::{debug, trace};

use crate::copy::deep_copy;

/// Counters collected while merging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Keys present only in the patch.
    pub inserted: usize,
    /// Keys whose base value was overwritten by the patch value.
    pub replaced: usize,
    /// Keys where both sides were mappings and the merge recursed.
    pub merged: usize,
}

impl MergeStats {
    /// Total number of patch keys visited.
    pub fn total(&self) -> usize {
        self.inserted + self.replaced + self.merged
    }
}

/// Merge `patch` into `target` in place, consuming the patch.
pub fn merge_into(target: &mut Mapping, patch: Mapping) -> MergeStats {
    let mut stats = MergeStats::default();
    merge_level(target, patch, &mut stats);
    stats
}

fn merge_level(target: &mut Mapping, patch: Mapping, stats: &mut MergeStats) {
    for (key, incoming) in patch {
        match target.entry(key) {
            Entry::Vacant(slot) => {
                stats.inserted += 1;
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => match incoming {
                Value::Map(sub) => match slot.get_mut() {
                    Value::Map(base) => {
                        stats.merged += 1;
                        merge_level(base, sub, stats);
                    }
                    existing => {
                        trace!(replaced = %existing.kind(), "mapping replaces non-mapping");
                        stats.replaced += 1;
                        *existing = Value::Map(sub);
                    }
                },
                other => {
                    trace!(key = %slot.key(), kind = %other.kind(), "patch value replaces base");
                    stats.replaced += 1;
                    slot.insert(other);
                }
            },
        }
    }
}

/// Merge `patch` over `base` and return the result as a new tree.
///
/// Both inputs are deep-copied first, so the result shares no structure
/// with either of them.
///
/// # Examples
///
/// ```
/// use arbor_merge::overlay;
/// use arbor_types::{Mapping, Value};
///
/// let mut base = Mapping::new();
/// base.insert("keep".into(), Value::Int(1));
/// base.insert("list".into(), Value::Seq(vec![Value::Int(1), Value::Int(2)]));
///
/// let mut patch = Mapping::new();
/// patch.insert("list".into(), Value::Seq(vec![Value::Int(9)]));
///
/// let merged = overlay(&base, &patch);
/// assert_eq!(merged["keep"], Value::Int(1));
/// assert_eq!(merged["list"], Value::Seq(vec![Value::Int(9)]));
/// ```
pub fn overlay(base: &Mapping, patch: &Mapping) -> Mapping {
    let mut merged = deep_copy(base);
    let stats = merge_into(&mut merged, deep_copy(patch));
    debug!(
        inserted = stats.inserted,
        replaced = stats.replaced,
        merged = stats.merged,
        "overlay complete"
    );
    merged
}

#[cfg(test)]
mod tests {
    use arbor_types::testing::arb_mapping;
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn tree(json: serde_json::Value) -> Mapping {
        match arbor_types::to_value(&json).unwrap() {
            Value::Map(map) => map,
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    /// Check the overlay definition key by key.
    fn assert_overlaid(base: &Mapping, patch: &Mapping, result: &Mapping) {
        for (key, value) in result {
            match (base.get(key), patch.get(key)) {
                (Some(Value::Map(b)), Some(Value::Map(p))) => match value {
                    Value::Map(r) => assert_overlaid(b, p, r),
                    other => panic!("expected merged mapping at {key}, got {other:?}"),
                },
                (_, Some(p)) => assert_eq!(value, p, "patch wins at {key}"),
                (Some(b), None) => assert_eq!(value, b, "base kept at {key}"),
                (None, None) => panic!("key {key} came from nowhere"),
            }
        }
        for key in base.keys().chain(patch.keys()) {
            assert!(result.contains_key(key), "key {key} dropped");
        }
    }

    // -----------------------------------------------------------------------
    // Merge rule
    // -----------------------------------------------------------------------

    #[test]
    fn nested_overlay_scenario() {
        let base = tree(json!({
            "first": {"second": {
                "third": "abc",
                "third-b": {"a": "howdy", "b": 123, "c": 10.5},
            }}
        }));
        let patch = tree(json!({
            "first": {
                "second-two": "def",
                "second": {"third": {"fourth": ["hello", "world"]}},
            }
        }));

        let merged = overlay(&base, &patch);
        let first = merged["first"].as_map().unwrap();
        let second = first["second"].as_map().unwrap();

        let third = second["third"].as_map().unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(
            third["fourth"],
            Value::Seq(vec![Value::from("hello"), Value::from("world")])
        );

        let third_b = second["third-b"].as_map().unwrap();
        assert_eq!(third_b["a"], Value::from("howdy"));
        assert_eq!(third_b["b"], Value::Int(123));
        assert_eq!(first["second-two"], Value::from("def"));
    }

    #[test]
    fn sequences_replace_wholesale() {
        let base = tree(json!({"list": [1, 2, 3]}));
        let patch = tree(json!({"list": [9]}));
        let merged = overlay(&base, &patch);
        assert_eq!(merged["list"], Value::Seq(vec![Value::Int(9)]));
    }

    #[test]
    fn scalar_in_patch_replaces_base_mapping() {
        let base = tree(json!({"cfg": {"a": 1}}));
        let patch = tree(json!({"cfg": false}));
        assert_eq!(overlay(&base, &patch)["cfg"], Value::Bool(false));
    }

    #[test]
    fn null_in_patch_still_replaces() {
        let base = tree(json!({"cfg": 1}));
        let patch = tree(json!({"cfg": null}));
        assert!(overlay(&base, &patch)["cfg"].is_null());
    }

    #[test]
    fn empty_patch_is_copy_of_base() {
        let base = tree(json!({"a": {"b": [1, {"c": 2}]}}));
        assert_eq!(overlay(&base, &Mapping::new()), base);
    }

    #[test]
    fn inputs_are_untouched() {
        let base = tree(json!({"a": {"x": 1}}));
        let patch = tree(json!({"a": {"y": 2}}));
        let merged = overlay(&base, &patch);
        assert_eq!(base, tree(json!({"a": {"x": 1}})));
        assert_eq!(patch, tree(json!({"a": {"y": 2}})));
        assert_eq!(merged, tree(json!({"a": {"x": 1, "y": 2}})));
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    #[test]
    fn stats_count_each_outcome() {
        let mut target = tree(json!({"m": {"k": 1}, "s": 1, "l": [1]}));
        let patch = tree(json!({
            "m": {"k": 2, "n": 3},
            "s": {"x": 1},
            "l": [2],
            "new": 0,
        }));
        let stats = merge_into(&mut target, patch);
        assert_eq!(
            stats,
            MergeStats {
                inserted: 2,
                replaced: 3,
                merged: 1,
            }
        );
        assert_eq!(stats.total(), 6);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn overlay_follows_definition(base in arb_mapping(), patch in arb_mapping()) {
            let merged = overlay(&base, &patch);
            assert_overlaid(&base, &patch, &merged);
        }

        #[test]
        fn overlay_with_self_is_identity(base in arb_mapping()) {
            prop_assert_eq!(overlay(&base, &base), base);
        }

        #[test]
        fn overlay_onto_empty_is_patch(patch in arb_mapping()) {
            prop_assert_eq!(overlay(&Mapping::new(), &patch), patch);
        }
    }
}
