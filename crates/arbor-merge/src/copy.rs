use arbor_types::{Mapping, Value};

/// Clone a mapping and everything below it.
///
/// The copy shares nothing with `src`; mutating one never affects the other.
pub fn deep_copy(src: &Mapping) -> Mapping {
    src.iter()
        .map(|(key, value)| (key.clone(), deep_copy_value(value)))
        .collect()
}

/// Clone a single value. Containers are rebuilt node by node; scalars,
/// byte blobs included, are copied as a unit.
pub fn deep_copy_value(src: &Value) -> Value {
    match src {
        Value::Seq(items) => Value::Seq(items.iter().map(deep_copy_value).collect()),
        Value::Map(map) => Value::Map(deep_copy(map)),
        scalar => scalar.clone(),
    }
}

#[cfg(test)]
mod tests {
    use arbor_types::testing::{arb_mapping, arb_value};
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn sample() -> Mapping {
        let value = arbor_types::to_value(&json!({
            "name": "arbor",
            "list": [1, {"inner": [true, null]}],
            "nested": {"deep": {"x": 1.5}},
        }))
        .unwrap();
        match value {
            Value::Map(map) => map,
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn copy_is_equal() {
        let original = sample();
        assert_eq!(deep_copy(&original), original);
    }

    #[test]
    fn mutating_copy_leaves_original() {
        let original = sample();
        let mut copy = deep_copy(&original);

        copy.get_mut("nested")
            .and_then(Value::as_map_mut)
            .and_then(|m| m.get_mut("deep"))
            .and_then(Value::as_map_mut)
            .unwrap()
            .insert("x".into(), Value::Int(0));
        copy.get_mut("list")
            .and_then(Value::as_seq_mut)
            .unwrap()
            .push(Value::Null);

        assert_eq!(original, sample());
        assert_ne!(copy, original);
    }

    #[test]
    fn bytes_are_copied_whole() {
        let blob = Value::Bytes(vec![1, 2, 3]);
        assert_eq!(deep_copy_value(&blob), blob);
    }

    #[test]
    fn empty_mapping() {
        assert!(deep_copy(&Mapping::new()).is_empty());
    }

    proptest! {
        #[test]
        fn copy_of_any_value_is_equal(value in arb_value()) {
            prop_assert_eq!(deep_copy_value(&value), value);
        }

        #[test]
        fn copy_survives_clearing_original(map in arb_mapping()) {
            let snapshot = map.clone();
            let copy = deep_copy(&map);
            drop(map);
            prop_assert_eq!(copy, snapshot);
        }
    }
}
