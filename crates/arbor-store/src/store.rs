use std::fmt;

use arbor_types::{Mapping, Value, ValueKind};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::{TreeRead, TreeWrite};

/// An in-memory tree rooted at a mapping.
///
/// The store exclusively owns its tree. Copies made with [`Clone`],
/// [`deep_copy`](Store::deep_copy), or [`overlay`](Store::overlay) share
/// nothing with the original; a [`StoreView`](crate::StoreView) is the
/// only way to reach into a store's data without copying it.
///
/// A store is not synchronized. Wrap it in a lock to share it across
/// threads.
#[derive(Clone)]
pub struct Store {
    /// Always `Value::Map`.
    root: Value,
    config: StoreConfig,
}

impl Store {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store with `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self::from_parts(Mapping::new(), config)
    }

    pub(crate) fn from_parts(root: Mapping, config: StoreConfig) -> Self {
        Self {
            root: Value::Map(root),
            config,
        }
    }

    /// Take ownership of `mapping` as the root. No copy is made.
    pub fn from_mapping(mapping: Mapping) -> Self {
        Self::from_parts(mapping, StoreConfig::default())
    }

    /// Build a store from a value whose top level is a mapping. `Null` is
    /// treated as an empty mapping.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        Self::from_value_with_config(value, StoreConfig::default())
    }

    fn from_value_with_config(value: Value, config: StoreConfig) -> StoreResult<Self> {
        match value {
            Value::Map(map) => Ok(Self::from_parts(map, config)),
            Value::Null => Ok(Self::with_config(config)),
            other => Err(StoreError::Shape {
                path: "<root>".to_string(),
                expected: ValueKind::Map,
                found: other.kind().to_string(),
            }),
        }
    }

    /// Verify arbitrary external data and build a store from it.
    ///
    /// The input must serialize as a mapping (or as null, which gives an
    /// empty store). If any node is outside the whitelist no store is
    /// produced.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use arbor_store::{path, Store, TreeRead};
    ///
    /// let mut raw = HashMap::new();
    /// raw.insert("name", "arbor");
    /// let store = Store::from_serializable(&raw).unwrap();
    /// assert_eq!(store.get_str(&path!["name"]), "arbor");
    ///
    /// let mut bad = HashMap::new();
    /// bad.insert(100, "x");
    /// assert!(Store::from_serializable(&bad).is_err());
    /// ```
    pub fn from_serializable<T: Serialize + ?Sized>(input: &T) -> StoreResult<Self> {
        Self::from_serializable_with_config(input, StoreConfig::default())
    }

    /// [`from_serializable`](Store::from_serializable) with an explicit
    /// configuration, which also governs later writes.
    pub fn from_serializable_with_config<T: Serialize + ?Sized>(
        input: &T,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        let value = config.verifier().verify(input).map_err(|e| {
            debug!(error = %e, "rejected store input");
            StoreError::from(e)
        })?;
        Self::from_value_with_config(value, config)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.as_mapping().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_mapping().is_empty()
    }

    /// Give up the store and return its root mapping.
    pub fn into_mapping(self) -> Mapping {
        match self.root {
            Value::Map(map) => map,
            _ => Mapping::new(),
        }
    }

    /// An independent copy of this store.
    pub fn deep_copy(&self) -> Store {
        Self::from_parts(
            arbor_merge::deep_copy(self.as_mapping()),
            self.config.clone(),
        )
    }

    /// A new store holding `patch` merged over `self`.
    ///
    /// Mappings present on both sides merge recursively; any other value in
    /// `patch` replaces what `self` has at that key. Neither input is
    /// modified, and the result shares nothing with them. The result keeps
    /// this store's configuration and is not re-verified.
    pub fn overlay(&self, patch: &impl TreeRead) -> Store {
        let merged = arbor_merge::overlay(self.as_mapping(), patch.as_mapping());
        Self::from_parts(merged, self.config.clone())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeRead for Store {
    fn root(&self) -> &Value {
        &self.root
    }

    fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl TreeWrite for Store {
    fn parts_mut(&mut self) -> (&mut Value, &StoreConfig) {
        (&mut self.root, &self.config)
    }
}

/// Stores compare by content; configuration is ignored.
impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("root", self.as_mapping())
            .field("config", &self.config)
            .finish()
    }
}

impl Serialize for Store {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Store {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Store::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use arbor_types::{path, IntegerOverflow, Path, TypeError};
    use serde_json::json;

    use super::*;

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn new_store_is_empty() {
        let s = Store::new();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
        assert_eq!(s, Store::default());
    }

    #[test]
    fn from_serializable_good_mapping() {
        let s = Store::from_serializable(&json!({
            "hello": "world",
            "super": {"awesome": 10, "happy": null},
        }))
        .unwrap();
        assert_eq!(s.get_str(&path!["hello"]), "world");
        assert_eq!(s.get_int(&path!["super", "awesome"]), 10);
        assert!(s.exists(&path!["super", "happy"]));
        assert!(s.get(&path!["super", "happy"]).unwrap().is_null());
    }

    #[test]
    fn from_serializable_null_is_empty() {
        let s = Store::from_serializable(&json!(null)).unwrap();
        assert!(s.is_empty());
        let s = Store::from_serializable(&None::<Mapping>).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn from_serializable_rejects_non_mapping_root() {
        let err = Store::from_serializable(&json!([1, 2])).unwrap_err();
        assert_eq!(
            err,
            StoreError::Shape {
                path: "<root>".into(),
                expected: ValueKind::Map,
                found: "sequence".into(),
            }
        );
    }

    #[test]
    fn from_serializable_rejects_integer_keys() {
        let mut inner = std::collections::BTreeMap::new();
        inner.insert(100, 10);
        inner.insert(200, 20);
        let mut raw = std::collections::BTreeMap::new();
        raw.insert("super", inner);
        let err = Store::from_serializable(&raw).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Type(TypeError::NonStringKey { .. })
        ));
    }

    #[test]
    fn config_carries_into_writes() {
        let mut s =
            Store::from_serializable_with_config(&json!({}), StoreConfig::lenient()).unwrap();
        s.set(&path!["big"], &u64::MAX).unwrap();
        assert_eq!(s.get_int(&path!["big"]), -1);

        let mut strict = Store::new();
        let err = strict.set(&path!["big"], &u64::MAX).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Type(TypeError::IntegerOverflow { .. })
        ));
        assert!(!strict.exists(&path!["big"]));
        assert_eq!(s.config().integer_overflow, IntegerOverflow::Wrap);
    }

    #[test]
    fn from_mapping_takes_ownership() {
        let mut map = Mapping::new();
        map.insert("k".into(), Value::Int(1));
        let s = Store::from_mapping(map);
        assert_eq!(s.get_int(&path!["k"]), 1);
        assert_eq!(s.into_mapping().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Typed getters
    // -----------------------------------------------------------------------

    fn typed() -> Store {
        Store::from_serializable(&json!({
            "i": 7,
            "f": 1.5,
            "b": true,
            "s": "text",
            "strs": ["a", "b", "c"],
            "ints": [1, 2, 3],
            "floats": [1.5, 2.5, 3.5],
            "mixed": ["a", 1],
            "maps": [{"a": 1, "b": 2}],
            "m": {"k": "v"},
        }))
        .unwrap()
    }

    #[test]
    fn typed_getters_return_values() {
        let s = typed();
        assert_eq!(s.get_int(&path!["i"]), 7);
        assert_eq!(s.get_float(&path!["f"]), 1.5);
        assert!(s.get_bool(&path!["b"]));
        assert_eq!(s.get_str(&path!["s"]), "text");
        assert_eq!(s.get_string(&path!["s"]), "text".to_string());
        assert_eq!(s.get_string_array(&path!["strs"]), vec!["a", "b", "c"]);
        assert_eq!(s.get_int_array(&path!["ints"]), vec![1, 2, 3]);
        assert_eq!(s.get_float_array(&path!["floats"]), vec![1.5, 2.5, 3.5]);
        assert_eq!(s.get_array(&path!["mixed"]).len(), 2);
        assert_eq!(s.get_mapping(&path!["m"]).unwrap()["k"], Value::from("v"));

        let maps = s.get_mapping_array(&path!["maps"]);
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0]["b"], Value::Int(2));
    }

    #[test]
    fn absent_and_mismatched_collapse_to_zero() {
        let s = typed();
        for path in [path!["missing"], path!["s"], path!["m", "k", "deeper"]] {
            assert_eq!(s.get_int(&path), 0);
            assert_eq!(s.get_float(&path), 0.0);
            assert!(!s.get_bool(&path));
            assert!(s.get_int_array(&path).is_empty());
            assert!(s.get_mapping(&path).is_none());
        }
        assert_eq!(s.get_str(&path!["i"]), "");
        // No numeric coercion.
        assert_eq!(s.get_float(&path!["i"]), 0.0);
        assert_eq!(s.get_int(&path!["f"]), 0);
        assert!(s.get_bytes(&path!["s"]).is_empty());
    }

    #[test]
    fn array_getters_are_all_or_nothing() {
        let s = typed();
        assert!(s.get_string_array(&path!["mixed"]).is_empty());
        assert!(s.get_int_array(&path!["mixed"]).is_empty());
        assert!(s.get_float_array(&path!["ints"]).is_empty());
        assert!(s.get_mapping_array(&path!["strs"]).is_empty());
    }

    #[test]
    fn get_value_and_exists() {
        let s = typed();
        assert_eq!(s.get_value(&path!["i"]), Value::Int(7));
        assert_eq!(s.get_value(&path!["nope"]), Value::Null);
        assert!(s.exists(&[]));
        assert!(!s.exists(&path!["nope"]));
        assert_eq!(
            s.get(&[]).and_then(Value::as_map).map(Mapping::len),
            Some(10)
        );
    }

    #[test]
    fn get_as_deserializes() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Entry {
            a: i64,
            b: i64,
        }
        let s = typed();
        let entries: Vec<Entry> = s.get_as(&path!["maps"]).unwrap();
        assert_eq!(entries, vec![Entry { a: 1, b: 2 }]);
        assert_eq!(s.get_as::<Vec<u8>>(&path!["ints"]), Some(vec![1, 2, 3]));
        assert_eq!(s.get_as::<String>(&path!["i"]), None);
        assert_eq!(s.get_as::<i64>(&path!["missing"]), None);
    }

    #[test]
    fn get_as_keeps_non_finite_floats_and_bytes() {
        let mut s = Store::new();
        s.set_value(&path!["nan"], Value::Float(f64::NAN)).unwrap();
        s.set_value(&path!["inf"], Value::Float(f64::INFINITY))
            .unwrap();
        s.set_value(&path!["blob"], Value::Bytes(vec![0, 1, 255]))
            .unwrap();

        assert!(s.get_as::<f64>(&path!["nan"]).is_some_and(f64::is_nan));
        assert_eq!(s.get_as::<f64>(&path!["inf"]), Some(f64::INFINITY));
        assert_eq!(
            s.get_as::<Option<f64>>(&path!["inf"]),
            Some(Some(f64::INFINITY))
        );
        assert!(matches!(
            s.get_as::<Option<f64>>(&path!["nan"]),
            Some(Some(x)) if x.is_nan()
        ));

        assert_eq!(s.get_as::<Vec<u8>>(&path!["blob"]), Some(vec![0, 1, 255]));
        assert_eq!(
            s.get_as::<Value>(&path!["blob"]),
            Some(Value::Bytes(vec![0, 1, 255]))
        );
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    #[test]
    fn set_typed_arrays() {
        let mut s = Store::new();
        s.set(&path!["strs"], &["a", "b", "c"]).unwrap();
        s.set(&path!["ints"], &vec![1, 2, 3]).unwrap();
        s.set(&path!["floats"], &vec![1.5, 2.5, 3.5]).unwrap();
        assert_eq!(s.get_string_array(&path!["strs"]), vec!["a", "b", "c"]);
        assert_eq!(s.get_int_array(&path!["ints"]), vec![1, 2, 3]);
        assert_eq!(s.get_float_array(&path!["floats"]), vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn set_mapping_array() {
        let mut s = Store::new();
        s.set(&path!["arr"], &json!([{"a": 1, "b": 2}])).unwrap();
        let maps = s.get_mapping_array(&path!["arr"]);
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0]["a"], Value::Int(1));
    }

    #[test]
    fn set_without_path_fails() {
        let mut s = Store::new();
        assert_eq!(s.set(&[], "hello"), Err(StoreError::PathArity));
        assert_eq!(s.set_value(&[], Value::Null), Err(StoreError::PathArity));
        assert!(s.is_empty());
    }

    #[test]
    fn rejected_value_leaves_store_untouched() {
        let mut s = Store::from_serializable(&json!({"a": 1})).unwrap();
        let mut bad = std::collections::HashMap::new();
        bad.insert(1, "x");
        let err = s.set(&path!["a", "b", "c"], &bad).unwrap_err();
        assert!(matches!(err, StoreError::Type(_)));
        assert_eq!(s, Store::from_serializable(&json!({"a": 1})).unwrap());
    }

    #[test]
    fn set_value_checks_depth() {
        let config = StoreConfig {
            max_depth: 1,
            ..StoreConfig::default()
        };
        let mut s = Store::with_config(config);
        s.set_value(&path!["flat"], Value::Seq(vec![Value::Int(1)]))
            .unwrap();
        let nested = Value::Seq(vec![Value::Seq(vec![])]);
        let err = s.set_value(&path!["deep"], nested).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Type(TypeError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn set_bytes_via_value() {
        let mut s = Store::new();
        s.set_value(&path!["blob"], Value::Bytes(vec![0xde, 0xad]))
            .unwrap();
        assert_eq!(s.get_bytes(&path!["blob"]), &[0xde, 0xad]);
    }

    #[test]
    fn remove_returns_value() {
        let mut s = typed();
        assert_eq!(s.remove(&path!["i"]), Some(Value::Int(7)));
        assert!(!s.exists(&path!["i"]));
        assert_eq!(s.remove(&Path::parse("ints[-1]")), Some(Value::Int(3)));
        assert_eq!(s.get_int_array(&path!["ints"]), vec![1, 2]);
    }

    // -----------------------------------------------------------------------
    // Copy, overlay, serde
    // -----------------------------------------------------------------------

    #[test]
    fn deep_copy_is_independent() {
        let s = typed();
        let mut copy = s.deep_copy();
        assert_eq!(copy, s);
        copy.set(&path!["m", "k"], "changed").unwrap();
        assert_eq!(s.get_str(&path!["m", "k"]), "v");
    }

    #[test]
    fn overlay_keeps_inputs() {
        let base = Store::from_serializable(&json!({"a": {"x": 1}, "keep": true})).unwrap();
        let patch = Store::from_serializable(&json!({"a": {"y": 2}})).unwrap();
        let merged = base.overlay(&patch);
        assert_eq!(merged.get_int(&path!["a", "x"]), 1);
        assert_eq!(merged.get_int(&path!["a", "y"]), 2);
        assert!(merged.get_bool(&path!["keep"]));
        assert!(!base.exists(&path!["a", "y"]));
        assert!(!patch.exists(&path!["a", "x"]));
    }

    #[test]
    fn overlay_takes_base_config() {
        let base = Store::with_config(StoreConfig::lenient());
        let merged = base.overlay(&Store::new());
        assert_eq!(merged.config(), &StoreConfig::lenient());
    }

    #[test]
    fn serde_roundtrip_through_json() {
        let s = typed();
        let text = serde_json::to_string(&s).unwrap();
        let back: Store = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
        assert!(serde_json::from_str::<Store>("[1]").is_err());
    }

    #[test]
    fn debug_format() {
        let debug = format!("{:?}", typed());
        assert!(debug.contains("Store"));
        assert!(debug.contains("config"));
    }
}
