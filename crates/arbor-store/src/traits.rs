use arbor_types::{from_value, Mapping, Segment, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::mutate::{self, location};
use crate::navigate::{resolve, resolve_mut};
use crate::view::StoreView;

static EMPTY: Mapping = Mapping::new();

/// Read access to a tree.
///
/// Every typed getter returns the type's zero value (`0`, `0.0`, `false`,
/// `""`, an empty slice or vector, `None` for mappings) when the path is
/// absent **and** when the value found there has another type. The two
/// cases cannot be told apart through these getters; use [`get`] or
/// [`exists`] for that.
///
/// No numeric coercion happens: `get_float` on an integer is `0.0`.
///
/// [`get`]: TreeRead::get
/// [`exists`]: TreeRead::exists
pub trait TreeRead {
    /// The root node. Always a mapping.
    fn root(&self) -> &Value;

    /// Configuration used to verify writes.
    fn config(&self) -> &StoreConfig;

    /// The root as a mapping.
    fn as_mapping(&self) -> &Mapping {
        self.root().as_map().unwrap_or(&EMPTY)
    }

    /// The value at `path`, or `None` if it does not exist. The empty path
    /// is the root.
    fn get(&self, path: &[Segment]) -> Option<&Value> {
        resolve(self.root(), path)
    }

    fn exists(&self, path: &[Segment]) -> bool {
        self.get(path).is_some()
    }

    /// Owned copy of the value at `path`; `Null` when absent.
    fn get_value(&self, path: &[Segment]) -> Value {
        self.get(path).cloned().unwrap_or_default()
    }

    fn get_int(&self, path: &[Segment]) -> i64 {
        self.get(path).and_then(Value::as_i64).unwrap_or_default()
    }

    fn get_float(&self, path: &[Segment]) -> f64 {
        self.get(path).and_then(Value::as_f64).unwrap_or_default()
    }

    fn get_bool(&self, path: &[Segment]) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or_default()
    }

    fn get_str(&self, path: &[Segment]) -> &str {
        self.get(path).and_then(Value::as_str).unwrap_or_default()
    }

    fn get_string(&self, path: &[Segment]) -> String {
        self.get_str(path).to_owned()
    }

    fn get_bytes(&self, path: &[Segment]) -> &[u8] {
        self.get(path).and_then(Value::as_bytes).unwrap_or_default()
    }

    fn get_array(&self, path: &[Segment]) -> &[Value] {
        self.get(path).and_then(Value::as_seq).unwrap_or_default()
    }

    fn get_mapping(&self, path: &[Segment]) -> Option<&Mapping> {
        self.get(path).and_then(Value::as_map)
    }

    /// All elements as text, or empty if any element is not text.
    fn get_string_array(&self, path: &[Segment]) -> Vec<String> {
        collect_all(self.get_array(path), |v| v.as_str().map(str::to_owned))
    }

    /// All elements as integers, or empty if any element is not an integer.
    fn get_int_array(&self, path: &[Segment]) -> Vec<i64> {
        collect_all(self.get_array(path), Value::as_i64)
    }

    /// All elements as floats, or empty if any element is not a float.
    fn get_float_array(&self, path: &[Segment]) -> Vec<f64> {
        collect_all(self.get_array(path), Value::as_f64)
    }

    /// All elements as mappings, or empty if any element is not a mapping.
    fn get_mapping_array(&self, path: &[Segment]) -> Vec<&Mapping> {
        collect_all(self.get_array(path), Value::as_map)
    }

    /// Deserialize the value at `path` into `T`, reading the tree in place.
    /// Absent or not convertible is `None`.
    fn get_as<T: DeserializeOwned>(&self, path: &[Segment]) -> Option<T>
    where
        Self: Sized,
    {
        match from_value(self.get(path)?) {
            Ok(typed) => Some(typed),
            Err(e) => {
                trace!(path = %location(path), error = %e, "get_as conversion failed");
                None
            }
        }
    }
}

fn collect_all<'a, T>(items: &'a [Value], pick: impl Fn(&'a Value) -> Option<T>) -> Vec<T> {
    items.iter().map(pick).collect::<Option<Vec<T>>>().unwrap_or_default()
}

/// Write access to a tree.
///
/// Writes go through the same verification regardless of whether the
/// target is a [`Store`](crate::Store) or a [`StoreView`].
pub trait TreeWrite: TreeRead {
    /// Mutable root together with the configuration, borrowed disjointly.
    fn parts_mut(&mut self) -> (&mut Value, &StoreConfig);

    /// Verify `value` and install it at `path`.
    ///
    /// Fails with [`StoreError::PathArity`] for the empty path and with
    /// [`StoreError::Type`] if `value` is outside the whitelist; in both
    /// cases nothing is modified. Shape errors may leave intermediate
    /// mappings behind.
    fn set<T: Serialize + ?Sized>(&mut self, path: &[Segment], value: &T) -> StoreResult<()>
    where
        Self: Sized,
    {
        if path.is_empty() {
            return Err(StoreError::PathArity);
        }
        let value = self.config().verifier().verify(value).map_err(|e| {
            debug!(path = %location(path), error = %e, "rejected write");
            StoreError::from(e)
        })?;
        self.set_value(path, value)
    }

    /// Install an already-built value at `path`. Only the depth limit is
    /// checked.
    fn set_value(&mut self, path: &[Segment], value: Value) -> StoreResult<()> {
        if path.is_empty() {
            return Err(StoreError::PathArity);
        }
        self.config().verifier().check_depth(&value)?;
        let (root, _) = self.parts_mut();
        trace!(path = %location(path), kind = %value.kind(), "set");
        mutate::assign(root, path, value).map_err(|e| {
            debug!(path = %location(path), error = %e, "write failed");
            e
        })
    }

    /// Remove and return the value at `path`. Never changes the shape of
    /// anything above it.
    fn remove(&mut self, path: &[Segment]) -> Option<Value> {
        let (root, _) = self.parts_mut();
        mutate::remove(root, path)
    }

    /// A view over the mapping at `path`, sharing storage with `self`.
    ///
    /// Writes through the view are visible here once the view is dropped.
    /// `None` if nothing is at `path` or it is not a mapping.
    fn get_store(&mut self, path: &[Segment]) -> Option<StoreView<'_>> {
        let (root, config) = self.parts_mut();
        let node = resolve_mut(root, path)?;
        StoreView::new(node, config)
    }
}
