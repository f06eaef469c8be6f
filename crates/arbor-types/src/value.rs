use std::collections::BTreeMap;
use std::fmt;

/// Text-keyed node of a tree.
///
/// Key order carries no meaning; `BTreeMap` keeps iteration and `Debug`
/// output deterministic.
pub type Mapping = BTreeMap<String, Value>;

/// A node in an arbor tree.
///
/// This enum is the complete whitelist of types a tree may contain. Byte
/// blobs are atomic: nothing descends into them.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// Canonical integer representation; every integer width is folded into
    /// this on the way in.
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    Map(Mapping),
}

/// The variant of a [`Value`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    Seq,
    Map,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Seq => "sequence",
            ValueKind::Map => "mapping",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Seq(_) => ValueKind::Seq,
            Value::Map(_) => ValueKind::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer payload. Floats are not converted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The float payload. Integers are not converted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_seq_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Number of nested container levels: scalars are 0, an empty or
    /// scalar-only container is 1.
    pub fn depth(&self) -> usize {
        match self {
            Value::Seq(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Map(map) => 1 + map.values().map(Value::depth).max().unwrap_or(0),
            _ => 0,
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Int(n.into())
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Seq(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_null() {
        assert!(Value::default().is_null());
        assert_eq!(Value::default().kind(), ValueKind::Null);
    }

    #[test]
    fn accessors_do_not_coerce() {
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::Int(3).as_f64(), None);
        assert_eq!(Value::Float(3.0).as_i64(), None);
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::Bool(true).as_str(), None);
        assert_eq!(Value::Bytes(vec![9]).as_bytes(), Some(&[9u8][..]));
    }

    #[test]
    fn depth_counts_container_levels() {
        assert_eq!(Value::Int(1).depth(), 0);
        assert_eq!(Value::Seq(vec![]).depth(), 1);
        let nested: Value = vec![("a", Value::Seq(vec![Value::Map(Mapping::new())]))]
            .into_iter()
            .collect();
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(Some(5i32)), Value::Int(5));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn kind_display() {
        assert_eq!(Value::Seq(vec![]).kind().to_string(), "sequence");
        assert_eq!(Value::Map(Mapping::new()).kind().to_string(), "mapping");
    }
}
