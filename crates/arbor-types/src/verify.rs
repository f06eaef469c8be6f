//! Value verification: the boundary where external data enters a tree.
//!
//! A [`Value`] is whitelist-valid by construction, so verification happens
//! while converting arbitrary `Serialize` input into one. The walk is a
//! single pass: each node is checked and normalized (every integer width is
//! folded into `i64`) as it is built, and the first violation aborts the
//! whole conversion.

use serde::ser::{self, Serialize, Serializer as _};
use serde::{Deserialize, Serialize as SerializeDerive};
use thiserror::Error;

use crate::error::{TypeError, TypeResult};
use crate::path::{Path, Segment};
use crate::value::{Mapping, Value};

/// Nesting limit applied when no other is configured.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What to do with an integer that does not fit in `i64`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, SerializeDerive, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerOverflow {
    /// Fail verification with [`TypeError::IntegerOverflow`].
    #[default]
    Reject,
    /// Keep the low 64 bits (two's complement truncation).
    Wrap,
}

/// Validates and normalizes external data into a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verifier {
    max_depth: usize,
    overflow: IntegerOverflow,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, IntegerOverflow::default())
    }
}

impl Verifier {
    pub fn new(max_depth: usize, overflow: IntegerOverflow) -> Self {
        Self {
            max_depth,
            overflow,
        }
    }

    /// Maximum number of nested sequence/mapping levels a value may have.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn overflow(&self) -> IntegerOverflow {
        self.overflow
    }

    /// Convert `input` into a [`Value`], rejecting anything outside the
    /// whitelist.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use arbor_types::{Value, Verifier};
    ///
    /// let verifier = Verifier::default();
    /// let ok = verifier.verify(&vec![1u8, 2, 3]).unwrap();
    /// assert_eq!(ok, Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    ///
    /// let bad: HashMap<i32, &str> = [(100, "x")].into_iter().collect();
    /// assert!(verifier.verify(&bad).is_err());
    /// ```
    pub fn verify<T: Serialize + ?Sized>(&self, input: &T) -> TypeResult<Value> {
        input
            .serialize(ValueSerializer {
                verifier: self,
                depth: 0,
            })
            .map_err(Fault::into_type_error)
    }

    /// Check an already-built value against the depth limit.
    pub fn check_depth(&self, value: &Value) -> TypeResult<()> {
        check_depth_at(value, 0, self.max_depth).map_err(Fault::into_type_error)
    }

    fn integer<I>(&self, wide: I) -> Result<Value, Fault>
    where
        I: TryInto<i64> + Copy + ToString + WrapToI64,
    {
        match wide.try_into() {
            Ok(n) => Ok(Value::Int(n)),
            Err(_) => match self.overflow {
                IntegerOverflow::Reject => Err(Fault::new(FaultKind::IntegerOverflow(
                    wide.to_string(),
                ))),
                IntegerOverflow::Wrap => Ok(Value::Int(wide.wrap_to_i64())),
            },
        }
    }

    fn enter(&self, depth: usize) -> Result<usize, Fault> {
        let level = depth + 1;
        if level > self.max_depth {
            return Err(Fault::new(FaultKind::DepthExceeded(self.max_depth)));
        }
        Ok(level)
    }
}

/// Convert `input` with the default [`Verifier`].
pub fn to_value<T: Serialize + ?Sized>(input: &T) -> TypeResult<Value> {
    Verifier::default().verify(input)
}

fn check_depth_at(value: &Value, depth: usize, max_depth: usize) -> Result<(), Fault> {
    match value {
        Value::Seq(items) => {
            let level = depth + 1;
            if level > max_depth {
                return Err(Fault::new(FaultKind::DepthExceeded(max_depth)));
            }
            for (i, item) in items.iter().enumerate() {
                check_depth_at(item, level, max_depth)
                    .map_err(|f| f.within(Segment::Index(i as i64)))?;
            }
            Ok(())
        }
        Value::Map(entries) => {
            let level = depth + 1;
            if level > max_depth {
                return Err(Fault::new(FaultKind::DepthExceeded(max_depth)));
            }
            for (key, item) in entries {
                check_depth_at(item, level, max_depth)
                    .map_err(|f| f.within(Segment::Key(key.clone())))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Lossy narrowing used by [`IntegerOverflow::Wrap`].
trait WrapToI64 {
    fn wrap_to_i64(self) -> i64;
}

macro_rules! impl_wrap {
    ($($t:ty),*) => {
        $(impl WrapToI64 for $t {
            fn wrap_to_i64(self) -> i64 {
                self as i64
            }
        })*
    };
}

impl_wrap!(u64, i128, u128);

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
enum FaultKind {
    #[error("mapping key is not text (found {0})")]
    NonStringKey(String),
    #[error("integer {0} does not fit in a 64-bit signed integer")]
    IntegerOverflow(String),
    #[error("nesting exceeds the limit of {0}")]
    DepthExceeded(usize),
    #[error("{0}")]
    Custom(String),
}

/// Internal serializer error. The trail is collected innermost-first while
/// the error unwinds, so the happy path never pays for location tracking.
#[derive(Debug)]
struct Fault {
    kind: FaultKind,
    trail: Vec<Segment>,
}

impl Fault {
    fn new(kind: FaultKind) -> Self {
        Self {
            kind,
            trail: Vec::new(),
        }
    }

    fn within(mut self, segment: Segment) -> Self {
        self.trail.push(segment);
        self
    }

    fn location(&self) -> String {
        if self.trail.is_empty() {
            return "<root>".to_string();
        }
        let path: Path = self.trail.iter().rev().cloned().collect();
        path.to_string()
    }

    fn into_type_error(self) -> TypeError {
        let path = self.location();
        match self.kind {
            FaultKind::NonStringKey(found) => TypeError::NonStringKey { path, found },
            FaultKind::IntegerOverflow(value) => TypeError::IntegerOverflow { path, value },
            FaultKind::DepthExceeded(max_depth) => TypeError::DepthExceeded { path, max_depth },
            FaultKind::Custom(found) => TypeError::Unsupported { path, found },
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.kind, self.location())
    }
}

impl std::error::Error for Fault {}

impl ser::Error for Fault {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Fault::new(FaultKind::Custom(msg.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Value serializer
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct ValueSerializer<'v> {
    verifier: &'v Verifier,
    /// Number of enclosing containers.
    depth: usize,
}

impl<'v> ValueSerializer<'v> {
    fn child(self, depth: usize) -> Self {
        Self {
            verifier: self.verifier,
            depth,
        }
    }
}

impl<'v> ser::Serializer for ValueSerializer<'v> {
    type Ok = Value;
    type Error = Fault;

    type SerializeSeq = SeqBuilder<'v>;
    type SerializeTuple = SeqBuilder<'v>;
    type SerializeTupleStruct = SeqBuilder<'v>;
    type SerializeTupleVariant = VariantSeqBuilder<'v>;
    type SerializeMap = MapBuilder<'v>;
    type SerializeStruct = MapBuilder<'v>;
    type SerializeStructVariant = VariantMapBuilder<'v>;

    fn serialize_bool(self, v: bool) -> Result<Value, Fault> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Fault> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Fault> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Fault> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Fault> {
        Ok(Value::Int(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, Fault> {
        self.verifier.integer(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Fault> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Fault> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Fault> {
        Ok(Value::Int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Fault> {
        self.verifier.integer(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Value, Fault> {
        self.verifier.integer(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Fault> {
        Ok(Value::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Fault> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, Fault> {
        Ok(Value::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Fault> {
        Ok(Value::Text(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Fault> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Value, Fault> {
        Ok(Value::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Value, Fault> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Fault> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Fault> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Value, Fault> {
        Ok(Value::Text(variant.to_owned()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Value, Fault> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Fault> {
        let level = self.verifier.enter(self.depth)?;
        let inner = value
            .serialize(self.child(level))
            .map_err(|f| f.within(Segment::Key(variant.to_owned())))?;
        let mut map = Mapping::new();
        map.insert(variant.to_owned(), inner);
        Ok(Value::Map(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder<'v>, Fault> {
        let level = self.verifier.enter(self.depth)?;
        Ok(SeqBuilder {
            inner: self.child(level),
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder<'v>, Fault> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqBuilder<'v>, Fault> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantSeqBuilder<'v>, Fault> {
        // The wrapping single-entry map counts as one level.
        let outer = self.verifier.enter(self.depth)?;
        let seq = self
            .child(outer)
            .serialize_seq(Some(len))
            .map_err(|f| f.within(Segment::Key(variant.to_owned())))?;
        Ok(VariantSeqBuilder { variant, seq })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapBuilder<'v>, Fault> {
        let level = self.verifier.enter(self.depth)?;
        Ok(MapBuilder {
            inner: self.child(level),
            entries: Mapping::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder<'v>, Fault> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<VariantMapBuilder<'v>, Fault> {
        let outer = self.verifier.enter(self.depth)?;
        let map = self
            .child(outer)
            .serialize_map(Some(len))
            .map_err(|f| f.within(Segment::Key(variant.to_owned())))?;
        Ok(VariantMapBuilder { variant, map })
    }
}

struct SeqBuilder<'v> {
    inner: ValueSerializer<'v>,
    items: Vec<Value>,
}

impl<'v> SeqBuilder<'v> {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Fault> {
        let index = self.items.len() as i64;
        let item = value
            .serialize(self.inner)
            .map_err(|f| f.within(Segment::Index(index)))?;
        self.items.push(item);
        Ok(())
    }
}

impl ser::SerializeSeq for SeqBuilder<'_> {
    type Ok = Value;
    type Error = Fault;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Fault> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Fault> {
        Ok(Value::Seq(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder<'_> {
    type Ok = Value;
    type Error = Fault;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Fault> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Fault> {
        Ok(Value::Seq(self.items))
    }
}

impl ser::SerializeTupleStruct for SeqBuilder<'_> {
    type Ok = Value;
    type Error = Fault;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Fault> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Fault> {
        Ok(Value::Seq(self.items))
    }
}

struct VariantSeqBuilder<'v> {
    variant: &'static str,
    seq: SeqBuilder<'v>,
}

impl ser::SerializeTupleVariant for VariantSeqBuilder<'_> {
    type Ok = Value;
    type Error = Fault;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Fault> {
        let variant = self.variant;
        self.seq
            .push(value)
            .map_err(|f| f.within(Segment::Key(variant.to_owned())))
    }

    fn end(self) -> Result<Value, Fault> {
        let mut map = Mapping::new();
        map.insert(self.variant.to_owned(), Value::Seq(self.seq.items));
        Ok(Value::Map(map))
    }
}

struct MapBuilder<'v> {
    inner: ValueSerializer<'v>,
    entries: Mapping,
    pending_key: Option<String>,
}

impl<'v> MapBuilder<'v> {
    fn insert<T: Serialize + ?Sized>(&mut self, key: String, value: &T) -> Result<(), Fault> {
        let item = value
            .serialize(self.inner)
            .map_err(|f| f.within(Segment::Key(key.clone())))?;
        self.entries.insert(key, item);
        Ok(())
    }
}

impl ser::SerializeMap for MapBuilder<'_> {
    type Ok = Value;
    type Error = Fault;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Fault> {
        self.pending_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Fault> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| <Fault as ser::Error>::custom("map value without a key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<Value, Fault> {
        Ok(Value::Map(self.entries))
    }
}

impl ser::SerializeStruct for MapBuilder<'_> {
    type Ok = Value;
    type Error = Fault;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Fault> {
        self.insert(key.to_owned(), value)
    }

    fn end(self) -> Result<Value, Fault> {
        Ok(Value::Map(self.entries))
    }
}

struct VariantMapBuilder<'v> {
    variant: &'static str,
    map: MapBuilder<'v>,
}

impl ser::SerializeStructVariant for VariantMapBuilder<'_> {
    type Ok = Value;
    type Error = Fault;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Fault> {
        let variant = self.variant;
        self.map
            .insert(key.to_owned(), value)
            .map_err(|f| f.within(Segment::Key(variant.to_owned())))
    }

    fn end(self) -> Result<Value, Fault> {
        let mut map = Mapping::new();
        map.insert(self.variant.to_owned(), Value::Map(self.map.entries));
        Ok(Value::Map(map))
    }
}

// ---------------------------------------------------------------------------
// Key serializer
// ---------------------------------------------------------------------------

/// Accepts only text-like map keys.
struct KeySerializer;

fn non_string_key(found: &str) -> Fault {
    Fault::new(FaultKind::NonStringKey(found.to_owned()))
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = Fault;

    type SerializeSeq = ser::Impossible<String, Fault>;
    type SerializeTuple = ser::Impossible<String, Fault>;
    type SerializeTupleStruct = ser::Impossible<String, Fault>;
    type SerializeTupleVariant = ser::Impossible<String, Fault>;
    type SerializeMap = ser::Impossible<String, Fault>;
    type SerializeStruct = ser::Impossible<String, Fault>;
    type SerializeStructVariant = ser::Impossible<String, Fault>;

    fn serialize_str(self, v: &str) -> Result<String, Fault> {
        Ok(v.to_owned())
    }

    fn serialize_char(self, v: char) -> Result<String, Fault> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<String, Fault> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, Fault> {
        value.serialize(self)
    }

    fn serialize_bool(self, v: bool) -> Result<String, Fault> {
        Err(non_string_key(&format!("bool {v}")))
    }

    fn serialize_i8(self, v: i8) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_i16(self, v: i16) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_i32(self, v: i32) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_i64(self, v: i64) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_i128(self, v: i128) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_u8(self, v: u8) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_u16(self, v: u16) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_u32(self, v: u32) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_u64(self, v: u64) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_u128(self, v: u128) -> Result<String, Fault> {
        Err(non_string_key(&format!("integer {v}")))
    }

    fn serialize_f32(self, v: f32) -> Result<String, Fault> {
        Err(non_string_key(&format!("float {v}")))
    }

    fn serialize_f64(self, v: f64) -> Result<String, Fault> {
        Err(non_string_key(&format!("float {v}")))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, Fault> {
        Err(non_string_key("bytes"))
    }

    fn serialize_none(self) -> Result<String, Fault> {
        Err(non_string_key("none"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<String, Fault> {
        Err(non_string_key("option"))
    }

    fn serialize_unit(self) -> Result<String, Fault> {
        Err(non_string_key("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<String, Fault> {
        Err(non_string_key(name))
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<String, Fault> {
        Err(non_string_key(variant))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Fault> {
        Err(non_string_key("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Fault> {
        Err(non_string_key("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Fault> {
        Err(non_string_key(name))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Fault> {
        Err(non_string_key(variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Fault> {
        Err(non_string_key("mapping"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Fault> {
        Err(non_string_key(name))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Fault> {
        Err(non_string_key(variant))
    }
}
