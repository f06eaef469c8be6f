//! Typed extraction: a borrowed [`Value`] acts as a serde `Deserializer`.
//!
//! Decoding reads the tree in place, so every payload reaches the target
//! type as stored: non-finite floats stay floats and byte blobs stay bytes.
//! No text or numeric coercion is added beyond what the target's own
//! `Deserialize` impl accepts.

use std::fmt;

use serde::de::value::{MapDeserializer, SeqDeserializer, StrDeserializer};
use serde::de::{
    self, Deserialize, DeserializeSeed, EnumAccess, IntoDeserializer, Unexpected, VariantAccess,
    Visitor,
};
use serde::forward_to_deserialize_any;

use crate::error::DecodeError;
use crate::value::{Mapping, Value};

/// Decode `value` into `T` without an intermediate format.
///
/// # Examples
///
/// ```
/// use arbor_types::{from_value, Value};
///
/// let n: f64 = from_value(&Value::Float(f64::INFINITY)).unwrap();
/// assert!(n.is_infinite());
///
/// let bytes: Vec<u8> = from_value(&Value::Bytes(vec![1, 2])).unwrap();
/// assert_eq!(bytes, [1, 2]);
/// ```
pub fn from_value<'de, T: Deserialize<'de>>(value: &'de Value) -> Result<T, DecodeError> {
    T::deserialize(value)
}

impl de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        DecodeError(msg.to_string())
    }
}

impl Value {
    fn unexpected(&self) -> Unexpected<'_> {
        match self {
            Value::Null => Unexpected::Unit,
            Value::Bool(b) => Unexpected::Bool(*b),
            Value::Int(n) => Unexpected::Signed(*n),
            Value::Float(x) => Unexpected::Float(*x),
            Value::Text(s) => Unexpected::Str(s),
            Value::Bytes(b) => Unexpected::Bytes(b),
            Value::Seq(_) => Unexpected::Seq,
            Value::Map(_) => Unexpected::Map,
        }
    }
}

fn visit_seq<'de, V: Visitor<'de>>(
    items: &'de [Value],
    visitor: V,
) -> Result<V::Value, DecodeError> {
    let mut access: SeqDeserializer<_, DecodeError> = SeqDeserializer::new(items.iter());
    let out = visitor.visit_seq(&mut access)?;
    access.end()?;
    Ok(out)
}

fn visit_map<'de, V: Visitor<'de>>(map: &'de Mapping, visitor: V) -> Result<V::Value, DecodeError> {
    let entries = map.iter().map(|(key, item)| (key.as_str(), item));
    let mut access: MapDeserializer<'de, _, DecodeError> = MapDeserializer::new(entries);
    let out = visitor.visit_map(&mut access)?;
    access.end()?;
    Ok(out)
}

impl<'de> de::Deserializer<'de> for &'de Value {
    type Error = DecodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Int(n) => visitor.visit_i64(*n),
            Value::Float(x) => visitor.visit_f64(*x),
            Value::Text(s) => visitor.visit_borrowed_str(s),
            Value::Bytes(b) => visitor.visit_borrowed_bytes(b),
            Value::Seq(items) => visit_seq(items, visitor),
            Value::Map(map) => visit_map(map, visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    /// Byte blobs also decode as a sequence of `u8`, so `Vec<u8>` targets
    /// work without a bytes wrapper.
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DecodeError> {
        match self {
            Value::Bytes(bytes) => {
                let mut access: SeqDeserializer<_, DecodeError> =
                    SeqDeserializer::new(bytes.iter().copied());
                let out = visitor.visit_seq(&mut access)?;
                access.end()?;
                Ok(out)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self {
            Value::Text(variant) => {
                let access: StrDeserializer<'_, DecodeError> = variant.as_str().into_deserializer();
                visitor.visit_enum(access)
            }
            Value::Map(map) if map.len() == 1 => match map.iter().next() {
                Some((variant, content)) => visitor.visit_enum(Tagged { variant, content }),
                None => Err(de::Error::invalid_length(0, &"a single-key mapping")),
            },
            other => Err(de::Error::invalid_type(
                other.unexpected(),
                &"a variant name or a single-key mapping",
            )),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple tuple_struct map struct
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, DecodeError> for &'de Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

/// An externally tagged enum: `{variant: content}`.
struct Tagged<'de> {
    variant: &'de str,
    content: &'de Value,
}

impl<'de> EnumAccess<'de> for Tagged<'de> {
    type Error = DecodeError;
    type Variant = Content<'de>;

    fn variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<(S::Value, Content<'de>), DecodeError> {
        let tag: StrDeserializer<'_, DecodeError> = self.variant.into_deserializer();
        Ok((seed.deserialize(tag)?, Content(self.content)))
    }
}

struct Content<'de>(&'de Value);

impl<'de> VariantAccess<'de> for Content<'de> {
    type Error = DecodeError;

    fn unit_variant(self) -> Result<(), DecodeError> {
        match self.0 {
            Value::Null => Ok(()),
            other => Err(de::Error::invalid_type(other.unexpected(), &"unit variant")),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(
        self,
        seed: S,
    ) -> Result<S::Value, DecodeError> {
        seed.deserialize(self.0)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.0 {
            Value::Seq(items) => visit_seq(items, visitor),
            other => Err(de::Error::invalid_type(other.unexpected(), &"tuple variant")),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DecodeError> {
        match self.0 {
            Value::Map(map) => visit_map(map, visitor),
            other => Err(de::Error::invalid_type(other.unexpected(), &"struct variant")),
        }
    }
}
