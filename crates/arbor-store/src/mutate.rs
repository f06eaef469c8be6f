//! Write-side tree walk.
//!
//! Mirrors [`crate::navigate`] with these differences:
//! - the final key segment inserts or overwrites unconditionally;
//! - a slot followed by a key segment that does not hold a mapping (or does
//!   not exist) gets a fresh empty mapping installed first;
//! - a slot followed by an index segment must already hold a sequence, and
//!   every index must already be in bounds. Sequences are never created or
//!   grown here.
//!
//! There is no rollback. Mappings installed before a failing segment stay.

use std::collections::btree_map::Entry;

use arbor_types::{Mapping, Path, Segment, Value, ValueKind};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::navigate::{normalize_index, resolve_mut};

/// A node that can hold children.
enum Container<'a> {
    Map(&'a mut Mapping),
    Seq(&'a mut Vec<Value>),
}

impl Container<'_> {
    fn kind(&self) -> ValueKind {
        match self {
            Container::Map(_) => ValueKind::Map,
            Container::Seq(_) => ValueKind::Seq,
        }
    }
}

/// Render a path prefix for error messages.
pub(crate) fn location(prefix: &[Segment]) -> String {
    if prefix.is_empty() {
        "<root>".to_string()
    } else {
        Path::from(prefix).to_string()
    }
}

/// Install `value` at `path` below `root`.
///
/// `value` is expected to be verified already.
pub fn assign(root: &mut Value, path: &[Segment], value: Value) -> StoreResult<()> {
    let (last, _) = path.split_last().ok_or(StoreError::PathArity)?;
    let mut cursor = open(root, &[])?;
    for pos in 0..path.len() - 1 {
        cursor = descend(cursor, path, pos)?;
    }
    install(cursor, last, value, &path[..path.len() - 1])
}

/// Treat an existing slot as a container.
fn open<'a>(slot: &'a mut Value, at: &[Segment]) -> StoreResult<Container<'a>> {
    match slot {
        Value::Map(map) => Ok(Container::Map(map)),
        Value::Seq(items) => Ok(Container::Seq(items)),
        other => Err(StoreError::Shape {
            path: location(at),
            expected: ValueKind::Map,
            found: other.kind().to_string(),
        }),
    }
}

/// Step from `cursor` through `path[pos]`, preparing the selected slot for
/// the kind of segment that follows it.
fn descend<'a>(cursor: Container<'a>, path: &[Segment], pos: usize) -> StoreResult<Container<'a>> {
    let here = &path[..pos];
    let through = &path[..=pos];
    let wants_seq = matches!(path[pos + 1], Segment::Index(_));

    let slot = match (cursor, &path[pos]) {
        (Container::Map(map), Segment::Key(key)) => {
            if wants_seq {
                map.get_mut(key).ok_or_else(|| StoreError::Shape {
                    path: location(through),
                    expected: ValueKind::Seq,
                    found: "nothing".to_string(),
                })?
            } else {
                match map.entry(key.clone()) {
                    Entry::Vacant(slot) => slot.insert(Value::Map(Mapping::new())),
                    Entry::Occupied(slot) => slot.into_mut(),
                }
            }
        }
        (Container::Seq(items), Segment::Index(index)) => {
            let len = items.len();
            let i = normalize_index(*index, len).ok_or_else(|| StoreError::IndexOutOfBounds {
                path: location(through),
                index: *index,
                len,
            })?;
            &mut items[i]
        }
        (cursor, segment) => return Err(mismatch(&cursor, segment, here)),
    };

    if wants_seq {
        return match slot {
            Value::Seq(items) => Ok(Container::Seq(items)),
            other => Err(StoreError::Shape {
                path: location(through),
                expected: ValueKind::Seq,
                found: other.kind().to_string(),
            }),
        };
    }

    if !matches!(slot, Value::Map(_)) {
        debug!(
            path = %location(through),
            replaced = %slot.kind(),
            "shape migration: installing empty mapping"
        );
        *slot = Value::Map(Mapping::new());
    }
    open(slot, through)
}

fn install(
    cursor: Container<'_>,
    last: &Segment,
    value: Value,
    parent: &[Segment],
) -> StoreResult<()> {
    match (cursor, last) {
        (Container::Map(map), Segment::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Container::Seq(items), Segment::Index(index)) => {
            let len = items.len();
            let i = normalize_index(*index, len).ok_or_else(|| StoreError::IndexOutOfBounds {
                path: location(&[parent, std::slice::from_ref(last)].concat()),
                index: *index,
                len,
            })?;
            items[i] = value;
            Ok(())
        }
        (cursor, segment) => Err(mismatch(&cursor, segment, parent)),
    }
}

fn mismatch(cursor: &Container<'_>, segment: &Segment, at: &[Segment]) -> StoreError {
    let expected = match segment {
        Segment::Key(_) => ValueKind::Map,
        Segment::Index(_) => ValueKind::Seq,
    };
    StoreError::Shape {
        path: location(at),
        expected,
        found: cursor.kind().to_string(),
    }
}

/// Remove the value at `path`, returning it. Removing a sequence element
/// shifts the ones after it. The empty path removes nothing.
pub fn remove(root: &mut Value, path: &[Segment]) -> Option<Value> {
    let (last, parent) = path.split_last()?;
    match (resolve_mut(root, parent)?, last) {
        (Value::Map(map), Segment::Key(key)) => map.remove(key),
        (Value::Seq(items), Segment::Index(index)) => {
            let i = normalize_index(*index, items.len())?;
            Some(items.remove(i))
        }
        _ => None,
    }
}
