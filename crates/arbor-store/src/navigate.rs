//! Read-side tree walk.
//!
//! Key segments select from mappings, index segments from sequences. Any
//! mismatch between segment and node, a missing key, or an index outside
//! the sequence ends the walk with `None`. Nothing is created or changed.

use arbor_types::{Segment, Value};

/// Map a possibly negative index onto `0..len`.
///
/// Negative indices count from the end: `-1` is the last element and `-len`
/// the first. Anything outside that window is `None`.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 {
        index.checked_add(len)?
    } else {
        index
    };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

/// Locate the value at `path` below `root`. The empty path is `root` itself.
pub fn resolve<'a>(root: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    path.iter().try_fold(root, step)
}

/// Mutable variant of [`resolve`].
pub fn resolve_mut<'a>(root: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, step_mut)
}

fn step<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (node, segment) {
        (Value::Map(map), Segment::Key(key)) => map.get(key),
        (Value::Seq(items), Segment::Index(index)) => {
            items.get(normalize_index(*index, items.len())?)
        }
        _ => None,
    }
}

fn step_mut<'a>(node: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (node, segment) {
        (Value::Map(map), Segment::Key(key)) => map.get_mut(key),
        (Value::Seq(items), Segment::Index(index)) => {
            let index = normalize_index(*index, items.len())?;
            items.get_mut(index)
        }
        _ => None,
    }
}
