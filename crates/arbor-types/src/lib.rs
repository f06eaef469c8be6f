//! Foundation types for arbor, an in-memory hierarchical key-value store.
//!
//! This crate provides the value model, the path grammar, and the verifier
//! that turns loosely-typed external data into a tree the store can hold.
//! Every other arbor crate depends on `arbor-types`.
//!
//! # Key Types
//!
//! - [`Value`] - Tagged union over every type allowed inside a tree
//! - [`Mapping`] - Text-keyed node (`BTreeMap<String, Value>`)
//! - [`Segment`] - One step of a path: a mapping key or a sequence index
//! - [`Path`] - Ordered list of segments, parsed from `a.b[2].c` notation
//! - [`Verifier`] - Single-pass validation and normalization of `Serialize` input
//! - [`TypeError`] - Whitelist violations found by the verifier
//! - [`from_value`] - Typed extraction from a tree through serde

pub mod decode;
pub mod error;
pub mod path;
pub mod value;
pub mod verify;

mod de;
mod ser;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use decode::from_value;
pub use error::{DecodeError, TypeError, TypeResult};
pub use path::{Path, Segment};
pub use value::{Mapping, Value, ValueKind};
pub use verify::{to_value, IntegerOverflow, Verifier, DEFAULT_MAX_DEPTH};
