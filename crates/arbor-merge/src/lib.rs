//! Merge engine for arbor.
//!
//! Implements deep copy and overlay: a mapping-level recursive merge of a
//! patch tree over a base tree, where every non-mapping value in the patch
//! replaces what the base had at that key.
//!
//! # Key Items
//!
//! - [`deep_copy`] / [`deep_copy_value`] -- independent clone of a tree
//! - [`overlay`] -- copy both inputs, then merge patch over base
//! - [`merge_into`] / [`MergeStats`] -- in-place merge of an owned patch

pub mod copy;
pub mod overlay;

pub use copy::{deep_copy, deep_copy_value};
pub use overlay::{merge_into, overlay, MergeStats};
