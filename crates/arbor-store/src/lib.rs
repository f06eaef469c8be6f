//! In-memory hierarchical key-value store.
//!
//! A [`Store`] owns a tree of mappings, sequences, and scalars addressed by
//! [`Path`]s such as `a.b[2].c`. Writes are validated against the value
//! whitelist before anything is touched, and overlay merges two stores into
//! a third without sharing structure.
//!
//! # Access
//!
//! Reads and writes live on two traits so that a [`Store`] and a
//! [`StoreView`] (a borrowed window onto a nested mapping) behave the same:
//!
//! - [`TreeRead`] -- `get`/`exists`, typed getters, `get_as`
//! - [`TreeWrite`] -- `set`, `set_value`, `remove`, `get_store`
//!
//! Typed getters return the type's zero value both when the path is absent
//! and when the value there has a different type. Use
//! [`TreeRead::get`] or [`TreeRead::exists`] when the difference matters.
//!
//! # Writes
//!
//! - Missing or non-mapping intermediate keys are replaced by empty mappings
//!   ("shape migration") so a write can always descend by key.
//! - Sequences are never created or grown by a write; an index must already
//!   be in bounds.
//! - A failed write performs no rollback: mappings created before the
//!   failing segment stay in place.
//!
//! # Concurrency
//!
//! None. A store has one owner at a time; views borrow it mutably, so the
//! compiler rules out aliasing writes.

pub mod config;
pub mod error;
pub mod mutate;
pub mod navigate;
pub mod store;
pub mod traits;
pub mod view;

// Re-export primary types at crate root for ergonomic imports.
pub use arbor_types::{path, IntegerOverflow, Mapping, Path, Segment, TypeError, Value, ValueKind};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use store::Store;
pub use traits::{TreeRead, TreeWrite};
pub use view::StoreView;
