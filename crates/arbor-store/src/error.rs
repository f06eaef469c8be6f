use arbor_types::{TypeError, ValueKind};

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// A value, or something nested inside it, is outside the whitelist.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// A write was attempted with an empty path.
    #[error("a write needs at least one path segment")]
    PathArity,

    /// A segment needs a mapping or a sequence and found something else.
    #[error("expected {expected} at {path}, found {found}")]
    Shape {
        path: String,
        expected: ValueKind,
        found: String,
    },

    /// A sequence index is outside the sequence on write.
    #[error("index {index} out of bounds at {path} (length {len})")]
    IndexOutOfBounds {
        path: String,
        index: i64,
        len: usize,
    },

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns `true` for the shape family: wrong container kind or an
    /// out-of-bounds index.
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            StoreError::Shape { .. } | StoreError::IndexOutOfBounds { .. }
        )
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
