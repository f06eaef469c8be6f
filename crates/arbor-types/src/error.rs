use thiserror::Error;

/// Errors produced when external data does not fit the value whitelist.
///
/// Every variant carries the dotted location of the offending value, with
/// `<root>` standing for the top of the tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("mapping key at {path} is not text (found {found})")]
    NonStringKey { path: String, found: String },

    #[error("integer {value} at {path} does not fit in a 64-bit signed integer")]
    IntegerOverflow { path: String, value: String },

    #[error("value at {path} nests deeper than the limit of {max_depth}")]
    DepthExceeded { path: String, max_depth: usize },

    #[error("unsupported value at {path}: {found}")]
    Unsupported { path: String, found: String },
}

impl TypeError {
    /// The location of the offending value.
    pub fn path(&self) -> &str {
        match self {
            TypeError::NonStringKey { path, .. }
            | TypeError::IntegerOverflow { path, .. }
            | TypeError::DepthExceeded { path, .. }
            | TypeError::Unsupported { path, .. } => path,
        }
    }
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;

/// A [`Value`](crate::Value) could not be decoded into the requested type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot decode value: {0}")]
pub struct DecodeError(pub String);
