use arbor_types::{IntegerOverflow, Verifier, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for value verification on a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum nesting of sequences and mappings inside a single verified
    /// value.
    pub max_depth: usize,
    /// Handling of integers that do not fit in `i64`.
    pub integer_overflow: IntegerOverflow,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            integer_overflow: IntegerOverflow::Reject,
        }
    }
}

impl StoreConfig {
    /// Reject overflowing integers. Same as the default.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Truncate overflowing integers and allow deeper trees.
    pub fn lenient() -> Self {
        Self {
            max_depth: 4 * DEFAULT_MAX_DEPTH,
            integer_overflow: IntegerOverflow::Wrap,
        }
    }

    /// Parse from TOML. Missing fields take their default.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// The verifier matching this configuration.
    pub fn verifier(&self) -> Verifier {
        Verifier::new(self.max_depth, self.integer_overflow)
    }
}
