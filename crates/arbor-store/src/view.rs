use std::fmt;

use arbor_types::Value;

use crate::config::StoreConfig;
use crate::store::Store;
use crate::traits::{TreeRead, TreeWrite};

/// A borrowed window onto a nested mapping of a [`Store`].
///
/// Nothing is copied: reads see the parent's data and writes land directly
/// in the parent's tree. The view holds the parent mutably borrowed, so the
/// parent cannot be touched while the view is alive. Use [`to_store`] for an
/// independent copy instead.
///
/// [`to_store`]: StoreView::to_store
pub struct StoreView<'a> {
    root: &'a mut Value,
    config: &'a StoreConfig,
}

impl<'a> StoreView<'a> {
    /// Wrap `node` if it is a mapping.
    pub(crate) fn new(node: &'a mut Value, config: &'a StoreConfig) -> Option<Self> {
        if !matches!(node, Value::Map(_)) {
            return None;
        }
        Some(Self { root: node, config })
    }

    /// Copy the viewed mapping into a standalone store with the parent's
    /// configuration.
    pub fn to_store(&self) -> Store {
        Store::from_parts(
            arbor_merge::deep_copy(self.as_mapping()),
            self.config.clone(),
        )
    }
}

impl TreeRead for StoreView<'_> {
    fn root(&self) -> &Value {
        &*self.root
    }

    fn config(&self) -> &StoreConfig {
        self.config
    }
}

impl TreeWrite for StoreView<'_> {
    fn parts_mut(&mut self) -> (&mut Value, &StoreConfig) {
        (&mut *self.root, self.config)
    }
}

impl fmt::Debug for StoreView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreView")
            .field("keys", &self.as_mapping().len())
            .finish()
    }
}
