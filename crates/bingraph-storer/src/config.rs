use serde::{Deserialize, Serialize};

use bingraph_binary::ByteOrder;

/// Whether instances the context already knows are stored again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorerMode {
    /// Reference already-registered instances by id without storing them.
    /// Roots and instances passed through `apply_eager` are always stored.
    #[default]
    Lazy,
    /// Store every reachable instance once per storer run.
    Eager,
}

/// Configuration for a [`Storer`](crate::Storer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorerConfig {
    pub mode: StorerMode,
    /// Expected number of instances per commit, used to presize the
    /// identity map and work list.
    pub initial_capacity: usize,
    pub byte_order: ByteOrder,
}

impl Default for StorerConfig {
    fn default() -> Self {
        Self {
            mode: StorerMode::Lazy,
            initial_capacity: 64,
            byte_order: ByteOrder::NATIVE,
        }
    }
}

impl StorerConfig {
    pub fn lazy() -> Self {
        Self::default()
    }

    pub fn eager() -> Self {
        Self {
            mode: StorerMode::Eager,
            ..Self::default()
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
}
