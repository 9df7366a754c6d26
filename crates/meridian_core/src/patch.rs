//! Patches and per-viewer state updates.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::ConcretePath;

/// A materialized projection for one viewer at one point in time
pub type Snapshot = IndexMap<ConcretePath, Value>;

/// One path-addressed operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchOp {
    /// Set the value at the path
    Set(Value),
    /// Remove the path
    Delete,
}

/// A single patch within a state update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Concrete field-instance address
    pub path: ConcretePath,
    /// The operation
    pub op: PatchOp,
}

impl Patch {
    /// Create a set patch
    #[must_use]
    pub fn set(path: ConcretePath, value: Value) -> Self {
        Self {
            path,
            op: PatchOp::Set(value),
        }
    }

    /// Create a delete patch
    #[must_use]
    pub fn delete(path: ConcretePath) -> Self {
        Self {
            path,
            op: PatchOp::Delete,
        }
    }
}

/// The per-viewer output of one sync cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateUpdate {
    /// Nothing changed for this viewer
    NoChange,
    /// Full snapshot: every included field as a set patch. Resets the
    /// viewer's dynamic-key slot table on the wire.
    FirstSync(Vec<Patch>),
    /// Incremental changes since the viewer's baseline
    Diff(Vec<Patch>),
}

impl StateUpdate {
    /// Whether this update carries no patches
    #[must_use]
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }

    /// The patches carried, empty for `NoChange`
    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        match self {
            Self::NoChange => &[],
            Self::FirstSync(patches) | Self::Diff(patches) => patches,
        }
    }
}
