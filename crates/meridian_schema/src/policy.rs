//! Per-field synchronization policies.
//!
//! A closed tagged union over the fixed policy kinds; the variants that
//! filter or transform carry strongly-typed functions. Resolution is pure
//! and total: policy functions must never panic, since diff determinism and
//! replay both depend on totality.

use meridian_core::PlayerId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::viewer::Viewer;

/// Key projection for `PerPlayer`: maps an element to the player it
/// belongs to, or `None` for elements owned by nobody.
pub type KeyFn = Arc<dyn Fn(&Value) -> Option<PlayerId> + Send + Sync>;

/// Transform for `Masked`: the same transformed value is shown to every
/// viewer.
pub type MaskFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Arbitrary filter/transform for `Custom`: `None` excludes the value for
/// that viewer.
pub type CustomFn = Arc<dyn Fn(&Viewer, &Value) -> Option<Value> + Send + Sync>;

/// Declarative visibility rule, exactly one per stored field
pub enum SyncPolicy {
    /// Unchanged value to every viewer
    Broadcast,
    /// Mapping keyed by player id; each viewer sees only their own slice.
    /// Requires a mapping field (at least one wildcard, the first being the
    /// player key) - anything else is a build-time configuration error.
    PerPlayerSlice,
    /// General container filtering: include an element iff the key
    /// projection names the viewer's player
    PerPlayer(KeyFn),
    /// Identical transformed value to every viewer
    Masked(MaskFn),
    /// Tracked and validated but never sent
    ServerOnly,
    /// Arbitrary per-viewer filter/transform
    Custom(CustomFn),
    /// Excluded from sync metadata entirely; runtime bookkeeping only
    Internal,
}

impl SyncPolicy {
    /// The data-free kind of this policy
    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Broadcast => PolicyKind::Broadcast,
            Self::PerPlayerSlice => PolicyKind::PerPlayerSlice,
            Self::PerPlayer(_) => PolicyKind::PerPlayer,
            Self::Masked(_) => PolicyKind::Masked,
            Self::ServerOnly => PolicyKind::ServerOnly,
            Self::Custom(_) => PolicyKind::Custom,
            Self::Internal => PolicyKind::Internal,
        }
    }

    /// Whether the sync engine visits this field at all
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        !matches!(self, Self::Internal)
    }

    /// Resolve one field instance for one viewer.
    ///
    /// `keys` are the instance's dynamic keys in pattern order; for
    /// `PerPlayerSlice` the first key is the player key.
    #[must_use]
    pub fn resolve(&self, viewer: &Viewer, keys: &[String], value: &Value) -> Resolution {
        match self {
            Self::Broadcast => Resolution::Included(value.clone()),
            Self::PerPlayerSlice => {
                if keys.first().map(String::as_str) == Some(viewer.player.as_str()) {
                    Resolution::Included(value.clone())
                } else {
                    Resolution::Excluded
                }
            }
            Self::PerPlayer(key_fn) => {
                if key_fn(value).as_ref() == Some(&viewer.player) {
                    Resolution::Included(value.clone())
                } else {
                    Resolution::Excluded
                }
            }
            Self::Masked(mask) => Resolution::Included(mask(value)),
            Self::ServerOnly => Resolution::Excluded,
            Self::Custom(custom) => match custom(viewer, value) {
                Some(transformed) => Resolution::Included(transformed),
                None => Resolution::Excluded,
            },
            // Internal fields are never visited; resolving one is a
            // programming error upstream, but stay total here.
            Self::Internal => Resolution::Excluded,
        }
    }
}

impl fmt::Debug for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncPolicy::{:?}", self.kind())
    }
}

/// Policy kind without attached functions, used in the schema contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyKind {
    /// See [`SyncPolicy::Broadcast`]
    Broadcast,
    /// See [`SyncPolicy::PerPlayerSlice`]
    PerPlayerSlice,
    /// See [`SyncPolicy::PerPlayer`]
    PerPlayer,
    /// See [`SyncPolicy::Masked`]
    Masked,
    /// See [`SyncPolicy::ServerOnly`]
    ServerOnly,
    /// See [`SyncPolicy::Custom`]
    Custom,
    /// See [`SyncPolicy::Internal`]
    Internal,
}

/// Outcome of resolving one field instance for one viewer
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The viewer sees this (possibly transformed) value
    Included(Value),
    /// The viewer does not see this instance
    Excluded,
}

impl Resolution {
    /// The included value, if any
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Included(v) => Some(v),
            Self::Excluded => None,
        }
    }
}
