//! Schema versions.
//!
//! Every field carries a `since` version (default 1). The tree version is
//! the max over all fields. A snapshot recorded under an older version
//! default-initializes fields added after it; there is no migration code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default `since` version for declared fields
pub const DEFAULT_SINCE: u32 = 1;

/// Version of a schema: max `since` over all declared fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    /// Create from a raw version number
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Compute from per-field `since` values
    #[must_use]
    pub fn from_fields(sinces: impl IntoIterator<Item = u32>) -> Self {
        Self(sinces.into_iter().max().unwrap_or(DEFAULT_SINCE))
    }

    /// Get the raw version number
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self(DEFAULT_SINCE)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_max_of_fields() {
        let v = SchemaVersion::from_fields([1, 3, 2]);
        assert_eq!(v.as_u32(), 3);
    }

    #[test]
    fn test_version_of_empty_schema() {
        let v = SchemaVersion::from_fields([]);
        assert_eq!(v, SchemaVersion::default());
    }

    #[test]
    fn test_version_display() {
        assert_eq!(format!("{}", SchemaVersion::from_raw(4)), "v4");
    }
}
