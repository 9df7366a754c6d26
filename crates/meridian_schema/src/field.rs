//! Field declarations.

use meridian_core::{CoreResult, PathPattern, DEFAULT_SINCE};
use serde_json::Value;

use crate::policy::SyncPolicy;

/// One declared stored field
///
/// Every stored field carries exactly one policy (or `Internal`); fields
/// are enforced at construction, so an "unmarked" field cannot exist.
/// Computed/derived values are simply never declared.
#[derive(Debug)]
pub struct FieldDecl {
    /// Path pattern, wildcards at dynamic container keys
    pub pattern: PathPattern,
    /// The field's synchronization policy
    pub policy: SyncPolicy,
    /// Schema version this field first appeared in
    pub since: u32,
    /// Default value for scalar fields missing from an older snapshot
    pub default: Value,
}

impl FieldDecl {
    /// Declare a field
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the pattern string does not parse.
    pub fn new(pattern: &str, policy: SyncPolicy) -> CoreResult<Self> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            policy,
            since: DEFAULT_SINCE,
            default: Value::Null,
        })
    }

    /// Set the schema version this field first appeared in
    #[must_use]
    pub fn with_since(mut self, since: u32) -> Self {
        self.since = since;
        self
    }

    /// Set the default value used when loading an older snapshot
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    /// Whether this field holds dynamic-keyed instances
    #[must_use]
    pub fn is_mapping(&self) -> bool {
        self.pattern.wildcard_count() > 0
    }
}
