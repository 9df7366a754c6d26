//! The shared schema contract.
//!
//! Both ends of the wire must agree on field patterns, path hashes, and
//! versions. The contract is generated from the server schema, consumed as
//! immutable input by the external client generator, and re-verified at
//! startup.

use meridian_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::policy::PolicyKind;

/// One sync field as seen by both ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldContract {
    /// Path pattern string, wildcards at dynamic keys
    pub pattern: String,
    /// 32-bit FNV-1a hash of the pattern
    pub path_hash: u32,
    /// Schema version this field first appeared in
    pub since: u32,
    /// Policy kind (functions are server-side only)
    pub policy: PolicyKind,
}

/// Named payload shape for an action, event, or response
///
/// The shape itself is an opaque description produced by the external
/// generator; the core only carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadShape {
    /// Action/event/response name
    pub name: String,
    /// Opaque shape description
    pub shape: Value,
}

/// The full contract shared between server and client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaContract {
    /// Schema version (max field `since`)
    pub version: u32,
    /// Sync fields in declaration order (`Internal` fields excluded)
    pub fields: Vec<FieldContract>,
    /// Action payload shapes
    #[serde(default)]
    pub actions: Vec<PayloadShape>,
    /// Event payload shapes
    #[serde(default)]
    pub events: Vec<PayloadShape>,
    /// Response payload shapes
    #[serde(default)]
    pub responses: Vec<PayloadShape>,
}

impl SchemaContract {
    /// Create a contract from fields
    #[must_use]
    pub fn new(version: u32, fields: Vec<FieldContract>) -> Self {
        Self {
            version,
            fields,
            actions: Vec::new(),
            events: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Attach an action payload shape
    #[must_use]
    pub fn with_action(mut self, shape: PayloadShape) -> Self {
        self.actions.push(shape);
        self
    }

    /// Attach an event payload shape
    #[must_use]
    pub fn with_event(mut self, shape: PayloadShape) -> Self {
        self.events.push(shape);
        self
    }

    /// Serialize to JSON bytes
    ///
    /// # Errors
    ///
    /// Returns `Internal` if serialization fails.
    pub fn to_json(&self) -> CoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CoreError::Internal {
            message: e.to_string(),
        })
    }

    /// Parse from JSON bytes
    ///
    /// # Errors
    ///
    /// Returns `ContractMismatch` for malformed input.
    pub fn from_json(bytes: &[u8]) -> CoreResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::ContractMismatch {
            reason: e.to_string(),
        })
    }
}
