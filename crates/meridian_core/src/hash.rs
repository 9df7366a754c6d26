//! FNV-1a hashing for field paths and state snapshots.
//!
//! Path patterns get a 32-bit hash shared by both ends of the wire; full
//! state snapshots get a 64-bit hash recorded per tick for reevaluation.
//! FNV-1a is pinned: both hashes must be identical across platforms and
//! releases, so the algorithm is part of the protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Compute the 32-bit FNV-1a hash of `data`
#[must_use]
pub fn fnv1a32(data: &[u8]) -> u32 {
    let mut hash = FNV32_OFFSET;
    for byte in data {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV32_PRIME);
    }
    hash
}

/// Compute the 64-bit FNV-1a hash of `data`
#[must_use]
pub fn fnv1a64(data: &[u8]) -> u64 {
    let mut hash = FNV64_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV64_PRIME);
    }
    hash
}

/// 32-bit hash of a sync-field path pattern
///
/// Computed once at schema build time over the pattern string (wildcards
/// included, e.g. `players.*.position`) and carried on the wire in place of
/// the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathHash(u32);

impl PathHash {
    /// Hash a path pattern string
    #[must_use]
    pub fn of_pattern(pattern: &str) -> Self {
        Self(fnv1a32(pattern.as_bytes()))
    }

    /// Create from a raw 32-bit value
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw 32-bit value
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// 64-bit FNV-1a hash of a full state snapshot
///
/// Computed over the canonical JSON bytes of the tree (object keys sorted),
/// so identical state always yields identical bytes and identical hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateHash(u64);

impl StateHash {
    /// Hash a state value by its canonical JSON bytes
    #[must_use]
    pub fn compute(state: &serde_json::Value) -> Self {
        let bytes = serde_json::to_vec(state).unwrap_or_default();
        Self(fnv1a64(&bytes))
    }

    /// Create from a raw 64-bit value
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw 64-bit value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fnv1a32_known_vectors() {
        // Published FNV-1a test vectors
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_fnv1a64_known_vectors() {
        assert_eq!(fnv1a64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a64(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn test_path_hash_stable() {
        let h1 = PathHash::of_pattern("players.*.position");
        let h2 = PathHash::of_pattern("players.*.position");
        assert_eq!(h1, h2);
        assert_ne!(h1, PathHash::of_pattern("players.*.velocity"));
    }

    #[test]
    fn test_path_hash_display() {
        let h = PathHash::from_raw(0x0000_00ff);
        assert_eq!(format!("{}", h), "000000ff");
    }

    #[test]
    fn test_state_hash_canonical_key_order() {
        // serde_json object maps are sorted, so construction order is
        // irrelevant to the hash.
        let a = json!({"round": 1, "hands": {"A": [7]}});
        let b = json!({"hands": {"A": [7]}, "round": 1});
        assert_eq!(StateHash::compute(&a), StateHash::compute(&b));
    }

    #[test]
    fn test_state_hash_sensitive_to_values() {
        let a = json!({"round": 1});
        let b = json!({"round": 2});
        assert_ne!(StateHash::compute(&a), StateHash::compute(&b));
    }
}
