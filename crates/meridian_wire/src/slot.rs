//! Per-viewer dynamic-key slot tables.
//!
//! Packed encoding replaces repeated dynamic map keys with small integer
//! slots. The sender holds a [`SlotTable`], the receiver a [`SlotReader`];
//! both reset together on every firstSync so a rejoin can never inherit a
//! stale binding. Slots are never reused within a connection epoch.

use indexmap::IndexMap;

use crate::error::ProtocolError;

/// Result of asking the sender-side table for a key's slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRef {
    /// Key was already defined in an earlier frame; reference by slot only
    Existing(u32),
    /// Key is new this frame; the sender must emit a definition token
    Defined(u32),
}

impl SlotRef {
    /// The slot number regardless of definition state
    #[must_use]
    pub fn slot(&self) -> u32 {
        match self {
            SlotRef::Existing(slot) | SlotRef::Defined(slot) => *slot,
        }
    }
}

/// Sender-side slot assignment for one viewer connection
#[derive(Debug, Default)]
pub struct SlotTable {
    by_key: IndexMap<String, u32>,
    next: u32,
}

impl SlotTable {
    /// Creates an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every binding; called when emitting a firstSync
    pub fn reset(&mut self) {
        self.by_key.clear();
        self.next = 0;
    }

    /// Returns the slot for `key`, assigning the next free slot on first use
    pub fn get_or_define(&mut self, key: &str) -> SlotRef {
        if let Some(slot) = self.by_key.get(key) {
            return SlotRef::Existing(*slot);
        }
        let slot = self.next;
        self.next += 1;
        self.by_key.insert(key.to_string(), slot);
        SlotRef::Defined(slot)
    }

    /// Number of keys currently bound
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// True when no keys are bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Receiver-side slot resolution for one viewer connection
#[derive(Debug, Default)]
pub struct SlotReader {
    by_slot: IndexMap<u32, String>,
}

impl SlotReader {
    /// Creates an empty reader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every binding; called when decoding a firstSync
    pub fn reset(&mut self) {
        self.by_slot.clear();
    }

    /// Records a definition token, rejecting rebinds to a different key
    pub fn define(&mut self, slot: u32, key: &str) -> Result<(), ProtocolError> {
        if let Some(existing) = self.by_slot.get(&slot) {
            if existing != key {
                return Err(ProtocolError::SlotRedefined {
                    slot,
                    existing: existing.clone(),
                    incoming: key.to_string(),
                });
            }
            return Ok(());
        }
        self.by_slot.insert(slot, key.to_string());
        Ok(())
    }

    /// Resolves a slot reference back to its key
    pub fn resolve(&self, slot: u32) -> Result<&str, ProtocolError> {
        self.by_slot
            .get(&slot)
            .map(String::as_str)
            .ok_or(ProtocolError::SlotBeforeDefinition(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_use_defines_then_references() {
        let mut table = SlotTable::new();
        assert_eq!(table.get_or_define("alice"), SlotRef::Defined(0));
        assert_eq!(table.get_or_define("bob"), SlotRef::Defined(1));
        assert_eq!(table.get_or_define("alice"), SlotRef::Existing(0));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_slots_are_monotonic_and_never_reused() {
        let mut table = SlotTable::new();
        let mut last = None;
        for key in ["a", "b", "c", "d"] {
            let slot = table.get_or_define(key).slot();
            if let Some(prev) = last {
                assert!(slot > prev);
            }
            last = Some(slot);
        }
    }

    #[test]
    fn test_reset_restarts_numbering() {
        let mut table = SlotTable::new();
        table.get_or_define("alice");
        table.get_or_define("bob");
        table.reset();
        assert!(table.is_empty());
        assert_eq!(table.get_or_define("bob"), SlotRef::Defined(0));
    }

    #[test]
    fn test_reader_roundtrip() {
        let mut reader = SlotReader::new();
        reader.define(0, "alice").unwrap();
        assert_eq!(reader.resolve(0).unwrap(), "alice");
    }

    #[test]
    fn test_reference_before_definition_is_an_error() {
        let reader = SlotReader::new();
        assert_eq!(
            reader.resolve(3).unwrap_err(),
            ProtocolError::SlotBeforeDefinition(3)
        );
    }

    #[test]
    fn test_redefinition_to_same_key_is_idempotent() {
        let mut reader = SlotReader::new();
        reader.define(0, "alice").unwrap();
        reader.define(0, "alice").unwrap();
        assert_eq!(reader.resolve(0).unwrap(), "alice");
    }

    #[test]
    fn test_redefinition_to_different_key_is_rejected() {
        let mut reader = SlotReader::new();
        reader.define(0, "alice").unwrap();
        let err = reader.define(0, "bob").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::SlotRedefined {
                slot: 0,
                existing: "alice".to_string(),
                incoming: "bob".to_string(),
            }
        );
    }
}
