//! The authoritative state tree.
//!
//! A JSON object tree addressed through the declared schema. All mutation
//! goes through `set`/`delete`, which record dirty markers; the sync engine
//! consumes and clears them per cycle. Object maps are sorted (BTreeMap), so
//! iteration and canonical bytes are deterministic.

use indexmap::{IndexMap, IndexSet};
use meridian_core::{
    CoreError, CoreResult, FieldId, SchemaVersion, Segment, StateHash,
};
use serde_json::{Map, Value};
use std::sync::Arc;

use meridian_schema::Schema;

/// Which instances of a field changed since the last sync cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyKeys {
    /// The whole field must be recomputed
    All,
    /// Exactly these key tuples changed
    Keys(IndexSet<Vec<String>>),
}

/// First-class change tracker: per field, the exact touched key tuples (or
/// a whole-field marker when key granularity is unavailable)
#[derive(Debug, Default)]
pub struct DirtyTracker {
    fields: IndexMap<FieldId, DirtyKeys>,
    all: bool,
}

impl DirtyTracker {
    /// Mark one instance of a field dirty
    pub fn mark(&mut self, field: FieldId, keys: Vec<String>) {
        match self.fields.entry(field).or_insert_with(|| DirtyKeys::Keys(IndexSet::new())) {
            DirtyKeys::All => {}
            DirtyKeys::Keys(set) => {
                set.insert(keys);
            }
        }
    }

    /// Mark a whole field dirty
    pub fn mark_field(&mut self, field: FieldId) {
        self.fields.insert(field, DirtyKeys::All);
    }

    /// Mark everything dirty (forces full recomputation next cycle)
    pub fn mark_all(&mut self) {
        self.all = true;
    }

    /// Whether everything is marked
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// Whether nothing is marked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.all && self.fields.is_empty()
    }

    /// The changed keys for one field, if it is marked
    #[must_use]
    pub fn field_keys(&self, field: FieldId) -> Option<&DirtyKeys> {
        self.fields.get(&field)
    }

    /// Clear all markers
    pub fn clear(&mut self) {
        self.fields.clear();
        self.all = false;
    }
}

/// The mutable authoritative state of one room
#[derive(Debug)]
pub struct StateTree {
    schema: Arc<Schema>,
    root: Value,
    dirty: DirtyTracker,
}

impl StateTree {
    /// Create a fresh tree: scalar fields are initialized to their declared
    /// defaults, mapping fields start with no instances.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        let mut tree = Self {
            schema,
            root: Value::Object(Map::new()),
            dirty: DirtyTracker::default(),
        };
        tree.init_scalar_defaults(0);
        tree.dirty.clear();
        tree
    }

    /// Rebuild a tree from a persisted snapshot recorded under `version`.
    /// Scalar fields newer than the snapshot are default-initialized; there
    /// is no migration code.
    ///
    /// # Errors
    ///
    /// Returns `SchemaViolation` if the snapshot root is not an object.
    pub fn from_snapshot(
        schema: Arc<Schema>,
        snapshot: Value,
        version: SchemaVersion,
    ) -> CoreResult<Self> {
        if !snapshot.is_object() {
            return Err(CoreError::SchemaViolation {
                path: String::new(),
                reason: "snapshot root must be an object".to_string(),
            });
        }
        let mut tree = Self {
            schema,
            root: snapshot,
            dirty: DirtyTracker::default(),
        };
        tree.init_scalar_defaults(version.as_u32());
        tree.dirty.clear();
        Ok(tree)
    }

    fn init_scalar_defaults(&mut self, loaded_version: u32) {
        let defaults: Vec<(String, Value)> = self
            .schema
            .fields()
            .filter(|(_, f)| f.pattern.wildcard_count() == 0 && f.since > loaded_version)
            .map(|(_, f)| (f.pattern.as_str().to_string(), f.default.clone()))
            .collect();
        for (path, default) in defaults {
            if self.get(&path).is_none() {
                // Declared patterns always parse and match themselves.
                let _ = self.set(&path, default);
            }
        }
    }

    /// The schema this tree is addressed through
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The raw root value (read-only)
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Clone the full tree as an immutable snapshot value
    #[must_use]
    pub fn snapshot_value(&self) -> Value {
        self.root.clone()
    }

    /// 64-bit FNV-1a hash over the canonical bytes of the full tree
    #[must_use]
    pub fn state_hash(&self) -> StateHash {
        StateHash::compute(&self.root)
    }

    /// Set a value at a concrete dotted path.
    ///
    /// The path must match a declared field through every dynamic key;
    /// residual segments navigate inside the instance value, creating
    /// intermediate objects.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` for undeclared paths and `SchemaViolation`
    /// when navigation crosses a non-object value.
    pub fn set(&mut self, path: &str, value: Value) -> CoreResult<()> {
        let (field, keys, residual) = self.locate(path)?;
        let decl = self.schema.field(field).ok_or_else(|| CoreError::Internal {
            message: format!("field table out of sync for {}", path),
        })?;
        let segments: Vec<String> = concrete_segments(decl.pattern.segments(), &keys)
            .into_iter()
            .chain(residual)
            .collect();
        write_path(&mut self.root, path, &segments, value)?;
        self.dirty.mark(field, keys);
        Ok(())
    }

    /// Delete the value at a concrete dotted path.
    ///
    /// Returns whether a value was present. Deleting marks the instance
    /// dirty either way, so a projection recomputes it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` for undeclared paths.
    pub fn delete(&mut self, path: &str) -> CoreResult<bool> {
        let (field, keys, residual) = self.locate(path)?;
        let decl = self.schema.field(field).ok_or_else(|| CoreError::Internal {
            message: format!("field table out of sync for {}", path),
        })?;
        let segments: Vec<String> = concrete_segments(decl.pattern.segments(), &keys)
            .into_iter()
            .chain(residual)
            .collect();
        let removed = remove_path(&mut self.root, &segments);
        self.dirty.mark(field, keys);
        Ok(removed)
    }

    /// Read the value at a concrete dotted path
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut node = &self.root;
        for part in path.split('.') {
            node = node.as_object()?.get(part)?;
        }
        Some(node)
    }

    /// Read one field instance by its dynamic keys
    #[must_use]
    pub fn instance(&self, field: FieldId, keys: &[String]) -> Option<&Value> {
        let decl = self.schema.field(field)?;
        let mut node = &self.root;
        let mut next_key = keys.iter();
        for seg in decl.pattern.segments() {
            let part = match seg {
                Segment::Key(k) => k.as_str(),
                Segment::Wildcard => next_key.next()?.as_str(),
            };
            node = node.as_object()?.get(part)?;
        }
        Some(node)
    }

    /// Enumerate all concrete instances of a field, key tuples in sorted
    /// order (object maps are BTreeMaps)
    #[must_use]
    pub fn instances(&self, field: FieldId) -> Vec<(Vec<String>, &Value)> {
        let Some(decl) = self.schema.field(field) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        collect_instances(&self.root, decl.pattern.segments(), Vec::new(), &mut out);
        out
    }

    /// The change tracker for the current cycle
    #[must_use]
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Force full recomputation on the next sync cycle
    pub fn mark_all_dirty(&mut self) {
        self.dirty.mark_all();
    }

    /// Clear consumed dirty markers (called by the sync cycle)
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    fn locate(&self, path: &str) -> CoreResult<(FieldId, Vec<String>, Vec<String>)> {
        let (field, m) = self
            .schema
            .match_path(path)
            .ok_or_else(|| CoreError::UnknownField {
                path: path.to_string(),
            })?;
        Ok((field, m.keys, m.residual))
    }
}

fn concrete_segments(pattern: &[Segment], keys: &[String]) -> Vec<String> {
    let mut next_key = keys.iter();
    pattern
        .iter()
        .map(|seg| match seg {
            Segment::Key(k) => k.clone(),
            Segment::Wildcard => next_key.next().cloned().unwrap_or_default(),
        })
        .collect()
}

fn write_path(root: &mut Value, full_path: &str, segments: &[String], value: Value) -> CoreResult<()> {
    let mut node = root;
    for seg in &segments[..segments.len() - 1] {
        let obj = node.as_object_mut().ok_or_else(|| CoreError::SchemaViolation {
            path: full_path.to_string(),
            reason: format!("segment {} crosses a non-object value", seg),
        })?;
        node = obj
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    let last = &segments[segments.len() - 1];
    let obj = node.as_object_mut().ok_or_else(|| CoreError::SchemaViolation {
        path: full_path.to_string(),
        reason: format!("segment {} crosses a non-object value", last),
    })?;
    obj.insert(last.clone(), value);
    Ok(())
}

fn remove_path(root: &mut Value, segments: &[String]) -> bool {
    let mut node = root;
    for seg in &segments[..segments.len() - 1] {
        match node.as_object_mut().and_then(|o| o.get_mut(seg)) {
            Some(next) => node = next,
            None => return false,
        }
    }
    node.as_object_mut()
        .and_then(|o| o.remove(&segments[segments.len() - 1]))
        .is_some()
}

fn collect_instances<'a>(
    node: &'a Value,
    pattern: &[Segment],
    keys: Vec<String>,
    out: &mut Vec<(Vec<String>, &'a Value)>,
) {
    match pattern.first() {
        None => out.push((keys, node)),
        Some(Segment::Key(k)) => {
            if let Some(next) = node.as_object().and_then(|o| o.get(k)) {
                collect_instances(next, &pattern[1..], keys, out);
            }
        }
        Some(Segment::Wildcard) => {
            if let Some(obj) = node.as_object() {
                for (key, next) in obj {
                    let mut keys = keys.clone();
                    keys.push(key.clone());
                    collect_instances(next, &pattern[1..], keys, out);
                }
            }
        }
    }
}
