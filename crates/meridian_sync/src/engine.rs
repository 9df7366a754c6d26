//! The sync engine.
//!
//! Per viewer, the engine keeps the last-sent baseline snapshot. A viewer
//! with no baseline gets a full `firstSync`; afterwards each cycle
//! recomputes only candidate fields (dirty-tracked, narrowed to exact
//! changed keys for mapping fields), diffs structurally against the
//! baseline, and replaces only the recomputed portions.
//!
//! Patch emission order is deterministic - field declaration order, then
//! sorted container keys - which both the wire slot assignment and replay
//! hash equality depend on.

use indexmap::IndexMap;
use meridian_core::{ConcretePath, FieldId, Patch, SessionId, Snapshot, StateUpdate};
use std::collections::BTreeSet;

use meridian_schema::{Resolution, Viewer};

use crate::project::project_all;
use crate::tree::{DirtyKeys, StateTree};

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// When false, every cycle recomputes every tracked field
    pub dirty_tracking: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dirty_tracking: true,
        }
    }
}

#[derive(Debug)]
struct ViewerSync {
    viewer: Viewer,
    /// None means firstSync pending
    baseline: Option<Snapshot>,
}

/// Computes per-viewer state updates from the authoritative tree
#[derive(Debug)]
pub struct SyncEngine {
    config: SyncConfig,
    viewers: IndexMap<SessionId, ViewerSync>,
}

impl SyncEngine {
    /// Create an engine
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            viewers: IndexMap::new(),
        }
    }

    /// Register a viewer; its first cycle emits a `firstSync`
    pub fn add_viewer(&mut self, viewer: Viewer) {
        self.viewers.insert(
            viewer.session,
            ViewerSync {
                viewer,
                baseline: None,
            },
        );
    }

    /// Drop a viewer and its baseline
    pub fn remove_viewer(&mut self, session: SessionId) {
        self.viewers.shift_remove(&session);
    }

    /// Whether a session is registered
    #[must_use]
    pub fn has_viewer(&self, session: SessionId) -> bool {
        self.viewers.contains_key(&session)
    }

    /// Registered sessions in join order
    pub fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.viewers.keys().copied()
    }

    /// Run one sync cycle: one update per viewer, then clear the consumed
    /// dirty markers.
    pub fn sync_cycle(&mut self, tree: &mut StateTree) -> IndexMap<SessionId, StateUpdate> {
        let config = &self.config;
        let updates = self
            .viewers
            .iter_mut()
            .map(|(session, vs)| (*session, compute_update(config, vs, tree)))
            .collect();
        tree.clear_dirty();
        updates
    }
}

fn compute_update(config: &SyncConfig, vs: &mut ViewerSync, tree: &StateTree) -> StateUpdate {
    match vs.baseline.as_mut() {
        None => {
            let snapshot = project_all(tree, &vs.viewer);
            let patches = snapshot
                .iter()
                .map(|(path, value)| Patch::set(path.clone(), value.clone()))
                .collect();
            vs.baseline = Some(snapshot);
            StateUpdate::FirstSync(patches)
        }
        Some(baseline) => {
            let mut patches = Vec::new();
            for (field, candidate) in candidates(config, tree) {
                diff_field(tree, &vs.viewer, baseline, field, &candidate, &mut patches);
            }
            if patches.is_empty() {
                StateUpdate::NoChange
            } else {
                StateUpdate::Diff(patches)
            }
        }
    }
}

/// Candidate keys for one field in one cycle
enum Candidate {
    /// Examine the union of current and baseline instances
    All,
    /// Examine exactly these key tuples
    Keys(BTreeSet<Vec<String>>),
}

fn candidates<'a>(
    config: &SyncConfig,
    tree: &'a StateTree,
) -> impl Iterator<Item = (FieldId, Candidate)> + 'a {
    let full = !config.dirty_tracking || tree.dirty().is_all();
    tree.schema()
        .tracked_fields()
        .filter_map(move |(field, _)| {
            if full {
                return Some((field, Candidate::All));
            }
            match tree.dirty().field_keys(field)? {
                DirtyKeys::All => Some((field, Candidate::All)),
                DirtyKeys::Keys(keys) => Some((
                    field,
                    Candidate::Keys(keys.iter().cloned().collect()),
                )),
            }
        })
}

fn diff_field(
    tree: &StateTree,
    viewer: &Viewer,
    baseline: &mut Snapshot,
    field: FieldId,
    candidate: &Candidate,
    patches: &mut Vec<Patch>,
) {
    let Some(decl) = tree.schema().field(field) else {
        return;
    };

    // Deterministic, sorted set of key tuples to re-examine. For mapping
    // fields this diffs per key, never whole-container.
    let key_tuples: BTreeSet<Vec<String>> = match candidate {
        Candidate::Keys(keys) => keys.clone(),
        Candidate::All => {
            let mut set: BTreeSet<Vec<String>> = tree
                .instances(field)
                .into_iter()
                .map(|(keys, _)| keys)
                .collect();
            set.extend(
                baseline
                    .keys()
                    .filter(|p| p.field == field)
                    .map(|p| p.keys.clone()),
            );
            set
        }
    };

    for keys in key_tuples {
        let path = ConcretePath::new(field, keys.clone());
        let projected = tree
            .instance(field, &keys)
            .map(|value| decl.policy.resolve(viewer, &keys, value));
        match projected {
            Some(Resolution::Included(value)) => {
                if baseline.get(&path) != Some(&value) {
                    patches.push(Patch::set(path.clone(), value.clone()));
                    baseline.insert(path, value);
                }
            }
            Some(Resolution::Excluded) | None => {
                if baseline.shift_remove(&path).is_some() {
                    patches.push(Patch::delete(path));
                }
            }
        }
    }
}
