//! Per-viewer projection.
//!
//! Projection is a pure read of the tree: apply each tracked field's policy
//! to its concrete instances and collect the included values. Policy
//! functions must be total; a panicking policy is a fatal programming error
//! at its declaration site, not a recoverable condition.

use meridian_core::{ConcretePath, Snapshot};
use serde_json::Value;

use meridian_schema::{FieldDecl, Resolution, Viewer};

use crate::tree::StateTree;

/// Project every tracked field for one viewer into a full snapshot.
///
/// Entry order is deterministic: field declaration order, then sorted
/// container keys.
#[must_use]
pub fn project_all(tree: &StateTree, viewer: &Viewer) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for (field, decl) in tree.schema().tracked_fields() {
        for (keys, value) in tree.instances(field) {
            if let Resolution::Included(v) = decl.policy.resolve(viewer, &keys, value) {
                snapshot.insert(ConcretePath::new(field, keys), v);
            }
        }
    }
    snapshot
}

/// Project a single field instance for one viewer
#[must_use]
pub fn project_instance(
    decl: &FieldDecl,
    viewer: &Viewer,
    keys: &[String],
    value: &Value,
) -> Resolution {
    decl.policy.resolve(viewer, keys, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{ClientId, PlayerId, SessionId};
    use meridian_schema::{FieldDecl, Schema, SyncPolicy};
    use serde_json::json;
    use std::sync::Arc;

    fn viewer(player: &str) -> Viewer {
        Viewer::new(PlayerId::new(player), ClientId::new(), SessionId::new())
    }

    fn demo_tree() -> StateTree {
        let schema = Arc::new(
            Schema::builder()
                .field(
                    FieldDecl::new("round", SyncPolicy::Broadcast)
                        .unwrap()
                        .with_default(json!(0)),
                )
                .field(FieldDecl::new("hands.*", SyncPolicy::PerPlayerSlice).unwrap())
                .field(FieldDecl::new("deck", SyncPolicy::ServerOnly).unwrap())
                .build()
                .unwrap(),
        );
        let mut tree = StateTree::new(schema);
        tree.set("hands.A", json!([{"id": 7}])).unwrap();
        tree.set("hands.B", json!([{"id": 9}])).unwrap();
        tree.set("deck", json!([1, 2, 3])).unwrap();
        tree
    }

    #[test]
    fn test_projection_respects_slices() {
        let tree = demo_tree();
        let snap = project_all(&tree, &viewer("A"));

        let rendered: Vec<String> = snap
            .keys()
            .map(|p| {
                let decl = tree.schema().field(p.field).unwrap();
                decl.pattern.render(&p.keys).unwrap()
            })
            .collect();
        assert!(rendered.contains(&"round".to_string()));
        assert!(rendered.contains(&"hands.A".to_string()));
        assert!(!rendered.contains(&"hands.B".to_string()));
    }

    #[test]
    fn test_server_only_never_projected() {
        let tree = demo_tree();
        for player in ["A", "B", "C"] {
            let snap = project_all(&tree, &viewer(player));
            assert!(snap
                .keys()
                .all(|p| tree.schema().field(p.field).unwrap().pattern.as_str() != "deck"));
        }
    }

    #[test]
    fn test_projection_clones_no_aliasing() {
        let mut tree = demo_tree();
        let snap = project_all(&tree, &viewer("A"));
        tree.set("round", json!(99)).unwrap();
        // The snapshot is a copy; later mutation does not leak into it.
        let (_, round_value) = snap
            .iter()
            .find(|(p, _)| tree.schema().field(p.field).unwrap().pattern.as_str() == "round")
            .unwrap();
        assert_eq!(round_value, &json!(0));
    }
}
