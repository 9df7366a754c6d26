//! Field-level comparison of two state snapshots.
//!
//! Used when the journal carried the snapshot side-channel: a hash mismatch
//! says a tick diverged, the snapshot diff says where.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One dotted path whose value differs between two snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDivergence {
    /// Dotted path from the tree root
    pub path: String,
    /// Value in the recorded snapshot, `None` if absent
    pub recorded: Option<Value>,
    /// Value in the recomputed snapshot, `None` if absent
    pub recomputed: Option<Value>,
}

/// Compare two snapshot values and list every dotted path that differs
///
/// Objects are descended into; arrays and scalars are compared atomically,
/// so a divergence inside an array reports the array's path.
#[must_use]
pub fn diff_values(recorded: &Value, recomputed: &Value) -> Vec<FieldDivergence> {
    let mut out = Vec::new();
    walk("", recorded, recomputed, &mut out);
    out
}

fn walk(prefix: &str, recorded: &Value, recomputed: &Value, out: &mut Vec<FieldDivergence>) {
    match (recorded, recomputed) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, left) in a {
                let path = join(prefix, key);
                match b.get(key) {
                    Some(right) => walk(&path, left, right, out),
                    None => out.push(FieldDivergence {
                        path,
                        recorded: Some(left.clone()),
                        recomputed: None,
                    }),
                }
            }
            for (key, right) in b {
                if !a.contains_key(key) {
                    out.push(FieldDivergence {
                        path: join(prefix, key),
                        recorded: None,
                        recomputed: Some(right.clone()),
                    });
                }
            }
        }
        (left, right) => {
            if left != right {
                out.push(FieldDivergence {
                    path: prefix.to_string(),
                    recorded: Some(left.clone()),
                    recomputed: Some(right.clone()),
                });
            }
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_snapshots_yield_nothing() {
        let snap = json!({"round": 3, "hands": {"A": ["c1"]}});
        assert!(diff_values(&snap, &snap).is_empty());
    }

    #[test]
    fn test_scalar_change_is_localized() {
        let recorded = json!({"round": 3, "hands": {"A": ["c1"]}});
        let recomputed = json!({"round": 4, "hands": {"A": ["c1"]}});

        let diff = diff_values(&recorded, &recomputed);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, "round");
        assert_eq!(diff[0].recorded, Some(json!(3)));
        assert_eq!(diff[0].recomputed, Some(json!(4)));
    }

    #[test]
    fn test_nested_paths_are_dotted() {
        let recorded = json!({"hands": {"A": ["c1"], "B": []}});
        let recomputed = json!({"hands": {"A": ["c1", "c2"], "B": []}});

        let diff = diff_values(&recorded, &recomputed);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, "hands.A");
    }

    #[test]
    fn test_added_and_removed_keys() {
        let recorded = json!({"hands": {"A": []}});
        let recomputed = json!({"hands": {"B": []}});

        let diff = diff_values(&recorded, &recomputed);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff[0].path, "hands.A");
        assert!(diff[0].recomputed.is_none());
        assert_eq!(diff[1].path, "hands.B");
        assert!(diff[1].recorded.is_none());
    }

    #[test]
    fn test_arrays_compare_atomically() {
        let recorded = json!({"deck": [1, 2, 3]});
        let recomputed = json!({"deck": [1, 2]});

        let diff = diff_values(&recorded, &recomputed);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, "deck");
        assert_eq!(diff[0].recorded, Some(json!([1, 2, 3])));
    }
}
