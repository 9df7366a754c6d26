//! Sync-field paths.
//!
//! Fields are declared as dot-separated patterns with `*` wildcards at
//! dynamic container keys (`players.*.position`). A concrete path is a
//! pattern plus one key per wildcard. Mutations may also address below a
//! field instance; the residual segments navigate inside the instance value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Index of a field in its schema's declaration-ordered table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(u16);

impl FieldId {
    /// Create from a raw index
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Get the raw index
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Get as usize for table indexing
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One segment of a path pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// A fixed key
    Key(String),
    /// A dynamic container key
    Wildcard,
}

/// A declared field-path pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathPattern {
    segments: Vec<Segment>,
    raw: String,
}

impl PathPattern {
    /// Parse a dot-separated pattern string
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the string is empty, has empty segments, or
    /// starts with a wildcard (the root container must be named).
    pub fn parse(pattern: &str) -> CoreResult<Self> {
        if pattern.is_empty() {
            return Err(CoreError::InvalidPath {
                path: pattern.to_string(),
                reason: "empty pattern".to_string(),
            });
        }
        let mut segments = Vec::new();
        for part in pattern.split('.') {
            match part {
                "" => {
                    return Err(CoreError::InvalidPath {
                        path: pattern.to_string(),
                        reason: "empty segment".to_string(),
                    })
                }
                "*" => segments.push(Segment::Wildcard),
                key => segments.push(Segment::Key(key.to_string())),
            }
        }
        if matches!(segments[0], Segment::Wildcard) {
            return Err(CoreError::InvalidPath {
                path: pattern.to_string(),
                reason: "pattern must not start with a wildcard".to_string(),
            });
        }
        Ok(Self {
            segments,
            raw: pattern.to_string(),
        })
    }

    /// The pattern string as declared
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The pattern segments
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of wildcards (dynamic keys) in the pattern
    #[must_use]
    pub fn wildcard_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Wildcard))
            .count()
    }

    /// Render the pattern with concrete keys substituted for wildcards
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` if the key count does not match the wildcard
    /// count.
    pub fn render(&self, keys: &[String]) -> CoreResult<String> {
        if keys.len() != self.wildcard_count() {
            return Err(CoreError::InvalidPath {
                path: self.raw.clone(),
                reason: format!(
                    "expected {} dynamic keys, got {}",
                    self.wildcard_count(),
                    keys.len()
                ),
            });
        }
        let mut out = String::new();
        let mut next_key = keys.iter();
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match seg {
                Segment::Key(k) => out.push_str(k),
                // key count already checked
                Segment::Wildcard => out.push_str(next_key.next().map_or("", |k| k.as_str())),
            }
        }
        Ok(out)
    }

    /// Match a concrete dotted path against this pattern.
    ///
    /// The pattern must match a prefix of `path`; residual segments (if any)
    /// address inside the field instance. Returns `None` when the path does
    /// not reach through every pattern segment or a fixed key differs.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.len() < self.segments.len() {
            return None;
        }
        let mut keys = Vec::new();
        for (seg, part) in self.segments.iter().zip(parts.iter()) {
            match seg {
                Segment::Key(k) if k == part => {}
                Segment::Key(_) => return None,
                Segment::Wildcard => keys.push((*part).to_string()),
            }
        }
        let residual = parts[self.segments.len()..]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        Some(PathMatch { keys, residual })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Result of matching a concrete path against a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// One key per wildcard, in pattern order
    pub keys: Vec<String>,
    /// Segments below the field instance, possibly empty
    pub residual: Vec<String>,
}

/// A concrete, per-instance address of a sync field
///
/// Identifies one projected snapshot entry: the declared field plus one key
/// per wildcard in its pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConcretePath {
    /// The declared field
    pub field: FieldId,
    /// One key per wildcard, in pattern order
    pub keys: Vec<String>,
}

impl ConcretePath {
    /// Create a concrete path
    #[must_use]
    pub fn new(field: FieldId, keys: Vec<String>) -> Self {
        Self { field, keys }
    }

    /// Create a concrete path for a field with no dynamic keys
    #[must_use]
    pub fn scalar(field: FieldId) -> Self {
        Self {
            field,
            keys: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let p = PathPattern::parse("round").unwrap();
        assert_eq!(p.wildcard_count(), 0);
        assert_eq!(p.as_str(), "round");
    }

    #[test]
    fn test_parse_wildcards() {
        let p = PathPattern::parse("players.*.position").unwrap();
        assert_eq!(p.wildcard_count(), 1);
        assert_eq!(p.segments().len(), 3);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(PathPattern::parse("").is_err());
        assert!(PathPattern::parse("a..b").is_err());
        assert!(PathPattern::parse("*.x").is_err());
    }

    #[test]
    fn test_render() {
        let p = PathPattern::parse("players.*.items.*").unwrap();
        let s = p
            .render(&["alice".to_string(), "sword".to_string()])
            .unwrap();
        assert_eq!(s, "players.alice.items.sword");
    }

    #[test]
    fn test_render_wrong_arity() {
        let p = PathPattern::parse("hands.*").unwrap();
        assert!(p.render(&[]).is_err());
    }

    #[test]
    fn test_match_exact() {
        let p = PathPattern::parse("hands.*").unwrap();
        let m = p.match_path("hands.A").unwrap();
        assert_eq!(m.keys, vec!["A".to_string()]);
        assert!(m.residual.is_empty());
    }

    #[test]
    fn test_match_residual() {
        let p = PathPattern::parse("players.*.position").unwrap();
        let m = p.match_path("players.alice.position.x").unwrap();
        assert_eq!(m.keys, vec!["alice".to_string()]);
        assert_eq!(m.residual, vec!["x".to_string()]);
    }

    #[test]
    fn test_match_rejects_short_path() {
        let p = PathPattern::parse("players.*.position").unwrap();
        assert!(p.match_path("players.alice").is_none());
    }

    #[test]
    fn test_match_rejects_wrong_key() {
        let p = PathPattern::parse("round").unwrap();
        assert!(p.match_path("score").is_none());
    }

    #[test]
    fn test_concrete_path_identity() {
        let a = ConcretePath::new(FieldId::from_raw(1), vec!["A".to_string()]);
        let b = ConcretePath::new(FieldId::from_raw(1), vec!["A".to_string()]);
        let c = ConcretePath::new(FieldId::from_raw(1), vec!["B".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
