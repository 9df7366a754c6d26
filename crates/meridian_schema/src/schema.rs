//! Schema registration and the build-time path-hash table.
//!
//! The schema is built once at startup; every misdeclaration is a fatal
//! configuration error there, never a runtime condition.

use indexmap::IndexMap;
use meridian_core::{
    CoreError, CoreResult, FieldId, PathHash, PathMatch, SchemaVersion, Segment,
};

use crate::contract::{FieldContract, SchemaContract};
use crate::field::FieldDecl;
use crate::policy::PolicyKind;

/// An immutable, validated schema
#[derive(Debug)]
pub struct Schema {
    fields: Vec<FieldDecl>,
    /// Per-field path hash; `None` for `Internal` fields, which are
    /// excluded from sync metadata entirely
    hashes: Vec<Option<PathHash>>,
    by_hash: IndexMap<PathHash, FieldId>,
    version: SchemaVersion,
}

impl Schema {
    /// Start building a schema
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Number of declared fields
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Look up a field declaration
    #[must_use]
    pub fn field(&self, id: FieldId) -> Option<&FieldDecl> {
        self.fields.get(id.index())
    }

    /// Iterate fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &FieldDecl)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| (FieldId::from_raw(i as u16), f))
    }

    /// Iterate sync-tracked fields (everything but `Internal`) in
    /// declaration order
    pub fn tracked_fields(&self) -> impl Iterator<Item = (FieldId, &FieldDecl)> {
        self.fields().filter(|(_, f)| f.policy.is_tracked())
    }

    /// The path hash of a field, `None` for `Internal` fields
    #[must_use]
    pub fn path_hash(&self, id: FieldId) -> Option<PathHash> {
        self.hashes.get(id.index()).copied().flatten()
    }

    /// Resolve a wire path hash back to its field
    #[must_use]
    pub fn field_by_hash(&self, hash: PathHash) -> Option<FieldId> {
        self.by_hash.get(&hash).copied()
    }

    /// Match a concrete dotted path against the declared patterns
    ///
    /// At most one field can match: overlapping patterns are rejected at
    /// build time.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(FieldId, PathMatch)> {
        self.fields()
            .find_map(|(id, f)| f.pattern.match_path(path).map(|m| (id, m)))
    }

    /// Schema version: max `since` over all fields
    #[must_use]
    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Export the shared contract for the client side
    #[must_use]
    pub fn contract(&self) -> SchemaContract {
        let fields = self
            .fields()
            .filter(|(_, f)| f.policy.is_tracked())
            .map(|(id, f)| FieldContract {
                pattern: f.pattern.as_str().to_string(),
                path_hash: self.path_hash(id).map_or(0, |h| h.as_u32()),
                since: f.since,
                policy: f.policy.kind(),
            })
            .collect();
        SchemaContract::new(self.version.as_u32(), fields)
    }

    /// Verify a contract loaded at startup against this schema
    ///
    /// # Errors
    ///
    /// Returns `ContractMismatch` naming the first divergence.
    pub fn verify_contract(&self, contract: &SchemaContract) -> CoreResult<()> {
        let ours = self.contract();
        if contract.version != ours.version {
            return Err(CoreError::ContractMismatch {
                reason: format!(
                    "schema version {} != contract version {}",
                    ours.version, contract.version
                ),
            });
        }
        if contract.fields.len() != ours.fields.len() {
            return Err(CoreError::ContractMismatch {
                reason: format!(
                    "{} sync fields declared, contract lists {}",
                    ours.fields.len(),
                    contract.fields.len()
                ),
            });
        }
        for (a, b) in ours.fields.iter().zip(contract.fields.iter()) {
            if a != b {
                return Err(CoreError::ContractMismatch {
                    reason: format!("field {} differs from contract {}", a.pattern, b.pattern),
                });
            }
        }
        Ok(())
    }
}

/// Builder accumulating field declarations, validated on `build`
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDecl>,
}

impl SchemaBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a field declaration
    #[must_use]
    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    /// Validate and build the schema
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for any misdeclaration:
    /// `PerPlayerSlice` on a non-mapping field, duplicate or overlapping
    /// patterns, or a path-hash collision.
    pub fn build(self) -> CoreResult<Schema> {
        if self.fields.len() > usize::from(u16::MAX) {
            return Err(CoreError::Configuration {
                reason: "too many fields".to_string(),
            });
        }

        for field in &self.fields {
            if field.policy.kind() == PolicyKind::PerPlayerSlice && !field.is_mapping() {
                return Err(CoreError::Configuration {
                    reason: format!(
                        "PerPlayerSlice field {} must be a mapping keyed by player id",
                        field.pattern
                    ),
                });
            }
        }

        for (i, a) in self.fields.iter().enumerate() {
            for b in &self.fields[i + 1..] {
                if patterns_conflict(a, b) {
                    return Err(CoreError::Configuration {
                        reason: format!(
                            "patterns {} and {} overlap; a concrete path could match both",
                            a.pattern, b.pattern
                        ),
                    });
                }
            }
        }

        let mut hashes = Vec::with_capacity(self.fields.len());
        let mut by_hash: IndexMap<PathHash, FieldId> = IndexMap::new();
        for (i, field) in self.fields.iter().enumerate() {
            if !field.policy.is_tracked() {
                hashes.push(None);
                continue;
            }
            let hash = PathHash::of_pattern(field.pattern.as_str());
            if let Some(existing) = by_hash.insert(hash, FieldId::from_raw(i as u16)) {
                let first = self.fields[existing.index()].pattern.as_str().to_string();
                return Err(CoreError::HashCollision {
                    first,
                    second: field.pattern.as_str().to_string(),
                });
            }
            hashes.push(Some(hash));
        }

        let version = SchemaVersion::from_fields(self.fields.iter().map(|f| f.since));

        Ok(Schema {
            fields: self.fields,
            hashes,
            by_hash,
            version,
        })
    }
}

/// Two patterns conflict when some concrete path could match both: every
/// segment pair up to the shorter length is compatible (equal keys, or
/// either side a wildcard).
fn patterns_conflict(a: &FieldDecl, b: &FieldDecl) -> bool {
    let (sa, sb) = (a.pattern.segments(), b.pattern.segments());
    let shorter = sa.len().min(sb.len());
    sa.iter().zip(sb.iter()).take(shorter).all(|(x, y)| {
        matches!(
            (x, y),
            (Segment::Wildcard, _) | (_, Segment::Wildcard)
        ) || x == y
    })
}
