//! Core error types for MERIDIAN.SYNC.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Schema or policy misdeclaration. Fatal at startup.
    Configuration { reason: String },

    /// A field path string could not be parsed
    InvalidPath { path: String, reason: String },

    /// A concrete path matched no declared sync field
    UnknownField { path: String },

    /// A mutation violated the declared schema
    SchemaViolation { path: String, reason: String },

    /// Two field patterns hash to the same 32-bit value
    HashCollision { first: String, second: String },

    /// A schema contract did not match the running schema
    ContractMismatch { reason: String },

    /// Internal error (for unexpected conditions)
    Internal { message: String },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "Configuration error: {}", reason),
            Self::InvalidPath { path, reason } => {
                write!(f, "Invalid path {}: {}", path, reason)
            }
            Self::UnknownField { path } => write!(f, "No sync field matches path: {}", path),
            Self::SchemaViolation { path, reason } => {
                write!(f, "Schema violation at {}: {}", path, reason)
            }
            Self::HashCollision { first, second } => {
                write!(f, "Path hash collision between {} and {}", first, second)
            }
            Self::ContractMismatch { reason } => {
                write!(f, "Schema contract mismatch: {}", reason)
            }
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::UnknownField {
            path: "hands.A".to_string(),
        };
        assert_eq!(format!("{}", err), "No sync field matches path: hands.A");

        let err = CoreError::Configuration {
            reason: "PerPlayerSlice on scalar".to_string(),
        };
        assert!(format!("{}", err).starts_with("Configuration error"));
    }

    #[test]
    fn test_hash_collision_display() {
        let err = CoreError::HashCollision {
            first: "a.*".to_string(),
            second: "b.*".to_string(),
        };
        let s = format!("{}", err);
        assert!(s.contains("a.*"));
        assert!(s.contains("b.*"));
    }

    #[test]
    fn test_error_equality() {
        let err1 = CoreError::UnknownField {
            path: "x".to_string(),
        };
        let err2 = CoreError::UnknownField {
            path: "x".to_string(),
        };
        assert_eq!(err1, err2);
    }
}
