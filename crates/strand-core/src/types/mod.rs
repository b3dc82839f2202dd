//! # Core Type Definitions
//!
//! This module contains the shared types of the strand core:
//! - The graph identifier (`Identifier`)
//! - Error types (`StrandError`)
//!
//! ## Identity Guarantees
//!
//! `Identifier` is a fixed-width 128-bit value that:
//! - Implements `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Compares equal across processes when built from the same inputs
//! - Encodes its generation mode in the UUID version nibble

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::{Uuid, Version};

// =============================================================================
// IDENTIFIER
// =============================================================================

/// Opaque identifier for variables, constraints and devices.
///
/// Content-derived identifiers carry UUID version 5, random identifiers carry
/// version 4. The two generation modes therefore never produce equal values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    /// The all-zero identifier. Used as the default device.
    pub const NIL: Self = Self(Uuid::nil());

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an identifier from its raw big-endian bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The raw big-endian bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// True if this identifier was derived from content.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.0.get_version() == Some(Version::Sha1)
    }

    /// True if this identifier was drawn from a random source.
    #[must_use]
    pub fn is_random(&self) -> bool {
        self.0.get_version() == Some(Version::Random)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for Identifier {
    type Err = StrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| StrandError::InvalidIdentifier(format!("'{}': {}", s, e)))
    }
}

impl From<Uuid> for Identifier {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the strand core.
///
/// - Construction-time rejection: malformed arguments never yield an instance
/// - Graph contract violations are reported, never silently applied
/// - No I/O originates in the core; `Io` and `Config` serve the app layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrandError {
    /// A constraint was built without any endpoint variables.
    #[error("Constraint requires at least one variable")]
    EmptyVariableList,

    /// A vector or matrix argument has the wrong number of elements.
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A covariance matrix is not symmetric positive definite.
    #[error("Covariance is not symmetric positive definite")]
    InvalidCovariance,

    /// A scalar parameter is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A kind name is not registered.
    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    /// A string could not be parsed as an identifier.
    #[error("Invalid identifier {0}")]
    InvalidIdentifier(String),

    /// A variable with this identifier is already present.
    #[error("Variable already exists: {0}")]
    DuplicateVariable(Identifier),

    /// A constraint with this identifier is already present.
    #[error("Constraint already exists: {0}")]
    DuplicateConstraint(Identifier),

    /// The requested variable was not found.
    #[error("Variable not found: {0}")]
    VariableNotFound(Identifier),

    /// The requested constraint was not found.
    #[error("Constraint not found: {0}")]
    ConstraintNotFound(Identifier),

    /// A variable cannot be removed while constraints still reference it.
    #[error("Variable {variable} is still used by {count} constraint(s)")]
    VariableInUse { variable: Identifier, count: usize },

    /// Configuration or scenario content is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_identifier() {
        assert!(Identifier::NIL.is_nil());
        assert_eq!(Identifier::default(), Identifier::NIL);
        assert!(!Identifier::NIL.is_deterministic());
        assert!(!Identifier::NIL.is_random());
    }

    #[test]
    fn display_and_parse_agree() {
        let id = Identifier::from_bytes([0xab; 16]);
        let text = id.to_string();
        let parsed: Identifier = text.parse().expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage() {
        let result = "not-a-uuid".parse::<Identifier>();
        assert!(matches!(result, Err(StrandError::InvalidIdentifier(_))));
    }

    #[test]
    fn identifier_ordering_follows_bytes() {
        let low = Identifier::from_bytes([0; 16]);
        let mut high_bytes = [0; 16];
        high_bytes[0] = 1;
        let high = Identifier::from_bytes(high_bytes);
        assert!(low < high);
    }

    #[test]
    fn version_detection() {
        let v5 = Identifier::from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, b"x"));
        assert!(v5.is_deterministic());
        assert!(!v5.is_random());

        let v4 = Identifier::from_uuid(uuid::Builder::from_random_bytes([7; 16]).into_uuid());
        assert!(v4.is_random());
        assert!(!v4.is_deterministic());
    }
}
