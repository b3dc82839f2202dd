//! # Innate Primitives
//!
//! Hardcoded constants for the strand core.
//!
//! These values are compiled into the binary and are part of the identity
//! contract: changing any of them changes every content-derived identifier.

use uuid::Uuid;

/// Root namespace for all content-derived identifiers.
///
/// Each discriminator (variable kind, device name scope) is first hashed under
/// this namespace to obtain its own namespace. Identifiers built by other
/// UUID-v5 users with the same field bytes therefore never coincide with ours.
pub const ROOT_NAMESPACE: Uuid = Uuid::from_u128(0x5c1d_7a0e_93b4_4f62_8a1e_0d2b_6c47_e915);

/// Discriminator used when deriving device identifiers from device names.
pub const DEVICE_DISCRIMINATOR: &str = "strand::Device";

/// Prefix shared by every stable kind name.
pub const TYPE_NAME_PREFIX: &str = "strand::";

/// Width, in bytes, of the big-endian length prefix written before each
/// identity field.
///
/// Length-prefixing keeps `("ab", "c")` and `("a", "bc")` distinct.
pub const FIELD_LENGTH_PREFIX: usize = 4;

/// Largest per-component difference at which two variables sharing an
/// identifier are still considered to hold the same values.
pub const VALUE_MATCH_TOLERANCE: f64 = 1e-9;

/// Nanoseconds per second, the normalisation bound for timestamps.
pub const NANOS_PER_SEC: u32 = 1_000_000_000;
