//! # Identity Subsystem
//!
//! Generates identifiers for variables, constraints and devices.
//!
//! Two modes exist:
//! - **Content-derived**: a pure function of a discriminator and field bytes.
//!   Identical inputs give identical identifiers in any process, which is how
//!   independently built variables collapse onto one graph node.
//! - **Random**: drawn from an injected [`RandomSource`]. Used where
//!   semantically identical objects must stay distinct (constraints).
//!
//! Content-derived ids are UUID version 5 and random ids are UUID version 4,
//! so the modes cannot collide with one another.

use crate::primitives::{DEVICE_DISCRIMINATOR, FIELD_LENGTH_PREFIX, ROOT_NAMESPACE};
use crate::time::Timestamp;
use crate::types::Identifier;
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::sync::Arc;
use uuid::{Builder, Uuid};

// =============================================================================
// CONTENT-DERIVED IDENTIFIERS
// =============================================================================

/// Generate a content-derived identifier.
///
/// The discriminator selects a namespace (usually a stable kind name); each
/// field is prefixed with its big-endian `u32` length before hashing, so
/// field boundaries are part of the identity. Pure and total.
#[must_use]
pub fn generate_deterministic(discriminator: &str, fields: &[&[u8]]) -> Identifier {
    let namespace = Uuid::new_v5(&ROOT_NAMESPACE, discriminator.as_bytes());

    let capacity = fields
        .iter()
        .map(|field| field.len().saturating_add(FIELD_LENGTH_PREFIX))
        .sum();
    let mut name = Vec::with_capacity(capacity);
    for field in fields {
        let len = u32::try_from(field.len()).unwrap_or(u32::MAX);
        name.extend_from_slice(&len.to_be_bytes());
        name.extend_from_slice(field);
    }

    Identifier::from_uuid(Uuid::new_v5(&namespace, &name))
}

/// Generate a content-derived identifier from a single string key.
#[must_use]
pub fn generate_from_name(discriminator: &str, name: &str) -> Identifier {
    generate_deterministic(discriminator, &[name.as_bytes()])
}

/// Generate the identifier of a stamped quantity.
///
/// Depends only on (discriminator, timestamp, device); never on state.
#[must_use]
pub fn generate_stamped(discriminator: &str, stamp: Timestamp, device: Identifier) -> Identifier {
    generate_deterministic(discriminator, &[&stamp.to_bytes(), device.as_bytes()])
}

/// Derive a device identifier from a human readable device name.
#[must_use]
pub fn device_id(name: &str) -> Identifier {
    generate_from_name(DEVICE_DISCRIMINATOR, name)
}

// =============================================================================
// RANDOM SOURCES
// =============================================================================

/// Source of entropy for random identifiers.
///
/// Implementations must be safe to share across threads.
pub trait RandomSource: Send + Sync {
    /// Fill `dest` with random bytes.
    fn fill_bytes(&self, dest: &mut [u8]);
}

/// Thread-local, OS-seeded generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomSource;

impl RandomSource for OsRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        rand::rng().fill_bytes(dest);
    }
}

/// Deterministic generator for reproducible runs and tests.
///
/// Two sources built from the same seed yield the same identifier sequence.
pub struct SeededRandomSource {
    rng: Mutex<ChaCha8Rng>,
}

impl SeededRandomSource {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) {
        self.rng.lock().fill_bytes(dest);
    }
}

impl fmt::Debug for SeededRandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededRandomSource").finish_non_exhaustive()
    }
}

// =============================================================================
// GENERATOR
// =============================================================================

/// Handle for generating random identifiers.
///
/// Cheap to clone; clones share the same source. Pass it to every
/// constructor that needs a random identity.
#[derive(Clone)]
pub struct IdGenerator {
    source: Arc<dyn RandomSource>,
}

impl IdGenerator {
    /// Create a generator over the given source.
    #[must_use]
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Create a generator backed by a seeded ChaCha stream.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(SeededRandomSource::new(seed))
    }

    /// Draw a fresh random (version 4) identifier.
    #[must_use]
    pub fn random(&self) -> Identifier {
        let mut bytes = [0u8; 16];
        self.source.fill_bytes(&mut bytes);
        Identifier::from_uuid(Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(OsRandomSource)
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn deterministic_is_pure() {
        let a = generate_deterministic("kind", &[b"field"]);
        let b = generate_deterministic("kind", &[b"field"]);
        assert_eq!(a, b);
        assert!(a.is_deterministic());
    }

    #[test]
    fn discriminator_separates_namespaces() {
        let a = generate_deterministic("kind_a", &[b"field"]);
        let b = generate_deterministic("kind_b", &[b"field"]);
        assert_ne!(a, b);
    }

    #[test]
    fn field_boundaries_are_significant() {
        let a = generate_deterministic("kind", &[b"ab", b"c"]);
        let b = generate_deterministic("kind", &[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn field_encoding_is_big_endian_length_then_bytes() {
        let namespace = Uuid::new_v5(&ROOT_NAMESPACE, b"kind");
        let expected = Uuid::new_v5(&namespace, &[0, 0, 0, 2, b'a', b'b', 0, 0, 0, 1, b'c']);
        assert_eq!(
            generate_deterministic("kind", &[b"ab", b"c"]),
            Identifier::from_uuid(expected)
        );
    }

    #[test]
    fn stamped_depends_on_stamp_and_device() {
        let stamp = Timestamp::new(10, 0);
        let device = device_id("left_wheel");

        let base = generate_stamped("kind", stamp, Identifier::NIL);
        assert_eq!(base, generate_stamped("kind", stamp, Identifier::NIL));
        assert_ne!(base, generate_stamped("kind", Timestamp::new(10, 1), Identifier::NIL));
        assert_ne!(base, generate_stamped("kind", stamp, device));
    }

    #[test]
    fn device_ids_are_stable() {
        assert_eq!(device_id("imu"), device_id("imu"));
        assert_ne!(device_id("imu"), device_id("gps"));
    }

    #[test]
    fn random_ids_are_version_four_and_distinct() {
        let ids = IdGenerator::default();
        let drawn: BTreeSet<_> = (0..256).map(|_| ids.random()).collect();
        assert_eq!(drawn.len(), 256);
        assert!(drawn.iter().all(Identifier::is_random));
    }

    #[test]
    fn seeded_generators_replay() {
        let a = IdGenerator::seeded(42);
        let b = IdGenerator::seeded(42);
        for _ in 0..8 {
            assert_eq!(a.random(), b.random());
        }
        assert_ne!(IdGenerator::seeded(1).random(), IdGenerator::seeded(2).random());
    }

    #[test]
    fn cloned_generators_share_the_stream() {
        let a = IdGenerator::seeded(7);
        let b = a.clone();
        assert_ne!(a.random(), b.random());
    }

    #[test]
    fn random_never_matches_deterministic() {
        let ids = IdGenerator::seeded(3);
        let content = generate_from_name("kind", "name");
        for _ in 0..64 {
            let id = ids.random();
            assert_ne!(id, content);
            assert_ne!(id.is_random(), content.is_random());
        }
    }

    #[test]
    fn shared_generator_is_collision_free_across_threads() {
        let ids = IdGenerator::seeded(17);
        let drawn: Vec<Vec<Identifier>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| (0..500).map(|_| ids.random()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("worker"))
                .collect()
        });

        let unique: BTreeSet<Identifier> = drawn.iter().flatten().copied().collect();
        assert_eq!(unique.len(), 4 * 500);
        assert!(unique.iter().all(Identifier::is_random));
    }
}
