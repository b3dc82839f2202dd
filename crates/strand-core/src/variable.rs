//! # Variable Abstraction
//!
//! A variable is a fixed-size vector of `f64` scalars plus an immutable
//! [`Identifier`]. The optimizer reads and overwrites the scalars in place;
//! nothing ever resizes them or changes the identity.
//!
//! Concrete kinds are built by composition rather than inheritance:
//! - [`FixedSizeVariable`] owns the scalar buffer, parameterised by length
//! - a [`VariableKind`] marker supplies the stable name and component layout
//! - [`StampedVariable`](crate::stamped::StampedVariable) adds a
//!   (timestamp, device) key and a content-derived identity
//! - [`UnstampedVariable`] uses a random identity instead

use crate::identity::IdGenerator;
use crate::stamped::Stamped;
use crate::types::Identifier;
use std::any::Any;
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

// =============================================================================
// VARIABLE KIND
// =============================================================================

/// Compile-time description of one variable kind.
///
/// Every name here is assigned by hand and is stable across builds. The
/// constraint names are the kind names of the constraint families
/// instantiated over this variable kind.
pub trait VariableKind: fmt::Debug + Clone + Copy + Send + Sync + 'static {
    /// Stable, globally unique kind name.
    const TYPE_NAME: &'static str;

    /// Component names, in buffer order. Its length is the variable size.
    const COMPONENTS: &'static [&'static str];

    /// Indices of components that are angles (compared modulo 2π).
    const ANGULAR: &'static [usize] = &[];

    /// Kind name of the absolute (prior) constraint over this variable.
    const ABSOLUTE_CONSTRAINT: &'static str;

    /// Kind name of the relative constraint between two such variables.
    const RELATIVE_CONSTRAINT: &'static str;
}

// =============================================================================
// VARIABLE TRAIT
// =============================================================================

/// The interface shared by every variable kind.
///
/// Object safe: external graphs store `Box<dyn Variable>`.
pub trait Variable: fmt::Debug + Send + Sync {
    /// The immutable identity of this variable.
    fn identifier(&self) -> Identifier;

    /// Stable kind name.
    fn type_name(&self) -> &'static str;

    /// The scalar buffer, read only.
    fn data(&self) -> &[f64];

    /// The scalar buffer, writable in place. Its length never changes.
    fn data_mut(&mut self) -> &mut [f64];

    /// Component names, in buffer order.
    fn component_names(&self) -> &'static [&'static str];

    /// Number of scalars. Fixed per kind.
    fn size(&self) -> usize {
        self.data().len()
    }

    /// Whether the component at `index` is an angle.
    fn is_angular(&self, _index: usize) -> bool {
        false
    }

    /// The stamped key, for kinds that have one.
    fn as_stamped(&self) -> Option<&dyn Stamped> {
        None
    }

    /// Deep copy: identical identity and values, independent storage.
    fn clone_variable(&self) -> Box<dyn Variable>;

    /// Write a human-readable description. Deterministic for a given state.
    fn print(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(sink, "{}:", self.type_name())?;
        writeln!(sink, "  uuid: {}", self.identifier())?;
        if let Some(stamped) = self.as_stamped() {
            writeln!(sink, "  stamp: {}", stamped.timestamp())?;
            writeln!(sink, "  device: {}", stamped.device_id())?;
        }
        writeln!(sink, "  size: {}", self.size())?;
        writeln!(sink, "  data:")?;
        for (name, value) in self.component_names().iter().zip(self.data()) {
            writeln!(sink, "  - {}: {}", name, value)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Variable> {
    fn clone(&self) -> Self {
        self.clone_variable()
    }
}

impl fmt::Display for dyn Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f)
    }
}

// =============================================================================
// FIXED SIZE BUFFER
// =============================================================================

/// A zero-initialised buffer of exactly `N` scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSizeVariable<const N: usize> {
    data: [f64; N],
}

impl<const N: usize> FixedSizeVariable<N> {
    /// Number of scalars, known at compile time.
    pub const SIZE: usize = N;

    #[must_use]
    pub const fn new() -> Self {
        Self { data: [0.0; N] }
    }

    #[must_use]
    pub const fn from_array(data: [f64; N]) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.data.get(index).copied()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut f64> {
        self.data.get_mut(index)
    }
}

impl<const N: usize> Default for FixedSizeVariable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Index<usize> for FixedSizeVariable<N> {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.data[index]
    }
}

impl<const N: usize> IndexMut<usize> for FixedSizeVariable<N> {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.data[index]
    }
}

// =============================================================================
// UNSTAMPED VARIABLE
// =============================================================================

/// A variable without a time/device key.
///
/// Its identity is random, so two instances never deduplicate. Use it for
/// quantities where legitimate duplicates exist, such as landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct UnstampedVariable<K: VariableKind, const N: usize> {
    id: Identifier,
    values: FixedSizeVariable<N>,
    kind: PhantomData<K>,
}

impl<K: VariableKind, const N: usize> UnstampedVariable<K, N> {
    const LAYOUT_MATCHES: () = assert!(K::COMPONENTS.len() == N);

    /// Create a zero-valued variable with a fresh random identity.
    #[must_use]
    pub fn new(ids: &IdGenerator) -> Self {
        Self::with_id(ids.random())
    }

    /// Recreate a variable with a known identity (e.g. when loading).
    #[must_use]
    pub fn with_id(id: Identifier) -> Self {
        let () = Self::LAYOUT_MATCHES;
        Self {
            id,
            values: FixedSizeVariable::new(),
            kind: PhantomData,
        }
    }

    #[must_use]
    pub fn values(&self) -> &FixedSizeVariable<N> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut FixedSizeVariable<N> {
        &mut self.values
    }
}

impl<K: VariableKind, const N: usize> Variable for UnstampedVariable<K, N> {
    fn identifier(&self) -> Identifier {
        self.id
    }

    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn data(&self) -> &[f64] {
        self.values.as_slice()
    }

    fn data_mut(&mut self) -> &mut [f64] {
        self.values.as_mut_slice()
    }

    fn component_names(&self) -> &'static [&'static str] {
        K::COMPONENTS
    }

    fn size(&self) -> usize {
        N
    }

    fn is_angular(&self, index: usize) -> bool {
        K::ANGULAR.contains(&index)
    }

    fn clone_variable(&self) -> Box<dyn Variable> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// COMPARISON HELPERS
// =============================================================================

/// Wrap an angle into (−π, π].
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { PI } else { wrapped }
}

/// Compare two variables component-wise within `tolerance`.
///
/// Kinds and sizes must agree. Angular components are compared through
/// their wrapped difference, so `π` and `−π` match.
#[must_use]
pub fn values_match(a: &dyn Variable, b: &dyn Variable, tolerance: f64) -> bool {
    if a.type_name() != b.type_name() || a.size() != b.size() {
        return false;
    }
    a.data()
        .iter()
        .zip(b.data())
        .enumerate()
        .all(|(index, (x, y))| {
            let diff = if a.is_angular(index) {
                wrap_angle(x - y)
            } else {
                x - y
            };
            diff.abs() <= tolerance
        })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{Orientation2DStamped, Point2DLandmark, Position2DStamped};
    use crate::Timestamp;
    use approx::assert_relative_eq;

    #[test]
    fn fixed_size_buffer_starts_at_zero() {
        let buffer = FixedSizeVariable::<3>::new();
        assert_eq!(buffer.as_slice(), &[0.0, 0.0, 0.0]);
        assert_eq!(FixedSizeVariable::<3>::SIZE, 3);
    }

    #[test]
    fn fixed_size_buffer_indexing() {
        let mut buffer = FixedSizeVariable::<2>::new();
        buffer[1] = 4.5;
        assert_eq!(buffer[1], 4.5);
        assert_eq!(buffer.get(1), Some(4.5));
        assert_eq!(buffer.get(2), None);
        assert!(buffer.get_mut(5).is_none());
    }

    #[test]
    fn unstamped_variables_never_share_identity() {
        let ids = IdGenerator::seeded(11);
        let a = Point2DLandmark::new(&ids);
        let b = Point2DLandmark::new(&ids);
        assert_ne!(a.identifier(), b.identifier());
        assert!(a.identifier().is_random());
        assert!(a.as_stamped().is_none());
    }

    #[test]
    fn boxed_clone_is_independent() {
        let ids = IdGenerator::seeded(5);
        let mut original: Box<dyn Variable> = Box::new(Point2DLandmark::new(&ids));
        original.data_mut()[0] = 1.0;

        let mut copy = original.clone();
        copy.data_mut()[0] = 2.0;

        assert_eq!(copy.identifier(), original.identifier());
        assert_eq!(original.data()[0], 1.0);
        assert_eq!(copy.data()[0], 2.0);
    }

    #[test]
    fn wrap_angle_range() {
        assert_relative_eq!(wrap_angle(0.0), 0.0);
        assert_relative_eq!(wrap_angle(PI), PI);
        assert_relative_eq!(wrap_angle(-PI), PI);
        assert_relative_eq!(wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-5.0 * PI), PI, epsilon = 1e-12);
    }

    #[test]
    fn values_match_wraps_angles() {
        let stamp = Timestamp::new(1, 0);
        let mut a = Orientation2DStamped::new(stamp, Identifier::NIL);
        let mut b = Orientation2DStamped::new(stamp, Identifier::NIL);
        *a.yaw_mut() = PI - 1e-9;
        *b.yaw_mut() = -PI + 1e-9;
        assert!(values_match(&a, &b, 1e-6));
    }

    #[test]
    fn values_match_rejects_different_kinds() {
        let stamp = Timestamp::new(1, 0);
        let a = Orientation2DStamped::new(stamp, Identifier::NIL);
        let b = Position2DStamped::new(stamp, Identifier::NIL);
        assert!(!values_match(&a, &b, 1.0));
    }

    #[test]
    fn print_lists_components() {
        let ids = IdGenerator::seeded(1);
        let mut landmark = Point2DLandmark::new(&ids);
        *landmark.x_mut() = 1.5;

        let mut out = String::new();
        landmark.print(&mut out).expect("print");
        assert!(out.starts_with("strand::Point2DLandmark:"));
        assert!(out.contains("  - x: 1.5"));
        assert!(out.contains("  - y: 0"));
        assert!(!out.contains("stamp"));
    }
}
