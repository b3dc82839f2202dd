//! # Stamped Variables
//!
//! The stamped capability ties a variable to a point in time and an
//! originating device. The identity of a stamped variable is a pure function
//! of (kind, timestamp, device), never of its values, so two independently
//! constructed variables for the same quantity at the same instant from the
//! same device share one identifier.

use crate::identity::generate_stamped;
use crate::time::Timestamp;
use crate::types::Identifier;
use crate::variable::{FixedSizeVariable, Variable, VariableKind};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::marker::PhantomData;

/// Read access to the (timestamp, device) key of a variable.
///
/// Both values are fixed at construction.
pub trait Stamped {
    fn timestamp(&self) -> Timestamp;

    fn device_id(&self) -> Identifier;
}

/// The (timestamp, device) pair identifying a sampled quantity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct StampedKey {
    pub stamp: Timestamp,
    pub device: Identifier,
}

impl StampedKey {
    #[must_use]
    pub const fn new(stamp: Timestamp, device: Identifier) -> Self {
        Self { stamp, device }
    }

    /// The content-derived identifier of the given kind at this key.
    #[must_use]
    pub fn identifier(&self, type_name: &str) -> Identifier {
        generate_stamped(type_name, self.stamp, self.device)
    }
}

impl Stamped for StampedKey {
    fn timestamp(&self) -> Timestamp {
        self.stamp
    }

    fn device_id(&self) -> Identifier {
        self.device
    }
}

/// A fixed-size variable keyed by (timestamp, device).
#[derive(Debug, Clone, PartialEq)]
pub struct StampedVariable<K: VariableKind, const N: usize> {
    id: Identifier,
    key: StampedKey,
    values: FixedSizeVariable<N>,
    kind: PhantomData<K>,
}

impl<K: VariableKind, const N: usize> StampedVariable<K, N> {
    const LAYOUT_MATCHES: () = assert!(K::COMPONENTS.len() == N);

    /// Number of scalars, known at compile time.
    pub const SIZE: usize = N;

    /// Create a zero-valued variable. Pass `Identifier::NIL` when there is
    /// only one device.
    #[must_use]
    pub fn new(stamp: Timestamp, device: Identifier) -> Self {
        let () = Self::LAYOUT_MATCHES;
        let key = StampedKey::new(stamp, device);
        Self {
            id: key.identifier(K::TYPE_NAME),
            key,
            values: FixedSizeVariable::new(),
            kind: PhantomData,
        }
    }

    /// Create a variable with initial values.
    #[must_use]
    pub fn with_values(stamp: Timestamp, device: Identifier, values: [f64; N]) -> Self {
        let mut variable = Self::new(stamp, device);
        variable.values = FixedSizeVariable::from_array(values);
        variable
    }

    #[must_use]
    pub fn key(&self) -> StampedKey {
        self.key
    }

    #[must_use]
    pub fn values(&self) -> &FixedSizeVariable<N> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut FixedSizeVariable<N> {
        &mut self.values
    }
}

impl<K: VariableKind, const N: usize> Stamped for StampedVariable<K, N> {
    fn timestamp(&self) -> Timestamp {
        self.key.stamp
    }

    fn device_id(&self) -> Identifier {
        self.key.device
    }
}

impl<K: VariableKind, const N: usize> Variable for StampedVariable<K, N> {
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

    fn as_stamped(&self) -> Option<&dyn Stamped> {
        Some(&self.key)
    }

    fn clone_variable(&self) -> Box<dyn Variable> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::device_id;
    use crate::variables::{
        AccelerationAngular2DStamped, Position2DStamped, VelocityAngular2DStamped,
    };

    #[test]
    fn identity_ignores_values() {
        let stamp = Timestamp::new(3, 0);
        let a = Position2DStamped::with_values(stamp, Identifier::NIL, [1.0, 2.0]);
        let b = Position2DStamped::new(stamp, Identifier::NIL);
        assert_eq!(a.identifier(), b.identifier());
        assert!(a.identifier().is_deterministic());
    }

    #[test]
    fn identity_matches_generator() {
        let stamp = Timestamp::new(3, 7);
        let device = device_id("base");
        let variable = Position2DStamped::new(stamp, device);
        assert_eq!(
            variable.identifier(),
            generate_stamped("strand::Position2DStamped", stamp, device)
        );
    }

    #[test]
    fn kinds_with_equal_layouts_do_not_collide() {
        let stamp = Timestamp::new(3, 0);
        let accel = AccelerationAngular2DStamped::new(stamp, Identifier::NIL);
        let velocity = VelocityAngular2DStamped::new(stamp, Identifier::NIL);
        assert_ne!(accel.identifier(), velocity.identifier());
    }

    #[test]
    fn stamped_view_exposes_key() {
        let stamp = Timestamp::new(8, 0);
        let device = device_id("lidar");
        let variable = Position2DStamped::new(stamp, device);

        let stamped = variable.as_stamped().expect("stamped");
        assert_eq!(stamped.timestamp(), stamp);
        assert_eq!(stamped.device_id(), device);
        assert_eq!(variable.key(), StampedKey::new(stamp, device));
    }

    #[test]
    fn print_includes_stamp_and_device() {
        let variable = Position2DStamped::new(Timestamp::new(2, 0), Identifier::NIL);
        let mut out = String::new();
        variable.print(&mut out).expect("print");
        assert!(out.contains("stamp: 2.000000000"));
        assert!(out.contains("device: 00000000-0000-0000-0000-000000000000"));
    }
}
