//! # Variable Kinds
//!
//! The concrete variable kinds shipped with the core. Each kind is a marker
//! implementing [`VariableKind`] plus a type alias over
//! [`StampedVariable`] or [`UnstampedVariable`], with named accessors so
//! callers never index raw buffers.

use crate::stamped::StampedVariable;
use crate::variable::{UnstampedVariable, VariableKind};

/// Declare a kind marker with its stable names.
macro_rules! variable_kind {
    (
        $(#[$meta:meta])*
        $kind:ident => $name:literal, [$($component:literal),+ $(,)?]
        $(, angular = [$($angle:literal),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $kind;

        impl VariableKind for $kind {
            const TYPE_NAME: &'static str = concat!("strand::", $name);
            const COMPONENTS: &'static [&'static str] = &[$($component),+];
            $(const ANGULAR: &'static [usize] = &[$($angle),*];)?
            const ABSOLUTE_CONSTRAINT: &'static str =
                concat!("strand::AbsoluteConstraint<", $name, ">");
            const RELATIVE_CONSTRAINT: &'static str =
                concat!("strand::RelativeConstraint<", $name, ">");
        }
    };
}

/// Named index constants and accessors for one concrete variable type.
macro_rules! named_components {
    ($ty:ty { $($index_name:ident, $getter:ident, $setter:ident => $index:literal);+ $(;)? }) => {
        impl $ty {
            $(
                pub const $index_name: usize = $index;

                #[must_use]
                pub fn $getter(&self) -> f64 {
                    self.values()[$index]
                }

                pub fn $setter(&mut self) -> &mut f64 {
                    &mut self.values_mut()[$index]
                }
            )+
        }
    };
}

// =============================================================================
// KIND MARKERS
// =============================================================================

variable_kind! {
    /// Angular acceleration about the vertical axis.
    AccelerationAngular2D => "AccelerationAngular2DStamped", ["yaw"]
}

variable_kind! {
    /// Planar linear acceleration.
    AccelerationLinear2D => "AccelerationLinear2DStamped", ["x", "y"]
}

variable_kind! {
    /// Angular velocity about the vertical axis.
    VelocityAngular2D => "VelocityAngular2DStamped", ["yaw"]
}

variable_kind! {
    /// Planar linear velocity.
    VelocityLinear2D => "VelocityLinear2DStamped", ["x", "y"]
}

variable_kind! {
    /// Heading. The yaw component wraps at ±π.
    Orientation2D => "Orientation2DStamped", ["yaw"], angular = [0]
}

variable_kind! {
    /// Planar position.
    Position2D => "Position2DStamped", ["x", "y"]
}

variable_kind! {
    /// Spatial position.
    Position3D => "Position3DStamped", ["x", "y", "z"]
}

variable_kind! {
    /// A point landmark in the plane, keyed by random identity.
    Point2D => "Point2DLandmark", ["x", "y"]
}

// =============================================================================
// CONCRETE TYPES
// =============================================================================

/// 2D angular acceleration at a timestamp, from a device.
pub type AccelerationAngular2DStamped = StampedVariable<AccelerationAngular2D, 1>;

/// 2D linear acceleration at a timestamp, from a device.
pub type AccelerationLinear2DStamped = StampedVariable<AccelerationLinear2D, 2>;

/// 2D angular velocity at a timestamp, from a device.
pub type VelocityAngular2DStamped = StampedVariable<VelocityAngular2D, 1>;

/// 2D linear velocity at a timestamp, from a device.
pub type VelocityLinear2DStamped = StampedVariable<VelocityLinear2D, 2>;

/// 2D orientation at a timestamp, from a device.
pub type Orientation2DStamped = StampedVariable<Orientation2D, 1>;

/// 2D position at a timestamp, from a device.
pub type Position2DStamped = StampedVariable<Position2D, 2>;

/// 3D position at a timestamp, from a device.
pub type Position3DStamped = StampedVariable<Position3D, 3>;

/// 2D landmark position. Not stamped; identity is random.
pub type Point2DLandmark = UnstampedVariable<Point2D, 2>;

named_components!(AccelerationAngular2DStamped { YAW, yaw, yaw_mut => 0 });
named_components!(AccelerationLinear2DStamped { X, x, x_mut => 0; Y, y, y_mut => 1 });
named_components!(VelocityAngular2DStamped { YAW, yaw, yaw_mut => 0 });
named_components!(VelocityLinear2DStamped { X, x, x_mut => 0; Y, y, y_mut => 1 });
named_components!(Orientation2DStamped { YAW, yaw, yaw_mut => 0 });
named_components!(Position2DStamped { X, x, x_mut => 0; Y, y, y_mut => 1 });
named_components!(Position3DStamped { X, x, x_mut => 0; Y, y, y_mut => 1; Z, z, z_mut => 2 });
named_components!(Point2DLandmark { X, x, x_mut => 0; Y, y, y_mut => 1 });
