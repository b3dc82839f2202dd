//! # Kind Registry
//!
//! Runtime lookup from stable type names to constructors. Loaders (scenario
//! files, the CLI) only know kinds by name; this module turns those names
//! back into concrete variables and constraints.
//!
//! Names are accepted with or without the `strand::` prefix.

use crate::constraint::Constraint;
use crate::constraints::{AbsoluteConstraint, RelativeConstraint};
use crate::cost::RobustLoss;
use crate::identity::{IdGenerator, generate_stamped};
use crate::primitives::TYPE_NAME_PREFIX;
use crate::stamped::StampedVariable;
use crate::time::Timestamp;
use crate::types::{Identifier, StrandError};
use crate::variable::{UnstampedVariable, Variable, VariableKind};
use crate::variables::{
    AccelerationAngular2D, AccelerationLinear2D, Orientation2D, Point2D, Position2D, Position3D,
    VelocityAngular2D, VelocityLinear2D,
};

type StampedFactory = fn(Timestamp, Identifier, &[f64]) -> Result<Box<dyn Variable>, StrandError>;
type UnstampedFactory = fn(&IdGenerator, &[f64]) -> Result<Box<dyn Variable>, StrandError>;
type AbsoluteFactory = fn(
    &IdGenerator,
    Identifier,
    &[f64],
    &[f64],
    Option<RobustLoss>,
) -> Result<Box<dyn Constraint>, StrandError>;
type RelativeFactory = fn(
    &IdGenerator,
    Identifier,
    Identifier,
    &[f64],
    &[f64],
    Option<RobustLoss>,
) -> Result<Box<dyn Constraint>, StrandError>;

#[derive(Clone, Copy)]
enum VariableFactory {
    Stamped(StampedFactory),
    Unstamped(UnstampedFactory),
}

/// Registry entry for one variable kind and its constraint families.
#[derive(Clone, Copy)]
pub struct KindEntry {
    type_name: &'static str,
    components: &'static [&'static str],
    absolute_constraint: &'static str,
    relative_constraint: &'static str,
    variable: VariableFactory,
    absolute: AbsoluteFactory,
    relative: RelativeFactory,
}

impl KindEntry {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn components(&self) -> &'static [&'static str] {
        self.components
    }

    #[must_use]
    pub fn is_stamped(&self) -> bool {
        matches!(self.variable, VariableFactory::Stamped(_))
    }

    #[must_use]
    pub fn absolute_constraint(&self) -> &'static str {
        self.absolute_constraint
    }

    #[must_use]
    pub fn relative_constraint(&self) -> &'static str {
        self.relative_constraint
    }
}

impl std::fmt::Debug for KindEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindEntry")
            .field("type_name", &self.type_name)
            .field("components", &self.components)
            .field("stamped", &self.is_stamped())
            .finish()
    }
}

// =============================================================================
// GENERIC BUILDERS
// =============================================================================

fn to_array<const N: usize>(what: &'static str, values: &[f64]) -> Result<[f64; N], StrandError> {
    values
        .try_into()
        .map_err(|_| StrandError::DimensionMismatch {
            what,
            expected: N,
            actual: values.len(),
        })
}

fn build_stamped<K: VariableKind, const N: usize>(
    stamp: Timestamp,
    device: Identifier,
    values: &[f64],
) -> Result<Box<dyn Variable>, StrandError> {
    let values = to_array::<N>("values", values)?;
    Ok(Box::new(StampedVariable::<K, N>::with_values(
        stamp, device, values,
    )))
}

fn build_unstamped<K: VariableKind, const N: usize>(
    ids: &IdGenerator,
    values: &[f64],
) -> Result<Box<dyn Variable>, StrandError> {
    let values = to_array::<N>("values", values)?;
    let mut variable = UnstampedVariable::<K, N>::new(ids);
    variable.values_mut().as_mut_slice().copy_from_slice(&values);
    Ok(Box::new(variable))
}

fn build_absolute<K: VariableKind, const N: usize>(
    ids: &IdGenerator,
    variable: Identifier,
    mean: &[f64],
    covariance: &[f64],
    loss: Option<RobustLoss>,
) -> Result<Box<dyn Constraint>, StrandError> {
    let mean = to_array::<N>("mean", mean)?;
    let mut constraint = AbsoluteConstraint::<K, N>::new(ids, variable, mean, covariance)?;
    if let Some(loss) = loss {
        constraint = constraint.with_loss(loss)?;
    }
    Ok(Box::new(constraint))
}

fn build_relative<K: VariableKind, const N: usize>(
    ids: &IdGenerator,
    from: Identifier,
    to: Identifier,
    delta: &[f64],
    covariance: &[f64],
    loss: Option<RobustLoss>,
) -> Result<Box<dyn Constraint>, StrandError> {
    let delta = to_array::<N>("delta", delta)?;
    let mut constraint = RelativeConstraint::<K, N>::new(ids, from, to, delta, covariance)?;
    if let Some(loss) = loss {
        constraint = constraint.with_loss(loss)?;
    }
    Ok(Box::new(constraint))
}

macro_rules! entry {
    (@build $kind:ty, $n:literal, $factory:expr) => {
        KindEntry {
            type_name: <$kind as VariableKind>::TYPE_NAME,
            components: <$kind as VariableKind>::COMPONENTS,
            absolute_constraint: <$kind as VariableKind>::ABSOLUTE_CONSTRAINT,
            relative_constraint: <$kind as VariableKind>::RELATIVE_CONSTRAINT,
            variable: $factory,
            absolute: build_absolute::<$kind, $n>,
            relative: build_relative::<$kind, $n>,
        }
    };
    ($kind:ty, $n:literal, stamped) => {
        entry!(@build $kind, $n, VariableFactory::Stamped(build_stamped::<$kind, $n>))
    };
    ($kind:ty, $n:literal, unstamped) => {
        entry!(@build $kind, $n, VariableFactory::Unstamped(build_unstamped::<$kind, $n>))
    };
}

/// Every registered kind, in listing order.
static KINDS: [KindEntry; 8] = [
    entry!(AccelerationAngular2D, 1, stamped),
    entry!(AccelerationLinear2D, 2, stamped),
    entry!(VelocityAngular2D, 1, stamped),
    entry!(VelocityLinear2D, 2, stamped),
    entry!(Orientation2D, 1, stamped),
    entry!(Position2D, 2, stamped),
    entry!(Position3D, 3, stamped),
    entry!(Point2D, 2, unstamped),
];

// =============================================================================
// LOOKUP
// =============================================================================

fn qualified(name: &str) -> String {
    if name.starts_with(TYPE_NAME_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", TYPE_NAME_PREFIX, name)
    }
}

/// Find the entry for a variable type name.
pub fn lookup(type_name: &str) -> Result<&'static KindEntry, StrandError> {
    let name = qualified(type_name);
    KINDS
        .iter()
        .find(|entry| entry.type_name == name)
        .ok_or_else(|| StrandError::UnknownKind(type_name.to_string()))
}

/// Find the entry whose absolute or relative constraint carries this name.
pub fn lookup_constraint(type_name: &str) -> Result<&'static KindEntry, StrandError> {
    let name = qualified(type_name);
    KINDS
        .iter()
        .find(|entry| entry.absolute_constraint == name || entry.relative_constraint == name)
        .ok_or_else(|| StrandError::UnknownKind(type_name.to_string()))
}

/// All registered variable type names.
#[must_use]
pub fn variable_type_names() -> Vec<&'static str> {
    KINDS.iter().map(|entry| entry.type_name).collect()
}

/// All registered constraint type names, absolute before relative per kind.
#[must_use]
pub fn constraint_type_names() -> Vec<&'static str> {
    KINDS
        .iter()
        .flat_map(|entry| [entry.absolute_constraint, entry.relative_constraint])
        .collect()
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

fn not_stamped(entry: &KindEntry) -> StrandError {
    StrandError::InvalidParameter(format!("{} is not a stamped kind", entry.type_name))
}

/// The identifier a stamped kind would assign to (stamp, device), without
/// building the variable.
pub fn stamped_identifier(
    type_name: &str,
    stamp: Timestamp,
    device: Identifier,
) -> Result<Identifier, StrandError> {
    let entry = lookup(type_name)?;
    if !entry.is_stamped() {
        return Err(not_stamped(entry));
    }
    Ok(generate_stamped(entry.type_name, stamp, device))
}

/// Build a stamped variable by kind name.
pub fn stamped_variable(
    type_name: &str,
    stamp: Timestamp,
    device: Identifier,
    values: &[f64],
) -> Result<Box<dyn Variable>, StrandError> {
    let entry = lookup(type_name)?;
    match entry.variable {
        VariableFactory::Stamped(build) => build(stamp, device, values),
        VariableFactory::Unstamped(_) => Err(not_stamped(entry)),
    }
}

/// Build an unstamped variable by kind name, with a fresh random identity.
pub fn unstamped_variable(
    type_name: &str,
    ids: &IdGenerator,
    values: &[f64],
) -> Result<Box<dyn Variable>, StrandError> {
    let entry = lookup(type_name)?;
    match entry.variable {
        VariableFactory::Unstamped(build) => build(ids, values),
        VariableFactory::Stamped(_) => Err(StrandError::InvalidParameter(format!(
            "{} is a stamped kind",
            entry.type_name
        ))),
    }
}

/// Build the absolute constraint over a variable of kind `variable_type`.
pub fn absolute_constraint(
    variable_type: &str,
    ids: &IdGenerator,
    variable: Identifier,
    mean: &[f64],
    covariance: &[f64],
    loss: Option<RobustLoss>,
) -> Result<Box<dyn Constraint>, StrandError> {
    let entry = lookup(variable_type)?;
    (entry.absolute)(ids, variable, mean, covariance, loss)
}

/// Build the relative constraint between two variables of kind
/// `variable_type`.
pub fn relative_constraint(
    variable_type: &str,
    ids: &IdGenerator,
    from: Identifier,
    to: Identifier,
    delta: &[f64],
    covariance: &[f64],
    loss: Option<RobustLoss>,
) -> Result<Box<dyn Constraint>, StrandError> {
    let entry = lookup(variable_type)?;
    (entry.relative)(ids, from, to, delta, covariance, loss)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamped::Stamped;
    use crate::variables::Position2DStamped;

    #[test]
    fn lists_every_kind() {
        let names = variable_type_names();
        assert_eq!(names.len(), 8);
        assert!(names.contains(&"strand::AccelerationAngular2DStamped"));
        assert!(names.contains(&"strand::Point2DLandmark"));
        assert_eq!(constraint_type_names().len(), 16);
    }

    #[test]
    fn prefix_is_optional() {
        let short = lookup("Position2DStamped").expect("short name");
        let long = lookup("strand::Position2DStamped").expect("long name");
        assert_eq!(short.type_name(), long.type_name());
        assert_eq!(short.size(), 2);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            lookup("Position4DStamped").map(KindEntry::type_name),
            Err(StrandError::UnknownKind("Position4DStamped".to_string()))
        );
        assert!(lookup_constraint("strand::Position2DStamped").is_err());
    }

    #[test]
    fn constraint_names_resolve_to_their_kind() {
        let entry =
            lookup_constraint("strand::RelativeConstraint<Orientation2DStamped>").expect("entry");
        assert_eq!(entry.type_name(), "strand::Orientation2DStamped");
    }

    #[test]
    fn stamped_variable_matches_static_type() {
        let stamp = Timestamp::new(3, 0);
        let built = stamped_variable("Position2DStamped", stamp, Identifier::NIL, &[1.0, 2.0])
            .expect("variable");
        let direct = Position2DStamped::with_values(stamp, Identifier::NIL, [1.0, 2.0]);

        assert_eq!(built.identifier(), direct.identifier());
        assert_eq!(built.data(), direct.data());
        let typed = built
            .as_any()
            .downcast_ref::<Position2DStamped>()
            .expect("downcast");
        assert_eq!(typed.timestamp(), stamp);
        assert_eq!(
            stamped_identifier("Position2DStamped", stamp, Identifier::NIL),
            Ok(direct.identifier())
        );
    }

    #[test]
    fn wrong_value_count_is_rejected() {
        let result = stamped_variable(
            "Position3DStamped",
            Timestamp::ZERO,
            Identifier::NIL,
            &[1.0],
        );
        assert!(matches!(
            result,
            Err(StrandError::DimensionMismatch {
                expected: 3,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn stamping_mode_must_match_kind() {
        let ids = IdGenerator::seeded(4);
        assert!(
            stamped_variable("Point2DLandmark", Timestamp::ZERO, Identifier::NIL, &[0.0; 2])
                .is_err()
        );
        assert!(unstamped_variable("Position2DStamped", &ids, &[0.0; 2]).is_err());
        assert!(stamped_identifier("Point2DLandmark", Timestamp::ZERO, Identifier::NIL).is_err());

        let landmark = unstamped_variable("Point2DLandmark", &ids, &[4.0, 5.0]).expect("landmark");
        assert!(landmark.identifier().is_random());
        assert_eq!(landmark.data(), &[4.0, 5.0]);
    }

    #[test]
    fn constraints_by_name() {
        let ids = IdGenerator::seeded(4);
        let (a, b) = (ids.random(), ids.random());

        let prior = absolute_constraint("Orientation2DStamped", &ids, a, &[0.5], &[0.1], None)
            .expect("prior");
        assert_eq!(prior.type_name(), "strand::AbsoluteConstraint<Orientation2DStamped>");
        assert_eq!(prior.variables(), &[a]);

        let between = relative_constraint(
            "Position2DStamped",
            &ids,
            a,
            b,
            &[1.0, 0.0],
            &[1.0, 0.0, 0.0, 1.0],
            Some(RobustLoss::Huber { delta: 1.0 }),
        )
        .expect("relative");
        assert_eq!(between.variables(), &[a, b]);
        assert!(between.loss_function().is_some());

        let bad = absolute_constraint("Position2DStamped", &ids, a, &[0.0], &[1.0], None);
        assert!(matches!(bad, Err(StrandError::DimensionMismatch { what: "mean", .. })));
    }
}
