//! # Constraint Abstraction
//!
//! A constraint is an edge of the estimation graph. It holds:
//! - a random [`Identifier`], so duplicate measurements stay distinct edges
//! - the ordered identifiers of the variables it involves. Order matches the
//!   parameter block order of the cost function it produces.
//! - the behaviour for manufacturing optimizer-facing cost and loss objects
//!
//! A constraint never owns its variables. It names them by identifier and the
//! external graph resolves those names.

use crate::cost::{CostFunction, LossFunction};
use crate::identity::IdGenerator;
use crate::types::{Identifier, StrandError};
use nalgebra::{Cholesky, DMatrix};
use std::any::Any;
use std::fmt;

/// Relative tolerance when checking covariance symmetry.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

// =============================================================================
// CONSTRAINT TRAIT
// =============================================================================

/// The interface shared by every constraint kind.
///
/// Object safe: external graphs store `Box<dyn Constraint>`.
pub trait Constraint: fmt::Debug + Send + Sync {
    /// The random identity assigned at construction.
    fn identifier(&self) -> Identifier;

    /// Endpoint variables, in cost-function argument order. Never empty.
    fn variables(&self) -> &[Identifier];

    /// Stable, globally unique kind name.
    fn type_name(&self) -> &'static str;

    /// Build a fresh cost function. Ownership passes to the caller.
    ///
    /// Repeated calls return independent, behaviourally identical objects and
    /// leave the constraint untouched.
    fn cost_function(&self) -> Box<dyn CostFunction>;

    /// Build a fresh robust loss, or `None` for the plain quadratic penalty.
    fn loss_function(&self) -> Option<Box<dyn LossFunction>> {
        None
    }

    /// Deep copy preserving identity, endpoints and behaviour.
    fn clone_constraint(&self) -> Box<dyn Constraint>;

    /// Write a human-readable description.
    fn print(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        write_summary(sink, self.type_name(), self.identifier(), self.variables())
    }

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Constraint> {
    fn clone(&self) -> Self {
        self.clone_constraint()
    }
}

impl fmt::Display for dyn Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f)
    }
}

// =============================================================================
// SHARED STATE
// =============================================================================

/// Identity and endpoint list shared by all constraint kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintBase {
    id: Identifier,
    variables: Vec<Identifier>,
}

impl ConstraintBase {
    /// Draw a random identity and record the endpoints in order.
    ///
    /// Rejects an empty endpoint list.
    pub fn new(
        ids: &IdGenerator,
        variables: impl IntoIterator<Item = Identifier>,
    ) -> Result<Self, StrandError> {
        Self::with_id(ids.random(), variables)
    }

    /// Rebuild with a known identity (e.g. when loading a stored graph).
    pub fn with_id(
        id: Identifier,
        variables: impl IntoIterator<Item = Identifier>,
    ) -> Result<Self, StrandError> {
        let variables: Vec<Identifier> = variables.into_iter().collect();
        if variables.is_empty() {
            return Err(StrandError::EmptyVariableList);
        }
        Ok(Self { id, variables })
    }

    #[must_use]
    pub fn identifier(&self) -> Identifier {
        self.id
    }

    #[must_use]
    pub fn variables(&self) -> &[Identifier] {
        &self.variables
    }
}

/// Write the kind, identity and endpoint lines shared by every constraint
/// description.
pub fn write_summary(
    sink: &mut dyn fmt::Write,
    type_name: &str,
    id: Identifier,
    variables: &[Identifier],
) -> fmt::Result {
    writeln!(sink, "{}", type_name)?;
    writeln!(sink, "  uuid: {}", id)?;
    writeln!(sink, "  variables:")?;
    for variable in variables {
        writeln!(sink, "   - {}", variable)?;
    }
    Ok(())
}

// =============================================================================
// NUMERIC HELPERS
// =============================================================================

/// Reject a vector argument of the wrong length.
pub fn expect_len(what: &'static str, expected: usize, actual: usize) -> Result<(), StrandError> {
    if expected == actual {
        Ok(())
    } else {
        Err(StrandError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Compute the upper-triangular square root information matrix `S` of a
/// row-major `dim × dim` covariance, so that `‖S·e‖² = eᵀ Σ⁻¹ e`.
///
/// Rejects wrong sizes, non-finite entries, asymmetric or non positive
/// definite matrices.
pub fn sqrt_information(covariance: &[f64], dim: usize) -> Result<DMatrix<f64>, StrandError> {
    expect_len("covariance", dim * dim, covariance.len())?;
    if covariance.iter().any(|value| !value.is_finite()) {
        return Err(StrandError::InvalidCovariance);
    }

    let covariance = DMatrix::from_row_slice(dim, dim, covariance);
    let scale = covariance.amax().max(1.0);
    for row in 0..dim {
        for col in (row + 1)..dim {
            let asymmetry = (covariance[(row, col)] - covariance[(col, row)]).abs();
            if asymmetry > SYMMETRY_TOLERANCE * scale {
                return Err(StrandError::InvalidCovariance);
            }
        }
    }

    let information = Cholesky::new(covariance)
        .ok_or(StrandError::InvalidCovariance)?
        .inverse();
    let root = Cholesky::new(information).ok_or(StrandError::InvalidCovariance)?;
    Ok(root.l().transpose())
}

// =============================================================================
// TESTS
// =============================================================================
