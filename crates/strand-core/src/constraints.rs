//! # Constraint Kinds
//!
//! Gaussian constraints generic over a [`VariableKind`]:
//! - [`AbsoluteConstraint`]: a prior on one variable, residual `S·(x − μ)`
//! - [`RelativeConstraint`]: a measured difference between two variables,
//!   residual `S·((x₂ − x₁) − δ)`
//!
//! `S` is the square root information matrix, computed once at construction.
//! All numeric validation happens there, so producing cost and loss objects
//! cannot fail. Angular components are wrapped into (−π, π] before weighting.

use crate::constraint::{Constraint, ConstraintBase, sqrt_information, write_summary};
use crate::cost::{CostFunction, LossFunction, RobustLoss, shapes_match};
use crate::identity::IdGenerator;
use crate::types::{Identifier, StrandError};
use crate::variable::{VariableKind, wrap_angle};
use nalgebra::{DMatrix, DVector};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

// =============================================================================
// COST FUNCTIONS
// =============================================================================

/// Copy `sign · matrix` into a row-major buffer.
fn write_row_major(matrix: &DMatrix<f64>, sign: f64, out: &mut [f64]) {
    let cols = matrix.ncols();
    for row in 0..matrix.nrows() {
        for col in 0..cols {
            out[row * cols + col] = sign * matrix[(row, col)];
        }
    }
}

/// Weighted, angle-aware error `S · wrap(raw)` written into `residuals`.
fn weighted_error(
    sqrt_information: &DMatrix<f64>,
    angular: &[usize],
    raw: impl Iterator<Item = f64>,
    residuals: &mut [f64],
) {
    let error = DVector::from_iterator(
        sqrt_information.ncols(),
        raw.enumerate().map(|(index, value)| {
            if angular.contains(&index) {
                wrap_angle(value)
            } else {
                value
            }
        }),
    );
    let weighted = sqrt_information * error;
    residuals.copy_from_slice(weighted.as_slice());
}

/// Residual block of an [`AbsoluteConstraint`].
#[derive(Debug, Clone)]
pub struct NormalPriorCost {
    mean: Vec<f64>,
    sqrt_information: DMatrix<f64>,
    angular: &'static [usize],
    block_sizes: [usize; 1],
}

impl CostFunction for NormalPriorCost {
    fn num_residuals(&self) -> usize {
        self.mean.len()
    }

    fn parameter_block_sizes(&self) -> &[usize] {
        &self.block_sizes
    }

    fn evaluate(
        &self,
        parameters: &[&[f64]],
        residuals: &mut [f64],
        jacobians: Option<&mut [Option<&mut [f64]>]>,
    ) -> bool {
        if !shapes_match(self, parameters, residuals, jacobians.as_deref()) {
            return false;
        }

        let x = parameters[0];
        weighted_error(
            &self.sqrt_information,
            self.angular,
            x.iter().zip(&self.mean).map(|(value, mean)| value - mean),
            residuals,
        );

        if let Some(blocks) = jacobians
            && let Some(jacobian) = blocks[0].as_deref_mut()
        {
            write_row_major(&self.sqrt_information, 1.0, jacobian);
        }
        true
    }
}

/// Residual block of a [`RelativeConstraint`].
#[derive(Debug, Clone)]
pub struct NormalDeltaCost {
    delta: Vec<f64>,
    sqrt_information: DMatrix<f64>,
    angular: &'static [usize],
    block_sizes: [usize; 2],
}

impl CostFunction for NormalDeltaCost {
    fn num_residuals(&self) -> usize {
        self.delta.len()
    }

    fn parameter_block_sizes(&self) -> &[usize] {
        &self.block_sizes
    }

    fn evaluate(
        &self,
        parameters: &[&[f64]],
        residuals: &mut [f64],
        jacobians: Option<&mut [Option<&mut [f64]>]>,
    ) -> bool {
        if !shapes_match(self, parameters, residuals, jacobians.as_deref()) {
            return false;
        }

        let (from, to) = (parameters[0], parameters[1]);
        weighted_error(
            &self.sqrt_information,
            self.angular,
            from.iter()
                .zip(to)
                .zip(&self.delta)
                .map(|((x1, x2), delta)| (x2 - x1) - delta),
            residuals,
        );

        if let Some(blocks) = jacobians {
            if let Some(jacobian) = blocks[0].as_deref_mut() {
                write_row_major(&self.sqrt_information, -1.0, jacobian);
            }
            if let Some(jacobian) = blocks[1].as_deref_mut() {
                write_row_major(&self.sqrt_information, 1.0, jacobian);
            }
        }
        true
    }
}

// =============================================================================
// ABSOLUTE CONSTRAINT
// =============================================================================

/// A Gaussian prior on a single variable of kind `K`.
#[derive(Debug, Clone)]
pub struct AbsoluteConstraint<K: VariableKind, const N: usize> {
    base: ConstraintBase,
    mean: [f64; N],
    sqrt_information: DMatrix<f64>,
    loss: Option<RobustLoss>,
    kind: PhantomData<K>,
}

impl<K: VariableKind, const N: usize> AbsoluteConstraint<K, N> {
    const LAYOUT_MATCHES: () = assert!(K::COMPONENTS.len() == N);

    /// Build a prior with the given mean and row-major `N × N` covariance.
    pub fn new(
        ids: &IdGenerator,
        variable: Identifier,
        mean: [f64; N],
        covariance: &[f64],
    ) -> Result<Self, StrandError> {
        let () = Self::LAYOUT_MATCHES;
        if mean.iter().any(|value| !value.is_finite()) {
            return Err(StrandError::InvalidParameter(
                "mean must be finite".to_string(),
            ));
        }
        Ok(Self {
            base: ConstraintBase::new(ids, [variable])?,
            mean,
            sqrt_information: sqrt_information(covariance, N)?,
            loss: None,
            kind: PhantomData,
        })
    }

    /// Attach a robust loss. Rejects invalid loss parameters.
    pub fn with_loss(mut self, loss: RobustLoss) -> Result<Self, StrandError> {
        loss.validate()?;
        self.loss = Some(loss);
        Ok(self)
    }

    #[must_use]
    pub fn mean(&self) -> &[f64; N] {
        &self.mean
    }

    #[must_use]
    pub fn sqrt_information(&self) -> &DMatrix<f64> {
        &self.sqrt_information
    }

    #[must_use]
    pub fn loss(&self) -> Option<RobustLoss> {
        self.loss
    }
}

impl<K: VariableKind, const N: usize> Constraint for AbsoluteConstraint<K, N> {
    fn identifier(&self) -> Identifier {
        self.base.identifier()
    }

    fn variables(&self) -> &[Identifier] {
        self.base.variables()
    }

    fn type_name(&self) -> &'static str {
        K::ABSOLUTE_CONSTRAINT
    }

    fn cost_function(&self) -> Box<dyn CostFunction> {
        Box::new(NormalPriorCost {
            mean: self.mean.to_vec(),
            sqrt_information: self.sqrt_information.clone(),
            angular: K::ANGULAR,
            block_sizes: [N],
        })
    }

    fn loss_function(&self) -> Option<Box<dyn LossFunction>> {
        // Parameters were checked in `with_loss`.
        self.loss.and_then(|loss| loss.build().ok())
    }

    fn clone_constraint(&self) -> Box<dyn Constraint> {
        Box::new(self.clone())
    }

    fn print(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        write_summary(sink, self.type_name(), self.identifier(), self.variables())?;
        writeln!(sink, "  mean: {:?}", self.mean)?;
        write_loss(sink, self.loss)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// =============================================================================
// RELATIVE CONSTRAINT
// =============================================================================

/// A Gaussian measurement of the change between two variables of kind `K`.
#[derive(Debug, Clone)]
pub struct RelativeConstraint<K: VariableKind, const N: usize> {
    base: ConstraintBase,
    delta: [f64; N],
    sqrt_information: DMatrix<f64>,
    loss: Option<RobustLoss>,
    kind: PhantomData<K>,
}

impl<K: VariableKind, const N: usize> RelativeConstraint<K, N> {
    const LAYOUT_MATCHES: () = assert!(K::COMPONENTS.len() == N);

    /// Build a relative constraint measuring `to − from = delta`, with a
    /// row-major `N × N` covariance.
    pub fn new(
        ids: &IdGenerator,
        from: Identifier,
        to: Identifier,
        delta: [f64; N],
        covariance: &[f64],
    ) -> Result<Self, StrandError> {
        let () = Self::LAYOUT_MATCHES;
        if delta.iter().any(|value| !value.is_finite()) {
            return Err(StrandError::InvalidParameter(
                "delta must be finite".to_string(),
            ));
        }
        Ok(Self {
            base: ConstraintBase::new(ids, [from, to])?,
            delta,
            sqrt_information: sqrt_information(covariance, N)?,
            loss: None,
            kind: PhantomData,
        })
    }

    /// Attach a robust loss. Rejects invalid loss parameters.
    pub fn with_loss(mut self, loss: RobustLoss) -> Result<Self, StrandError> {
        loss.validate()?;
        self.loss = Some(loss);
        Ok(self)
    }

    #[must_use]
    pub fn delta(&self) -> &[f64; N] {
        &self.delta
    }

    #[must_use]
    pub fn sqrt_information(&self) -> &DMatrix<f64> {
        &self.sqrt_information
    }

    #[must_use]
    pub fn loss(&self) -> Option<RobustLoss> {
        self.loss
    }
}

impl<K: VariableKind, const N: usize> Constraint for RelativeConstraint<K, N> {
    fn identifier(&self) -> Identifier {
        self.base.identifier()
    }

    fn variables(&self) -> &[Identifier] {
        self.base.variables()
    }

    fn type_name(&self) -> &'static str {
        K::RELATIVE_CONSTRAINT
    }

    fn cost_function(&self) -> Box<dyn CostFunction> {
        Box::new(NormalDeltaCost {
            delta: self.delta.to_vec(),
            sqrt_information: self.sqrt_information.clone(),
            angular: K::ANGULAR,
            block_sizes: [N, N],
        })
    }

    fn loss_function(&self) -> Option<Box<dyn LossFunction>> {
        // Parameters were checked in `with_loss`.
        self.loss.and_then(|loss| loss.build().ok())
    }

    fn clone_constraint(&self) -> Box<dyn Constraint> {
        Box::new(self.clone())
    }

    fn print(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        write_summary(sink, self.type_name(), self.identifier(), self.variables())?;
        writeln!(sink, "  delta: {:?}", self.delta)?;
        write_loss(sink, self.loss)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn write_loss(sink: &mut dyn fmt::Write, loss: Option<RobustLoss>) -> fmt::Result {
    match loss {
        Some(loss) => writeln!(sink, "  loss: {}", loss),
        None => writeln!(sink, "  loss: quadratic"),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{Orientation2D, Position2D};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn ids() -> IdGenerator {
        IdGenerator::seeded(21)
    }

    #[test]
    fn absolute_residual_is_whitened_error() {
        let ids = ids();
        let target = ids.random();
        let constraint = AbsoluteConstraint::<Position2D, 2>::new(
            &ids,
            target,
            [1.0, 2.0],
            &[4.0, 0.0, 0.0, 1.0],
        )
        .expect("constraint");

        let cost = constraint.cost_function();
        let mut residuals = [0.0; 2];
        assert!(cost.evaluate(&[&[3.0, 1.0]], &mut residuals, None));
        assert_relative_eq!(residuals[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(residuals[1], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn absolute_jacobian_is_sqrt_information() {
        let ids = ids();
        let constraint = AbsoluteConstraint::<Position2D, 2>::new(
            &ids,
            ids.random(),
            [0.0, 0.0],
            &[4.0, 0.0, 0.0, 1.0],
        )
        .expect("constraint");

        let cost = constraint.cost_function();
        let mut residuals = [0.0; 2];
        let mut jacobian = [0.0; 4];
        let mut blocks = [Some(&mut jacobian[..])];
        assert!(cost.evaluate(&[&[1.0, 1.0]], &mut residuals, Some(&mut blocks)));
        assert_relative_eq!(jacobian[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(jacobian[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(jacobian[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(jacobian[3], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cost_rejects_wrong_shapes() {
        let ids = ids();
        let constraint = AbsoluteConstraint::<Position2D, 2>::new(
            &ids,
            ids.random(),
            [0.0; 2],
            &[1.0, 0.0, 0.0, 1.0],
        )
        .expect("constraint");
        let cost = constraint.cost_function();

        let mut residuals = [7.0; 2];
        assert!(!cost.evaluate(&[&[1.0]], &mut residuals, None));
        assert!(!cost.evaluate(&[], &mut residuals, None));
        assert_eq!(residuals, [7.0; 2]);

        let mut short = [0.0; 1];
        assert!(!cost.evaluate(&[&[1.0, 2.0]], &mut short, None));
    }

    #[test]
    fn relative_residual_and_jacobians() {
        let ids = ids();
        let (a, b) = (ids.random(), ids.random());
        let constraint =
            RelativeConstraint::<Position2D, 2>::new(&ids, a, b, [1.0, 0.0], &[1.0, 0.0, 0.0, 1.0])
                .expect("constraint");
        assert_eq!(constraint.variables(), &[a, b]);

        let cost = constraint.cost_function();
        assert_eq!(cost.parameter_block_sizes(), &[2, 2]);

        let mut residuals = [0.0; 2];
        let mut j_from = [0.0; 4];
        let mut j_to = [0.0; 4];
        let mut blocks = [Some(&mut j_from[..]), Some(&mut j_to[..])];
        assert!(cost.evaluate(
            &[&[0.0, 0.0], &[1.5, 0.5]],
            &mut residuals,
            Some(&mut blocks)
        ));
        assert_relative_eq!(residuals[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(residuals[1], 0.5, epsilon = 1e-12);
        assert_eq!(j_from, [-1.0, 0.0, 0.0, -1.0]);
        assert_eq!(j_to, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn relative_orientation_wraps() {
        let ids = ids();
        let constraint = RelativeConstraint::<Orientation2D, 1>::new(
            &ids,
            ids.random(),
            ids.random(),
            [0.0],
            &[1.0],
        )
        .expect("constraint");

        let cost = constraint.cost_function();
        let mut residuals = [0.0; 1];
        assert!(cost.evaluate(&[&[PI - 0.1], &[-PI + 0.1]], &mut residuals, None));
        assert_relative_eq!(residuals[0], 0.2, epsilon = 1e-9);
    }

    #[test]
    fn covariance_is_validated_at_construction() {
        let ids = ids();
        let result = AbsoluteConstraint::<Position2D, 2>::new(
            &ids,
            ids.random(),
            [0.0; 2],
            &[1.0, 0.0, 0.0, -1.0],
        );
        assert!(matches!(result, Err(StrandError::InvalidCovariance)));

        let result = AbsoluteConstraint::<Position2D, 2>::new(&ids, ids.random(), [0.0; 2], &[1.0]);
        assert!(matches!(result, Err(StrandError::DimensionMismatch { .. })));

        let result = AbsoluteConstraint::<Position2D, 2>::new(
            &ids,
            ids.random(),
            [f64::NAN, 0.0],
            &[1.0, 0.0, 0.0, 1.0],
        );
        assert!(matches!(result, Err(StrandError::InvalidParameter(_))));
    }

    #[test]
    fn loss_defaults_to_none() {
        let ids = ids();
        let constraint = AbsoluteConstraint::<Position2D, 2>::new(
            &ids,
            ids.random(),
            [0.0; 2],
            &[1.0, 0.0, 0.0, 1.0],
        )
        .expect("constraint");
        assert!(constraint.loss_function().is_none());

        let robust = constraint
            .with_loss(RobustLoss::Huber { delta: 0.5 })
            .expect("loss");
        let loss = robust.loss_function().expect("loss present");
        assert_eq!(loss.evaluate(1.0)[1], 0.5);
    }

    #[test]
    fn invalid_loss_is_rejected() {
        let ids = ids();
        let constraint = RelativeConstraint::<Position2D, 2>::new(
            &ids,
            ids.random(),
            ids.random(),
            [0.0; 2],
            &[1.0, 0.0, 0.0, 1.0],
        )
        .expect("constraint");
        let result = constraint.with_loss(RobustLoss::Cauchy { scale: -1.0 });
        assert!(matches!(result, Err(StrandError::InvalidParameter(_))));
    }

    #[test]
    fn print_describes_measurement() {
        let ids = ids();
        let constraint = RelativeConstraint::<Position2D, 2>::new(
            &ids,
            ids.random(),
            ids.random(),
            [1.0, 2.0],
            &[1.0, 0.0, 0.0, 1.0],
        )
        .expect("constraint")
        .with_loss(RobustLoss::Tukey { c: 3.0 })
        .expect("loss");

        let mut out = String::new();
        constraint.print(&mut out).expect("print");
        assert!(out.starts_with("strand::RelativeConstraint<Position2DStamped>\n"));
        assert!(out.contains("delta: [1.0, 2.0]"));
        assert!(out.contains("loss: tukey(c=3)"));
    }
}
