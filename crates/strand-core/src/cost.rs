//! # Optimizer Boundary
//!
//! The objects a constraint hands to the external optimizer:
//! - [`CostFunction`]: residuals (and optionally Jacobians) from the current
//!   values of the constraint's variables, in endpoint order
//! - [`LossFunction`]: the robust penalty applied to the squared residual
//!   norm. Absence means the plain quadratic penalty.
//!
//! Ownership of produced objects passes to the caller. The producing
//! constraint must stay alive while the objects are in use by a solve; the
//! graph/optimizer integration upholds that.
//!
//! The robust losses follow the usual M-estimator forms:
//!
//! | Loss | Behaviour | Best for |
//! |------|-----------|----------|
//! | Huber | Linear beyond the threshold | General use |
//! | Cauchy | Heavy tailed | Cluttered data |
//! | Tukey | Constant beyond the cutoff | Clearly separable outliers |

use crate::types::StrandError;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// COST FUNCTION
// =============================================================================

/// A residual block consumed by the optimizer.
pub trait CostFunction: Send + Sync {
    /// Length of the residual vector.
    fn num_residuals(&self) -> usize;

    /// Length of each parameter block, in endpoint order.
    fn parameter_block_sizes(&self) -> &[usize];

    /// Evaluate the residuals at `parameters`.
    ///
    /// When `jacobians` is given, each present entry receives the row-major
    /// `num_residuals × block_size` derivative for its block. Returns `false`
    /// if the inputs have the wrong shape; nothing is written in that case.
    fn evaluate(
        &self,
        parameters: &[&[f64]],
        residuals: &mut [f64],
        jacobians: Option<&mut [Option<&mut [f64]>]>,
    ) -> bool;
}

/// Check parameter, residual and Jacobian shapes against a cost function.
#[must_use]
pub fn shapes_match(
    cost: &dyn CostFunction,
    parameters: &[&[f64]],
    residuals: &[f64],
    jacobians: Option<&[Option<&mut [f64]>]>,
) -> bool {
    let sizes = cost.parameter_block_sizes();
    if parameters.len() != sizes.len() || residuals.len() != cost.num_residuals() {
        return false;
    }
    if parameters
        .iter()
        .zip(sizes)
        .any(|(block, size)| block.len() != *size)
    {
        return false;
    }
    match jacobians {
        None => true,
        Some(blocks) => {
            blocks.len() == sizes.len()
                && blocks.iter().zip(sizes).all(|(block, size)| {
                    block
                        .as_ref()
                        .is_none_or(|j| j.len() == size * cost.num_residuals())
                })
        }
    }
}

// =============================================================================
// LOSS FUNCTION
// =============================================================================

/// A robust penalty on the squared residual norm `s`.
pub trait LossFunction: Send + Sync {
    /// Returns `[ρ(s), ρ'(s), ρ''(s)]`.
    fn evaluate(&self, squared_norm: f64) -> [f64; 3];
}

/// Total cost of one residual block: `½ ρ(‖r‖²)`, with `ρ(s) = s` when no
/// loss is given. `None` if the cost function rejects the inputs.
#[must_use]
pub fn block_cost(
    cost: &dyn CostFunction,
    loss: Option<&dyn LossFunction>,
    parameters: &[&[f64]],
) -> Option<f64> {
    let mut residuals = vec![0.0; cost.num_residuals()];
    if !cost.evaluate(parameters, &mut residuals, None) {
        return None;
    }
    let squared_norm: f64 = residuals.iter().map(|r| r * r).sum();
    let rho = loss.map_or(squared_norm, |l| l.evaluate(squared_norm)[0]);
    Some(0.5 * rho)
}

/// Robust loss parameters must be positive and finite; anything else makes
/// the penalty NaN or undefined.
fn positive_parameter(name: &str, value: f64) -> Result<f64, StrandError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(StrandError::InvalidParameter(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

/// Huber loss: quadratic below `delta`, linear above.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuberLoss {
    delta: f64,
}

impl HuberLoss {
    /// Rejects a non-positive or non-finite `delta`.
    pub fn new(delta: f64) -> Result<Self, StrandError> {
        Ok(Self {
            delta: positive_parameter("huber delta", delta)?,
        })
    }
}

impl LossFunction for HuberLoss {
    fn evaluate(&self, s: f64) -> [f64; 3] {
        let b = self.delta * self.delta;
        if s > b {
            let r = s.sqrt();
            let rho1 = (self.delta / r).max(f64::MIN_POSITIVE);
            [2.0 * self.delta * r - b, rho1, -rho1 / (2.0 * s)]
        } else {
            [s, 1.0, 0.0]
        }
    }
}

/// Cauchy (Lorentzian) loss: `ρ(s) = b·ln(1 + s/b)` with `b = scale²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CauchyLoss {
    scale: f64,
}

impl CauchyLoss {
    /// Rejects a non-positive or non-finite `scale`.
    pub fn new(scale: f64) -> Result<Self, StrandError> {
        Ok(Self {
            scale: positive_parameter("cauchy scale", scale)?,
        })
    }
}

impl LossFunction for CauchyLoss {
    fn evaluate(&self, s: f64) -> [f64; 3] {
        let b = self.scale * self.scale;
        let c = 1.0 / b;
        let sum = 1.0 + s * c;
        let inv = 1.0 / sum;
        [b * sum.ln(), inv.max(f64::MIN_POSITIVE), -c * inv * inv]
    }
}

/// Tukey biweight: bounded penalty, zero gradient beyond the cutoff `c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TukeyLoss {
    c: f64,
}

impl TukeyLoss {
    /// Rejects a non-positive or non-finite `c`.
    pub fn new(c: f64) -> Result<Self, StrandError> {
        Ok(Self {
            c: positive_parameter("tukey c", c)?,
        })
    }
}

impl LossFunction for TukeyLoss {
    fn evaluate(&self, s: f64) -> [f64; 3] {
        let c2 = self.c * self.c;
        if s <= c2 {
            let value = 1.0 - s / c2;
            let value_sq = value * value;
            [
                c2 / 3.0 * (1.0 - value_sq * value),
                value_sq,
                -2.0 / c2 * value,
            ]
        } else {
            [c2 / 3.0, 0.0, 0.0]
        }
    }
}

// =============================================================================
// LOSS SELECTION
// =============================================================================

/// Serializable selection of a robust loss.
///
/// Stored by constraints and read from configuration; turned into an owned
/// [`LossFunction`] on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RobustLoss {
    Huber { delta: f64 },
    Cauchy { scale: f64 },
    Tukey { c: f64 },
}

impl RobustLoss {
    /// Reject non-finite or non-positive parameters.
    pub fn validate(&self) -> Result<(), StrandError> {
        self.build().map(|_| ())
    }

    /// Build a fresh, independently owned loss object.
    pub fn build(&self) -> Result<Box<dyn LossFunction>, StrandError> {
        Ok(match *self {
            Self::Huber { delta } => Box::new(HuberLoss::new(delta)?),
            Self::Cauchy { scale } => Box::new(CauchyLoss::new(scale)?),
            Self::Tukey { c } => Box::new(TukeyLoss::new(c)?),
        })
    }
}

impl fmt::Display for RobustLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Huber { delta } => write!(f, "huber(delta={})", delta),
            Self::Cauchy { scale } => write!(f, "cauchy(scale={})", scale),
            Self::Tukey { c } => write!(f, "tukey(c={})", c),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
