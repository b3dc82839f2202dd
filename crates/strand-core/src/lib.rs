//! # strand-core
//!
//! The identity and composition core of the strand estimation graph.
//!
//! This crate defines what an estimation graph is made of, not how it is
//! solved:
//! - **Identity**: content-derived identifiers for stamped quantities, random
//!   identifiers for everything that must stay distinct
//! - **Variables**: fixed-size scalar buffers with a stable kind name
//! - **Constraints**: edges naming their variables by identifier and
//!   producing cost and loss objects for an external optimizer
//! - **Graph**: the container contract plus an in-memory reference graph
//!
//! ## Architectural Constraints
//!
//! - No I/O, no async, no global state
//! - Randomness only through an injected [`RandomSource`]
//! - `BTreeMap` storage wherever iteration order is observable

// =============================================================================
// MODULES
// =============================================================================

pub mod constraint;
pub mod constraints;
pub mod cost;
pub mod graph;
pub mod identity;
pub mod kinds;
pub mod primitives;
pub mod stamped;
pub mod time;
pub mod types;
pub mod variable;
pub mod variables;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use time::Timestamp;
pub use types::{Identifier, StrandError};

// =============================================================================
// RE-EXPORTS: Identity
// =============================================================================

pub use identity::{
    IdGenerator, OsRandomSource, RandomSource, SeededRandomSource, device_id,
    generate_deterministic, generate_from_name, generate_stamped,
};

// =============================================================================
// RE-EXPORTS: Variables and Constraints
// =============================================================================

pub use constraint::{Constraint, ConstraintBase};
pub use constraints::{AbsoluteConstraint, RelativeConstraint};
pub use cost::{CauchyLoss, CostFunction, HuberLoss, LossFunction, RobustLoss, TukeyLoss};
pub use stamped::{Stamped, StampedKey, StampedVariable};
pub use variable::{FixedSizeVariable, UnstampedVariable, Variable, VariableKind};
pub use variables::{
    AccelerationAngular2DStamped, AccelerationLinear2DStamped, Orientation2DStamped,
    Point2DLandmark, Position2DStamped, Position3DStamped, VelocityAngular2DStamped,
    VelocityLinear2DStamped,
};

// =============================================================================
// RE-EXPORTS: Graph
// =============================================================================

pub use graph::{Graph, MemoryGraph, MergeReport};
