//! # strand
//!
//! Application layer of the strand estimation graph: configuration, scenario
//! files and the command implementations behind the `strand` binary.

pub mod cli;
pub mod config;
pub mod scenario;

pub use config::{LogFormat, StrandConfig};
pub use scenario::{BuiltScenario, ConstraintSpec, Scenario, VariableSpec};
