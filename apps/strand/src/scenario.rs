//! # Scenario Files
//!
//! A scenario is a TOML description of variables and constraints, built into
//! a [`MemoryGraph`] through the kind registry. Constraints name their
//! endpoints by variable label; the constraint kind follows from the kind of
//! those variables.
//!
//! ```toml
//! name = "two poses"
//!
//! [[variables]]
//! label = "x0"
//! kind = "Position2DStamped"
//! stamp = 0.0
//! device = "odom"
//! values = [0.0, 0.0]
//!
//! [[constraints]]
//! type = "absolute"
//! variable = "x0"
//! mean = [0.0, 0.0]
//! covariance = [1.0, 0.0, 0.0, 1.0]
//! ```

use crate::config::read_input;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use strand_core::{
    Graph, IdGenerator, Identifier, MemoryGraph, RobustLoss, StrandError, Timestamp, device_id,
    kinds,
};

// =============================================================================
// FILE FORMAT
// =============================================================================

/// One variable entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    /// Name used by constraints to refer to this variable.
    pub label: String,

    /// Kind name, with or without the `strand::` prefix.
    pub kind: String,

    /// Timestamp in seconds. Required for stamped kinds only.
    #[serde(default)]
    pub stamp: Option<f64>,

    /// Device name. Unset means the nil device.
    #[serde(default)]
    pub device: Option<String>,

    /// Initial values. Empty means zeros.
    #[serde(default)]
    pub values: Vec<f64>,
}

/// One constraint entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ConstraintSpec {
    /// Prior on one variable.
    Absolute {
        variable: String,
        mean: Vec<f64>,
        covariance: Vec<f64>,
        #[serde(default)]
        loss: Option<RobustLoss>,
    },

    /// Measured change from one variable to another of the same kind.
    Relative {
        from: String,
        to: String,
        delta: Vec<f64>,
        covariance: Vec<f64>,
        #[serde(default)]
        loss: Option<RobustLoss>,
    },
}

/// A complete scenario file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub variables: Vec<VariableSpec>,

    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
}

/// A scenario built into a graph.
#[derive(Debug, Clone, Default)]
pub struct BuiltScenario {
    pub graph: MemoryGraph,

    /// Label -> identifier, for every variable entry.
    pub labels: BTreeMap<String, Identifier>,

    /// Number of variable entries that resolved to an existing variable.
    pub deduplicated: usize,
}

// =============================================================================
// LOADING
// =============================================================================

impl Scenario {
    /// Parse scenario text.
    pub fn parse(text: &str) -> Result<Self, StrandError> {
        toml::from_str(text).map_err(|e| StrandError::Config(format!("Invalid scenario: {}", e)))
    }

    /// Load a scenario from a file.
    pub fn load(path: &Path) -> Result<Self, StrandError> {
        Self::parse(&read_input(path)?)
    }

    /// Build the graph. `default_loss` applies to constraints without a loss.
    ///
    /// Variables are inserted first, so every constraint goes through the
    /// graph's endpoint check.
    pub fn build(
        &self,
        ids: &IdGenerator,
        default_loss: Option<RobustLoss>,
    ) -> Result<BuiltScenario, StrandError> {
        let mut built = BuiltScenario::default();
        let mut kinds_by_label: BTreeMap<&str, &'static str> = BTreeMap::new();

        for spec in &self.variables {
            if built.labels.contains_key(&spec.label) {
                return Err(StrandError::Config(format!(
                    "Duplicate variable label '{}'",
                    spec.label
                )));
            }

            let entry = kinds::lookup(&spec.kind)?;
            let values = if spec.values.is_empty() {
                vec![0.0; entry.size()]
            } else {
                spec.values.clone()
            };

            let variable = match (entry.is_stamped(), spec.stamp) {
                (true, Some(seconds)) => {
                    let stamp = Timestamp::from_secs_f64(seconds).map_err(|_| {
                        StrandError::Config(format!(
                            "Variable '{}' has a non-finite stamp {}",
                            spec.label, seconds
                        ))
                    })?;
                    let device = spec.device.as_deref().map_or(Identifier::NIL, device_id);
                    kinds::stamped_variable(entry.type_name(), stamp, device, &values)?
                }
                (true, None) => {
                    return Err(StrandError::Config(format!(
                        "Variable '{}' of stamped kind {} needs a stamp",
                        spec.label,
                        entry.type_name()
                    )));
                }
                (false, None) if spec.device.is_none() => {
                    kinds::unstamped_variable(entry.type_name(), ids, &values)?
                }
                (false, _) => {
                    return Err(StrandError::Config(format!(
                        "Variable '{}' of kind {} takes no stamp or device",
                        spec.label,
                        entry.type_name()
                    )));
                }
            };

            let id = variable.identifier();
            if !built.graph.add_variable(variable) {
                tracing::info!(
                    "Variable '{}' resolves to existing {}, keeping the first",
                    spec.label,
                    id
                );
                built.deduplicated += 1;
            }
            built.labels.insert(spec.label.clone(), id);
            kinds_by_label.insert(&spec.label, entry.type_name());
        }

        let resolve = |label: &str| -> Result<(Identifier, &'static str), StrandError> {
            match (built.labels.get(label), kinds_by_label.get(label)) {
                (Some(id), Some(kind)) => Ok((*id, *kind)),
                _ => Err(StrandError::Config(format!(
                    "Unknown variable label '{}'",
                    label
                ))),
            }
        };

        let mut constraints = Vec::with_capacity(self.constraints.len());
        for spec in &self.constraints {
            let constraint = match spec {
                ConstraintSpec::Absolute {
                    variable,
                    mean,
                    covariance,
                    loss,
                } => {
                    let (id, kind) = resolve(variable)?;
                    kinds::absolute_constraint(
                        kind,
                        ids,
                        id,
                        mean,
                        covariance,
                        loss.or(default_loss),
                    )?
                }
                ConstraintSpec::Relative {
                    from,
                    to,
                    delta,
                    covariance,
                    loss,
                } => {
                    let (from_id, from_kind) = resolve(from)?;
                    let (to_id, to_kind) = resolve(to)?;
                    if from_kind != to_kind {
                        return Err(StrandError::Config(format!(
                            "Relative constraint between '{}' ({}) and '{}' ({}) mixes kinds",
                            from, from_kind, to, to_kind
                        )));
                    }
                    kinds::relative_constraint(
                        from_kind,
                        ids,
                        from_id,
                        to_id,
                        delta,
                        covariance,
                        loss.or(default_loss),
                    )?
                }
            };
            constraints.push(constraint);
        }

        for constraint in constraints {
            built.graph.add_constraint(constraint)?;
        }

        tracing::debug!(
            "Built scenario {:?}: {} variable(s), {} constraint(s)",
            self.name,
            built.graph.variable_count(),
            built.graph.constraint_count()
        );
        Ok(built)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_POSES: &str = r#"
name = "two poses"

[[variables]]
label = "x0"
kind = "Position2DStamped"
stamp = 0.0
values = [0.0, 0.0]

[[variables]]
label = "x1"
kind = "strand::Position2DStamped"
stamp = 1.0
values = [1.0, 0.0]

[[constraints]]
type = "absolute"
variable = "x0"
mean = [0.0, 0.0]
covariance = [1.0, 0.0, 0.0, 1.0]

[[constraints]]
type = "relative"
from = "x0"
to = "x1"
delta = [1.0, 0.0]
covariance = [1.0, 0.0, 0.0, 1.0]
loss = { type = "huber", delta = 2.0 }
"#;

    #[test]
    fn parses_and_builds() {
        let scenario = Scenario::parse(TWO_POSES).expect("parse");
        assert_eq!(scenario.name.as_deref(), Some("two poses"));

        let built = scenario
            .build(&IdGenerator::seeded(1), None)
            .expect("build");
        assert_eq!(built.graph.variable_count(), 2);
        assert_eq!(built.graph.constraint_count(), 2);
        assert_eq!(built.graph.evaluate_cost(), Ok(0.0));
    }

    #[test]
    fn unknown_label_is_reported() {
        let text = r#"
[[constraints]]
type = "absolute"
variable = "ghost"
mean = [0.0]
covariance = [1.0]
"#;
        let scenario = Scenario::parse(text).expect("parse");
        let result = scenario.build(&IdGenerator::seeded(1), None);
        assert!(matches!(result, Err(StrandError::Config(_))));
    }

    #[test]
    fn stamped_kind_requires_stamp() {
        let text = r#"
[[variables]]
label = "heading"
kind = "Orientation2DStamped"
"#;
        let scenario = Scenario::parse(text).expect("parse");
        assert!(matches!(
            scenario.build(&IdGenerator::seeded(1), None),
            Err(StrandError::Config(_))
        ));
    }

    #[test]
    fn non_finite_stamps_are_rejected() {
        for stamp in ["nan", "inf", "-inf"] {
            let text = format!(
                r#"
[[variables]]
label = "origin"
kind = "Position2DStamped"
stamp = 0.0
values = [1.0, 1.0]

[[variables]]
label = "broken"
kind = "Position2DStamped"
stamp = {}
values = [5.0, 5.0]
"#,
                stamp
            );
            let scenario = Scenario::parse(&text).expect("parse");
            assert!(
                matches!(
                    scenario.build(&IdGenerator::seeded(1), None),
                    Err(StrandError::Config(_))
                ),
                "stamp = {} was accepted",
                stamp
            );
        }
    }

    #[test]
    fn default_loss_fills_gaps() {
        let scenario = Scenario::parse(TWO_POSES).expect("parse");
        let built = scenario
            .build(
                &IdGenerator::seeded(1),
                Some(RobustLoss::Cauchy { scale: 1.0 }),
            )
            .expect("build");
        for id in built.graph.constraint_ids() {
            let constraint = built.graph.get_constraint(id).expect("constraint");
            assert!(constraint.loss_function().is_some());
        }
    }
}
