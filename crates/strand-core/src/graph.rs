//! # Graph Composition
//!
//! The contract an estimation graph fulfils, and a reference in-memory
//! container.
//!
//! A graph owns variables and constraints; constraints name their variables
//! by identifier and the graph resolves those names. Because stamped
//! variables derive their identity from content, two components that
//! independently build "the position at t from device d" insert the same
//! identifier, and the second insert is a no-op.
//!
//! All storage uses `BTreeMap` so iteration order is deterministic.

use crate::constraint::Constraint;
use crate::cost::block_cost;
use crate::primitives::VALUE_MATCH_TOLERANCE;
use crate::time::Timestamp;
use crate::types::{Identifier, StrandError};
use crate::variable::{Variable, values_match};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// GRAPH TRAIT
// =============================================================================

/// Operations every graph container provides.
///
/// Object safe, so containers can be cloned and printed through
/// `Box<dyn Graph>`.
pub trait Graph: fmt::Debug + Send + Sync {
    /// Insert a variable. Returns `false` (and keeps the existing one) if a
    /// variable with the same identifier is already present.
    fn add_variable(&mut self, variable: Box<dyn Variable>) -> bool;

    /// Check whether a variable is present.
    fn variable_exists(&self, id: Identifier) -> bool;

    /// Read access to a variable.
    fn get_variable(&self, id: Identifier) -> Option<&dyn Variable>;

    /// Write access to a variable's values.
    fn get_variable_mut(&mut self, id: Identifier) -> Option<&mut dyn Variable>;

    /// Remove a variable. Rejected while any constraint references it.
    fn remove_variable(&mut self, id: Identifier) -> Result<Box<dyn Variable>, StrandError>;

    /// Insert a constraint. Duplicate constraint identifiers are rejected;
    /// how endpoints are resolved is the container's insertion policy.
    fn add_constraint(&mut self, constraint: Box<dyn Constraint>) -> Result<(), StrandError>;

    /// Check whether a constraint is present.
    fn constraint_exists(&self, id: Identifier) -> bool;

    /// Read access to a constraint.
    fn get_constraint(&self, id: Identifier) -> Option<&dyn Constraint>;

    /// Remove a constraint.
    fn remove_constraint(&mut self, id: Identifier) -> Result<Box<dyn Constraint>, StrandError>;

    /// Constraints referencing the given variable, in identifier order.
    fn connected_constraints(&self, variable: Identifier) -> Vec<Identifier>;

    /// All variable identifiers, in identifier order.
    fn variable_ids(&self) -> Vec<Identifier>;

    /// All constraint identifiers, in identifier order.
    fn constraint_ids(&self) -> Vec<Identifier>;

    /// Deep copy of the whole container.
    fn clone_graph(&self) -> Box<dyn Graph>;

    /// Write every variable and then every constraint.
    fn print(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(sink, "variables:")?;
        for id in self.variable_ids() {
            if let Some(variable) = self.get_variable(id) {
                variable.print(sink)?;
            }
        }
        writeln!(sink, "constraints:")?;
        for id in self.constraint_ids() {
            if let Some(constraint) = self.get_constraint(id) {
                constraint.print(sink)?;
            }
        }
        Ok(())
    }
}

impl Clone for Box<dyn Graph> {
    fn clone(&self) -> Self {
        self.clone_graph()
    }
}

impl fmt::Display for dyn Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f)
    }
}

// =============================================================================
// IN-MEMORY GRAPH
// =============================================================================

/// Counts reported by [`MemoryGraph::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub variables_added: usize,
    pub constraints_added: usize,

    /// Variables present on both sides whose values disagree. The existing
    /// values were kept.
    pub conflicts: usize,
}

/// Reference in-memory graph.
///
/// Insertion policy: a constraint is only accepted once every endpoint
/// variable is present. [`MemoryGraph::add_constraint_unchecked`] skips that
/// check for loaders that cannot order their input.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    /// Variable storage: Identifier -> Variable
    variables: BTreeMap<Identifier, Box<dyn Variable>>,

    /// Constraint storage: Identifier -> Constraint
    constraints: BTreeMap<Identifier, Box<dyn Constraint>>,

    /// Reverse index: variable -> constraints naming it
    references: BTreeMap<Identifier, BTreeSet<Identifier>>,
}

impl MemoryGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Strict insertion: rejects a variable whose identifier is already
    /// present instead of keeping the existing one.
    pub fn try_add_variable(&mut self, variable: Box<dyn Variable>) -> Result<(), StrandError> {
        let id = variable.identifier();
        if self.add_variable(variable) {
            Ok(())
        } else {
            Err(StrandError::DuplicateVariable(id))
        }
    }

    /// Insert a constraint without checking that its endpoints are present.
    ///
    /// Duplicate constraint identifiers are still rejected.
    pub fn add_constraint_unchecked(
        &mut self,
        constraint: Box<dyn Constraint>,
    ) -> Result<(), StrandError> {
        let id = constraint.identifier();
        if self.constraints.contains_key(&id) {
            return Err(StrandError::DuplicateConstraint(id));
        }
        for variable in constraint.variables() {
            self.references.entry(*variable).or_default().insert(id);
        }
        tracing::debug!(
            "Added constraint {} ({}) over {} variable(s)",
            id,
            constraint.type_name(),
            constraint.variables().len()
        );
        self.constraints.insert(id, constraint);
        Ok(())
    }

    /// Stamped variables strictly older than `stamp`, in identifier order.
    ///
    /// These are the candidates a sliding-window estimator marginalizes out.
    #[must_use]
    pub fn stamped_before(&self, stamp: Timestamp) -> Vec<Identifier> {
        self.variables
            .iter()
            .filter(|(_, variable)| {
                variable
                    .as_stamped()
                    .is_some_and(|stamped| stamped.timestamp() < stamp)
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Total cost `½ Σ ρ(‖r‖²)` at the current variable values.
    ///
    /// Each constraint produces a fresh cost and loss object, which is
    /// dropped before the next constraint is visited.
    pub fn evaluate_cost(&self) -> Result<f64, StrandError> {
        let mut total = 0.0;
        for (id, constraint) in &self.constraints {
            let mut parameters = Vec::with_capacity(constraint.variables().len());
            for variable in constraint.variables() {
                let variable = self
                    .variables
                    .get(variable)
                    .ok_or(StrandError::VariableNotFound(*variable))?;
                parameters.push(variable.data());
            }

            let cost = constraint.cost_function();
            let loss = constraint.loss_function();
            total += block_cost(cost.as_ref(), loss.as_deref(), &parameters).ok_or_else(|| {
                StrandError::InvalidParameter(format!(
                    "constraint {} rejected its parameter blocks",
                    id
                ))
            })?;
        }
        Ok(total)
    }

    /// Whether `variable` shares an identifier with a stored variable that
    /// holds different values.
    #[must_use]
    pub fn conflicts_with(&self, variable: &dyn Variable) -> bool {
        self.variables
            .get(&variable.identifier())
            .is_some_and(|existing| {
                !values_match(existing.as_ref(), variable, VALUE_MATCH_TOLERANCE)
            })
    }

    /// Copy in every variable and constraint of `other` not already present.
    ///
    /// Shared variables keep this graph's values; those whose values differ
    /// are counted as conflicts. Constraints are inserted without the
    /// endpoint check, since `other` is trusted to be internally consistent.
    pub fn merge(&mut self, other: &dyn Graph) -> Result<MergeReport, StrandError> {
        let mut report = MergeReport::default();
        for id in other.variable_ids() {
            let Some(variable) = other.get_variable(id) else {
                continue;
            };
            if self.conflicts_with(variable) {
                report.conflicts += 1;
            }
            if self.add_variable(variable.clone_variable()) {
                report.variables_added += 1;
            }
        }
        for id in other.constraint_ids() {
            if self.constraints.contains_key(&id) {
                continue;
            }
            if let Some(constraint) = other.get_constraint(id) {
                self.add_constraint_unchecked(constraint.clone_constraint())?;
                report.constraints_added += 1;
            }
        }
        tracing::debug!(
            "Merged {} variable(s) and {} constraint(s), {} conflict(s)",
            report.variables_added,
            report.constraints_added,
            report.conflicts
        );
        Ok(report)
    }
}

impl Graph for MemoryGraph {
    fn add_variable(&mut self, variable: Box<dyn Variable>) -> bool {
        let id = variable.identifier();
        if self.conflicts_with(variable.as_ref()) {
            tracing::warn!(
                "Variable {} already present with other values, keeping existing",
                id
            );
            return false;
        }
        if self.variables.contains_key(&id) {
            tracing::debug!("Variable {} already present, keeping existing", id);
            return false;
        }
        tracing::debug!("Added variable {} ({})", id, variable.type_name());
        self.variables.insert(id, variable);
        true
    }

    fn variable_exists(&self, id: Identifier) -> bool {
        self.variables.contains_key(&id)
    }

    fn get_variable(&self, id: Identifier) -> Option<&dyn Variable> {
        self.variables.get(&id).map(|variable| variable.as_ref())
    }

    fn get_variable_mut(&mut self, id: Identifier) -> Option<&mut dyn Variable> {
        self.variables
            .get_mut(&id)
            .map(|variable| &mut **variable as &mut dyn Variable)
    }

    fn remove_variable(&mut self, id: Identifier) -> Result<Box<dyn Variable>, StrandError> {
        if !self.variables.contains_key(&id) {
            return Err(StrandError::VariableNotFound(id));
        }
        let count = self.references.get(&id).map_or(0, BTreeSet::len);
        if count > 0 {
            return Err(StrandError::VariableInUse {
                variable: id,
                count,
            });
        }
        let variable = self
            .variables
            .remove(&id)
            .ok_or(StrandError::VariableNotFound(id))?;
        tracing::debug!("Removed variable {}", id);
        Ok(variable)
    }

    fn add_constraint(&mut self, constraint: Box<dyn Constraint>) -> Result<(), StrandError> {
        let id = constraint.identifier();
        if self.constraints.contains_key(&id) {
            return Err(StrandError::DuplicateConstraint(id));
        }
        if let Some(missing) = constraint
            .variables()
            .iter()
            .find(|variable| !self.variables.contains_key(variable))
        {
            return Err(StrandError::VariableNotFound(*missing));
        }
        self.add_constraint_unchecked(constraint)
    }

    fn constraint_exists(&self, id: Identifier) -> bool {
        self.constraints.contains_key(&id)
    }

    fn get_constraint(&self, id: Identifier) -> Option<&dyn Constraint> {
        self.constraints.get(&id).map(|constraint| constraint.as_ref())
    }

    fn remove_constraint(&mut self, id: Identifier) -> Result<Box<dyn Constraint>, StrandError> {
        let constraint = self
            .constraints
            .remove(&id)
            .ok_or(StrandError::ConstraintNotFound(id))?;
        for variable in constraint.variables() {
            if let Some(users) = self.references.get_mut(variable) {
                users.remove(&id);
                if users.is_empty() {
                    self.references.remove(variable);
                }
            }
        }
        tracing::debug!("Removed constraint {}", id);
        Ok(constraint)
    }

    fn connected_constraints(&self, variable: Identifier) -> Vec<Identifier> {
        self.references
            .get(&variable)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }

    fn variable_ids(&self) -> Vec<Identifier> {
        self.variables.keys().copied().collect()
    }

    fn constraint_ids(&self) -> Vec<Identifier> {
        self.constraints.keys().copied().collect()
    }

    fn clone_graph(&self) -> Box<dyn Graph> {
        Box::new(self.clone())
    }
}

// =============================================================================
// TESTS
// =============================================================================
