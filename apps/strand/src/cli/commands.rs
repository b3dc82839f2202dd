//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::StrandConfig;
use crate::scenario::{BuiltScenario, Scenario};
use std::path::Path;
use strand_core::{Graph, Identifier, StrandError, Timestamp, device_id, kinds};

/// Print a JSON value, pretty printed.
fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Load and build a scenario with the configured generator and loss.
fn build_scenario(config: &StrandConfig, path: &Path) -> Result<BuiltScenario, StrandError> {
    tracing::info!("Loading scenario from {:?}", path);
    let scenario = Scenario::load(path)?;
    scenario.build(&config.id_generator(), config.default_loss)
}

// =============================================================================
// ID COMMAND
// =============================================================================

/// Print the identifier of a stamped variable.
pub fn cmd_id(
    kind: Option<&str>,
    seconds: f64,
    device: Option<&str>,
    json_mode: bool,
) -> Result<(), StrandError> {
    let kind = kind.ok_or_else(|| StrandError::InvalidParameter("missing --kind".to_string()))?;
    let stamp = Timestamp::from_secs_f64(seconds)?;
    let entry = kinds::lookup(kind)?;
    let device = device.map_or(Identifier::NIL, device_id);
    let id = kinds::stamped_identifier(entry.type_name(), stamp, device)?;

    if json_mode {
        print_json(&serde_json::json!({
            "kind": entry.type_name(),
            "stamp": stamp.to_string(),
            "device": device.to_string(),
            "id": id.to_string(),
        }));
        return Ok(());
    }

    println!("{}", id);
    Ok(())
}

/// Print a random identifier from the configured source.
pub fn cmd_random_id(config: &StrandConfig, json_mode: bool) -> Result<(), StrandError> {
    let id = config.id_generator().random();

    if json_mode {
        print_json(&serde_json::json!({
            "id": id.to_string(),
            "seeded": config.seed.is_some(),
        }));
        return Ok(());
    }

    println!("{}", id);
    Ok(())
}

// =============================================================================
// KINDS COMMAND
// =============================================================================

/// List every registered variable kind and its constraint kinds.
pub fn cmd_kinds(json_mode: bool) -> Result<(), StrandError> {
    let mut entries = Vec::new();
    for name in kinds::variable_type_names() {
        entries.push(kinds::lookup(name)?);
    }

    if json_mode {
        let output: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "type_name": entry.type_name(),
                    "size": entry.size(),
                    "components": entry.components(),
                    "stamped": entry.is_stamped(),
                    "absolute_constraint": entry.absolute_constraint(),
                    "relative_constraint": entry.relative_constraint(),
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(output));
        return Ok(());
    }

    println!("Variable Kinds");
    println!("==============");
    for entry in &entries {
        println!(
            "{} [{}]{}",
            entry.type_name(),
            entry.components().join(", "),
            if entry.is_stamped() { "" } else { " (unstamped)" }
        );
        println!("  {}", entry.absolute_constraint());
        println!("  {}", entry.relative_constraint());
    }

    Ok(())
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Build a scenario and print the graph with its total cost.
pub fn cmd_run(config: &StrandConfig, path: &Path, json_mode: bool) -> Result<(), StrandError> {
    let built = build_scenario(config, path)?;
    let cost = built.graph.evaluate_cost()?;

    if json_mode {
        print_json(&graph_json(&built, cost));
        return Ok(());
    }

    print!("{}", &built.graph as &dyn Graph);
    println!();
    println!("Total cost: {}", cost);
    Ok(())
}

/// JSON rendering of a built scenario.
fn graph_json(built: &BuiltScenario, cost: f64) -> serde_json::Value {
    let graph = &built.graph;
    let variables: Vec<serde_json::Value> = graph
        .variable_ids()
        .into_iter()
        .filter_map(|id| graph.get_variable(id))
        .map(|variable| {
            let mut value = serde_json::json!({
                "id": variable.identifier().to_string(),
                "type": variable.type_name(),
                "data": variable.data(),
            });
            if let Some(stamped) = variable.as_stamped() {
                value["stamp"] = serde_json::json!(stamped.timestamp().to_string());
                value["device"] = serde_json::json!(stamped.device_id().to_string());
            }
            value
        })
        .collect();
    let constraints: Vec<serde_json::Value> = graph
        .constraint_ids()
        .into_iter()
        .filter_map(|id| graph.get_constraint(id))
        .map(|constraint| {
            serde_json::json!({
                "id": constraint.identifier().to_string(),
                "type": constraint.type_name(),
                "variables": constraint
                    .variables()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::json!({
        "labels": built
            .labels
            .iter()
            .map(|(label, id)| (label.clone(), serde_json::json!(id.to_string())))
            .collect::<serde_json::Map<_, _>>(),
        "variables": variables,
        "constraints": constraints,
        "cost": cost,
    })
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Validate a scenario: it parses, builds, and every constraint evaluates.
pub fn cmd_check(config: &StrandConfig, path: &Path, json_mode: bool) -> Result<(), StrandError> {
    let built = build_scenario(config, path)?;
    built.graph.evaluate_cost()?;

    if json_mode {
        print_json(&serde_json::json!({
            "valid": true,
            "variables": built.graph.variable_count(),
            "constraints": built.graph.constraint_count(),
            "deduplicated": built.deduplicated,
        }));
        return Ok(());
    }

    println!(
        "Scenario OK: {} variable(s), {} constraint(s)",
        built.graph.variable_count(),
        built.graph.constraint_count()
    );
    if built.deduplicated > 0 {
        println!(
            "  {} variable entr{} resolved to an existing identity",
            built.deduplicated,
            if built.deduplicated == 1 { "y" } else { "ies" }
        );
    }
    Ok(())
}
