// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Simulation Pipeline
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! One request runs override resolution → assembly → regulation →
//! ODE integration against a shared, read-only default registry.
//!
//! Every stage reports through diagnostics, so `simulate` always returns
//! a `SimulationResult`. Requests in a batch share nothing mutable and
//! run on the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use genecircuit_params::{resolve_parameters, OverrideRequest, PartRegistry};
use genecircuit_types::{
    CircuitError, CircuitResult, Diagnostic, DiagnosticCategory, SequenceEntry,
    SimulationConfig, SimulationResult, SimulationStatus,
};

use crate::assembler::assemble;
use crate::regulation::resolve;

/// Input of one simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Position-ordered parts with explicit gaps between blocks.
    pub parts: Vec<SequenceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<OverrideRequest>,
}

impl SimulationRequest {
    pub fn new(parts: Vec<SequenceEntry>) -> Self {
        Self {
            parts,
            overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideRequest) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn from_json(json: &str) -> CircuitResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CircuitError::Config(format!("request JSON parse error: {e}")))
    }
}

/// Default registry plus validated configuration.
#[derive(Debug, Clone)]
pub struct CircuitSimulator {
    registry: PartRegistry,
    config: SimulationConfig,
}

impl Default for CircuitSimulator {
    fn default() -> Self {
        Self {
            registry: PartRegistry::builtin(),
            config: SimulationConfig::default(),
        }
    }
}

impl CircuitSimulator {
    pub fn new(registry: PartRegistry, config: SimulationConfig) -> CircuitResult<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn registry(&self) -> &PartRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn simulate(&self, request: &SimulationRequest) -> SimulationResult {
        run(&self.registry, request, &self.config)
    }

    pub fn simulate_batch(&self, requests: &[SimulationRequest]) -> Vec<SimulationResult> {
        requests
            .par_iter()
            .map(|request| self.simulate(request))
            .collect()
    }
}

/// Simulate one request. An invalid `config` yields a
/// nothing-to-simulate result carrying the validation error.
pub fn simulate(
    registry: &PartRegistry,
    request: &SimulationRequest,
    config: &SimulationConfig,
) -> SimulationResult {
    if let Err(e) = config.validate() {
        return SimulationResult::nothing_to_simulate(vec![Diagnostic::warn(
            DiagnosticCategory::Input,
            e.to_string(),
        )]);
    }
    run(registry, request, config)
}

/// Simulate independent requests in parallel.
pub fn simulate_batch(
    registry: &PartRegistry,
    requests: &[SimulationRequest],
    config: &SimulationConfig,
) -> Vec<SimulationResult> {
    requests
        .par_iter()
        .map(|request| simulate(registry, request, config))
        .collect()
}

fn run(
    registry: &PartRegistry,
    request: &SimulationRequest,
    config: &SimulationConfig,
) -> SimulationResult {
    let part_count = request
        .parts
        .iter()
        .filter(|e| matches!(e, SequenceEntry::Part(_)))
        .count();
    if part_count == 0 {
        return SimulationResult::nothing_to_simulate(vec![Diagnostic::warn(
            DiagnosticCategory::Input,
            "empty part list; nothing to simulate",
        )]);
    }

    let effective = resolve_parameters(registry, request.overrides.as_ref());
    let mut warnings = effective.diagnostics;
    log::debug!("overrides applied: {:?}", effective.applied);

    let assembly = assemble(&request.parts, &effective.registry);
    warnings.extend(assembly.diagnostics);

    if assembly.circuits.is_empty() {
        warnings.push(Diagnostic::warn(
            DiagnosticCategory::Input,
            "no circuit contains a coding sequence; nothing to simulate",
        ));
        let mut result = SimulationResult::nothing_to_simulate(warnings);
        result.outside_any_circuit = assembly.outside_any_circuit;
        result.unrecognized = assembly.unrecognized;
        return result;
    }

    let regulation = resolve(&assembly.circuits, &assembly.floating_regulators);
    warnings.extend(regulation.diagnostics);

    let ode = genecircuit_ode::simulate(&assembly.circuits, &regulation.records, config);
    warnings.extend(ode.diagnostics);

    log::info!(
        "simulated {} proteins in {} circuits ({} regulations, {} warnings)",
        ode.final_concentrations.len(),
        assembly.circuits.len(),
        regulation.records.len(),
        warnings.len()
    );

    SimulationResult {
        status: SimulationStatus::Completed,
        circuits: assembly.circuits,
        outside_any_circuit: assembly.outside_any_circuit,
        unrecognized: assembly.unrecognized,
        regulations: regulation.records,
        unpaired_regulators: regulation.unpaired_regulators,
        time_series: ode.time_series,
        final_concentrations: ode.final_concentrations,
        equations: ode.equations,
        symmetry_seeded: ode.symmetry_seeded,
        warnings,
    }
}
