// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — PyO3 FFI Bindings
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied, PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the simulation pipeline.
//!
//! Requests and results cross the boundary as JSON strings, so the
//! Python side sees the same shapes as `serde_json` produces here.
//!
//! # FFI Safety
//!
//! - The GIL is released for the whole simulation (`allow_threads`).
//! - Config is validated before storage (`SimulationConfig::validate()`).
//! - Parse and validation errors surface as `ValueError`; simulation
//!   problems come back as warnings inside the result, never as raises.
//!
//! Usage from Python:
//! ```python
//! from genecircuit import CircuitSimulator, SimulationConfig
//!
//! sim = CircuitSimulator(SimulationConfig(t_end=48.0))
//! result_json = sim.simulate(request_json)
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use genecircuit_core::{CircuitSimulator, SimulationRequest};
use genecircuit_params::PartRegistry;
use genecircuit_types::{SimulationConfig, SimulationResult};

fn to_json(result: &SimulationResult) -> PyResult<String> {
    serde_json::to_string(result).map_err(|e| PyValueError::new_err(e.to_string()))
}

fn parse_request(json: &str) -> PyResult<SimulationRequest> {
    SimulationRequest::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))
}

// ─── PySimulationConfig ─────────────────────────────────────────────

/// Python-visible solver and seeding configuration.
#[pyclass(name = "SimulationConfig")]
#[derive(Clone)]
struct PySimulationConfig {
    inner: SimulationConfig,
}

#[pymethods]
impl PySimulationConfig {
    #[new]
    #[pyo3(signature = (
        t_start = 0.0,
        t_end = 24.0,
        n_samples = 241,
        rtol = 1e-6,
        atol = 1e-9,
        max_steps = 200_000,
        deadline_ms = 5_000,
        basal_leak_fraction = 0.01,
        symmetry_breaking = true,
        symmetry_seed = None,
        min_cycle_length = 3,
        environmental_dosing = false,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        t_start: f64,
        t_end: f64,
        n_samples: usize,
        rtol: f64,
        atol: f64,
        max_steps: usize,
        deadline_ms: u64,
        basal_leak_fraction: f64,
        symmetry_breaking: bool,
        symmetry_seed: Option<Vec<f64>>,
        min_cycle_length: usize,
        environmental_dosing: bool,
    ) -> PyResult<Self> {
        let config = SimulationConfig {
            t_start,
            t_end,
            n_samples,
            rtol,
            atol,
            max_steps,
            deadline_ms,
            basal_leak_fraction,
            symmetry_breaking,
            symmetry_seed: symmetry_seed
                .unwrap_or_else(|| SimulationConfig::default().symmetry_seed),
            min_cycle_length,
            environmental_dosing,
        };
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string. Missing fields take their defaults.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config =
            SimulationConfig::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner: config })
    }

    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    #[getter]
    fn t_end(&self) -> f64 {
        self.inner.t_end
    }

    #[getter]
    fn n_samples(&self) -> usize {
        self.inner.n_samples
    }

    #[getter]
    fn symmetry_breaking(&self) -> bool {
        self.inner.symmetry_breaking
    }

    fn __repr__(&self) -> String {
        format!(
            "SimulationConfig(t=[{}, {}], n_samples={}, rtol={}, symmetry_breaking={})",
            self.inner.t_start,
            self.inner.t_end,
            self.inner.n_samples,
            self.inner.rtol,
            self.inner.symmetry_breaking
        )
    }
}

// ─── PyCircuitSimulator ─────────────────────────────────────────────

/// Python-visible simulator holding a default registry and config.
#[pyclass(name = "CircuitSimulator")]
struct PyCircuitSimulator {
    inner: CircuitSimulator,
}

#[pymethods]
impl PyCircuitSimulator {
    /// `registry_json` replaces the built-in part table when given.
    #[new]
    #[pyo3(signature = (config = None, registry_json = None))]
    fn new(config: Option<PySimulationConfig>, registry_json: Option<&str>) -> PyResult<Self> {
        let registry = match registry_json {
            Some(json) => {
                PartRegistry::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?
            }
            None => PartRegistry::builtin(),
        };
        let config = config.map(|c| c.inner).unwrap_or_default();
        let inner = CircuitSimulator::new(registry, config)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Simulate one JSON request; returns the JSON result.
    fn simulate(&self, py: Python<'_>, request_json: &str) -> PyResult<String> {
        let request = parse_request(request_json)?;
        let result = py.allow_threads(|| self.inner.simulate(&request));
        to_json(&result)
    }

    /// Simulate independent JSON requests in parallel.
    fn simulate_batch(&self, py: Python<'_>, requests: Vec<String>) -> PyResult<Vec<String>> {
        let requests = requests
            .iter()
            .map(|json| parse_request(json))
            .collect::<PyResult<Vec<_>>>()?;
        let results = py.allow_threads(|| self.inner.simulate_batch(&requests));
        results.iter().map(to_json).collect()
    }

    fn registry_json(&self) -> PyResult<String> {
        self.inner
            .registry()
            .to_json()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "CircuitSimulator(parts={}, t_end={})",
            self.inner.registry().len(),
            self.inner.config().t_end
        )
    }
}

// ─── Free functions ─────────────────────────────────────────────────

/// One-shot simulation against the built-in registry.
#[pyfunction]
#[pyo3(signature = (request_json, config = None))]
fn simulate_json(
    py: Python<'_>,
    request_json: &str,
    config: Option<PySimulationConfig>,
) -> PyResult<String> {
    let request = parse_request(request_json)?;
    let config = config.map(|c| c.inner).unwrap_or_default();
    let registry = PartRegistry::builtin();
    let result = py.allow_threads(|| genecircuit_core::simulate(&registry, &request, &config));
    to_json(&result)
}

/// The built-in part table as JSON.
#[pyfunction]
fn default_registry_json() -> PyResult<String> {
    PartRegistry::builtin()
        .to_json()
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

// ─── Module ─────────────────────────────────────────────────────────

/// Python module `genecircuit`.
///
/// Exposes:
/// - `SimulationConfig` — solver and seeding configuration
/// - `CircuitSimulator` — registry plus config, JSON in and out
/// - `simulate_json` — one-shot run on the built-in registry
/// - `default_registry_json` — the built-in part table
#[pymodule]
fn genecircuit(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySimulationConfig>()?;
    m.add_class::<PyCircuitSimulator>()?;
    m.add_function(wrap_pyfunction!(simulate_json, m)?)?;
    m.add_function(wrap_pyfunction!(default_registry_json, m)?)?;
    Ok(())
}
