// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Simulation Configuration
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{CircuitError, CircuitResult};

/// Upper bound on `n_samples`; each sample stores one value per protein.
pub const MAX_SAMPLES: usize = 1_000_000;

/// Runtime configuration for one simulation pass.
///
/// Everything here is read-only during a run; two requests with
/// different configs never share state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Horizon start (time units).
    /// Default: 0.0.
    pub t_start: f64,

    /// Horizon end (time units).
    /// Default: 24.0.
    pub t_end: f64,

    /// Number of output samples, endpoints included.
    /// Default: 241 (one sample per 0.1 time units over the default horizon).
    /// Bounded by [`MAX_SAMPLES`].
    pub n_samples: usize,

    /// Relative tolerance for the adaptive step controller.
    /// Default: 1e-6.
    pub rtol: f64,

    /// Absolute tolerance for the adaptive step controller.
    /// Default: 1e-9.
    pub atol: f64,

    /// Hard cap on attempted integrator steps (accepted + rejected).
    /// Default: 200_000.
    pub max_steps: usize,

    /// Wall-clock guard around the integrator call, in milliseconds.
    /// Default: 5_000.
    pub deadline_ms: u64,

    /// Basal leak as a fraction of the full production rate.
    /// Default: 0.01.
    pub basal_leak_fraction: f64,

    /// Inject asymmetric initial conditions into all-zero cyclic circuits.
    /// Default: true.
    pub symmetry_breaking: bool,

    /// Seed values, cycled across the state vector when injection fires.
    /// Default: [1.0, 0.1, 0.05].
    pub symmetry_seed: Vec<f64>,

    /// Shortest feedback cycle that triggers seed injection.
    /// Default: 3.
    pub min_cycle_length: usize,

    /// Apply floating regulators at their fixed concentration instead
    /// of treating them as a unit factor.
    /// Default: false.
    pub environmental_dosing: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            t_start: 0.0,
            t_end: 24.0,
            n_samples: 241,
            rtol: 1e-6,
            atol: 1e-9,
            max_steps: 200_000,
            deadline_ms: 5_000,
            basal_leak_fraction: 0.01,
            symmetry_breaking: true,
            symmetry_seed: vec![1.0, 0.1, 0.05],
            min_cycle_length: 3,
            environmental_dosing: false,
        }
    }
}

impl SimulationConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> CircuitResult<()> {
        if !self.t_start.is_finite() || !self.t_end.is_finite() {
            return Err(CircuitError::Config(format!(
                "horizon must be finite, got [{}, {}]",
                self.t_start, self.t_end
            )));
        }
        if !(self.t_end - self.t_start).is_finite() {
            return Err(CircuitError::Config(format!(
                "horizon span must be finite, got [{}, {}]",
                self.t_start, self.t_end
            )));
        }
        if self.t_end <= self.t_start {
            return Err(CircuitError::Config(format!(
                "t_end must be > t_start, got [{}, {}]",
                self.t_start, self.t_end
            )));
        }
        if self.n_samples < 2 {
            return Err(CircuitError::Config(format!(
                "n_samples must be >= 2, got {}",
                self.n_samples
            )));
        }
        if self.n_samples > MAX_SAMPLES {
            return Err(CircuitError::Config(format!(
                "n_samples must be <= {MAX_SAMPLES}, got {}",
                self.n_samples
            )));
        }
        if !(self.rtol > 0.0 && self.rtol < 1.0) {
            return Err(CircuitError::Config(format!(
                "rtol must be in (0, 1), got {}",
                self.rtol
            )));
        }
        if !(self.atol > 0.0) {
            return Err(CircuitError::Config(format!(
                "atol must be > 0, got {}",
                self.atol
            )));
        }
        if self.max_steps == 0 {
            return Err(CircuitError::Config("max_steps must be > 0".to_string()));
        }
        if self.deadline_ms == 0 {
            return Err(CircuitError::Config("deadline_ms must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.basal_leak_fraction) {
            return Err(CircuitError::Config(format!(
                "basal_leak_fraction must be in [0, 1], got {}",
                self.basal_leak_fraction
            )));
        }
        if self.symmetry_breaking {
            if self.symmetry_seed.is_empty() {
                return Err(CircuitError::Config(
                    "symmetry_seed must not be empty when symmetry_breaking is on".to_string(),
                ));
            }
            if self.symmetry_seed.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(CircuitError::Config(format!(
                    "symmetry_seed values must be finite and >= 0, got {:?}",
                    self.symmetry_seed
                )));
            }
        }
        if self.min_cycle_length < 2 {
            return Err(CircuitError::Config(format!(
                "min_cycle_length must be >= 2, got {}",
                self.min_cycle_length
            )));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> CircuitResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CircuitError::Config(format!("JSON parse error: {e}")))
    }

    /// Evenly spaced sample times over the horizon, endpoints included.
    pub fn sample_times(&self) -> Vec<f64> {
        let n = self.n_samples.max(2);
        let span = self.t_end - self.t_start;
        (0..n)
            .map(|i| {
                if i == n - 1 {
                    self.t_end
                } else {
                    self.t_start + span * i as f64 / (n - 1) as f64
                }
            })
            .collect()
    }
}
