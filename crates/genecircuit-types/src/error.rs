// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Error Hierarchy
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all simulator failures.
///
/// Most of these never escape `simulate`: the pipeline folds them into
/// result diagnostics. Callers see them from configuration loading,
/// registry parsing and the label classifier.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CircuitError {
    /// A part label (and its hint) matched no known part family.
    #[error("classification error: {0}")]
    Classification(String),

    /// Override key or value could not be applied.
    #[error("override error: {0}")]
    Override(String),

    /// Part registry table is malformed.
    #[error("registry error: {0}")]
    Registry(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Numerical error (NaN/Inf, step-size underflow).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Integrator exhausted its step budget before reaching the horizon.
    #[error("integration stopped after {steps} steps (step budget exhausted)")]
    Integration { steps: usize },

    /// Integrator exceeded the wall-clock guard.
    #[error("timeout: integration exceeded {deadline_ms}ms deadline")]
    Timeout { deadline_ms: u64 },
}

pub type CircuitResult<T> = Result<T, CircuitError>;
