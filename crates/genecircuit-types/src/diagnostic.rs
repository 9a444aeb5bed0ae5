// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Diagnostics
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which stage raised a non-fatal irregularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    /// Empty or unusable input.
    Input,
    /// Override key/value rejected or out of its dial range.
    Override,
    /// Duplicate, misplaced or orphaned parts.
    Structural,
    /// Unpaired regulators, unresolved targets.
    Regulation,
    /// NaN, negative concentrations, solver stops.
    Numerical,
}

/// A warning attached to a simulation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub message: String,
}

impl Diagnostic {
    /// Build a diagnostic and emit it on the `log` facade at warn level.
    pub fn warn(category: DiagnosticCategory, message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("[{category}] {message}");
        Self { category, message }
    }
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Input => "input",
            Self::Override => "override",
            Self::Structural => "structural",
            Self::Regulation => "regulation",
            Self::Numerical => "numerical",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}
