// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Result Types
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::circuit::{Anomaly, CircuitBlock};
use crate::diagnostic::Diagnostic;
use crate::regulation::{RegulationKind, RegulationRecord};

/// Whether the solver ran at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Completed,
    /// Empty input or no CDS anywhere; the solver was not invoked.
    NothingToSimulate,
}

/// Concentration trace for one protein.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProteinSeries {
    pub protein: String,
    pub sequence_index: usize,
    pub circuit: String,
    pub values: Vec<f64>,
}

impl ProteinSeries {
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub time: Vec<f64>,
    pub proteins: Vec<ProteinSeries>,
}

impl TimeSeries {
    pub fn protein(&self, label: &str) -> Option<&ProteinSeries> {
        self.proteins.iter().find(|p| p.protein == label)
    }
}

/// One multiplicative factor in a protein's production term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryTerm {
    pub kind: RegulationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// "Kr" or "Ka"; absent for unit factors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<f64>,
    /// Fixed level used for environmental dosing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concentration: Option<f64>,
}

/// Machine-readable form of
/// `dP/dt = k0 + kprod * Π f_j(p) - degradation_rate * P`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationDescriptor {
    pub protein: String,
    pub circuit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rbs: Option<String>,
    pub kprod: f64,
    pub k0: f64,
    pub degradation_rate: f64,
    pub initial_conc: f64,
    pub terms: Vec<RegulatoryTerm>,
}

impl EquationDescriptor {
    pub fn kinds(&self) -> Vec<RegulationKind> {
        self.terms.iter().map(|t| t.kind).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalConcentration {
    pub protein: String,
    pub value: f64,
}

/// Everything one simulation request produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub status: SimulationStatus,
    pub circuits: Vec<CircuitBlock>,
    /// Parts left in blocks that were discarded (no CDS).
    pub outside_any_circuit: Vec<Anomaly>,
    /// Parts whose label could not be classified.
    pub unrecognized: Vec<Anomaly>,
    pub regulations: Vec<RegulationRecord>,
    pub unpaired_regulators: Vec<String>,
    pub time_series: TimeSeries,
    pub final_concentrations: Vec<FinalConcentration>,
    pub equations: Vec<EquationDescriptor>,
    /// Initial conditions were replaced by the symmetry-breaking seed.
    pub symmetry_seeded: bool,
    pub warnings: Vec<Diagnostic>,
}

impl SimulationResult {
    /// Empty result for input that has nothing to integrate.
    pub fn nothing_to_simulate(warnings: Vec<Diagnostic>) -> Self {
        Self {
            status: SimulationStatus::NothingToSimulate,
            circuits: Vec::new(),
            outside_any_circuit: Vec::new(),
            unrecognized: Vec::new(),
            regulations: Vec::new(),
            unpaired_regulators: Vec::new(),
            time_series: TimeSeries::default(),
            final_concentrations: Vec::new(),
            equations: Vec::new(),
            symmetry_seeded: false,
            warnings,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == SimulationStatus::Completed
    }

    pub fn final_concentration(&self, protein: &str) -> Option<f64> {
        self.final_concentrations
            .iter()
            .find(|f| f.protein == protein)
            .map(|f| f.value)
    }

    pub fn equation(&self, protein: &str) -> Option<&EquationDescriptor> {
        self.equations.iter().find(|e| e.protein == protein)
    }
}
