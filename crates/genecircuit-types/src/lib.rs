// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Types
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Part taxonomy, circuit blocks, regulation records, configuration,
//! diagnostics and the error hierarchy shared by every simulator crate.

pub mod circuit;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod part;
pub mod regulation;
pub mod result;

pub use circuit::{
    Anomaly, CircuitAnomalies, CircuitBlock, CircuitIndex, ComponentCounts, RbsLayout,
};
pub use config::{SimulationConfig, MAX_SAMPLES};
pub use diagnostic::{Diagnostic, DiagnosticCategory};
pub use error::{CircuitError, CircuitResult};
pub use part::{
    classify_label, PartCategory, PartInput, PartInstance, PartKind, PartParameters,
    RegulatorKind, RegulatorRole, SequenceEntry,
};
pub use regulation::{HillMode, HillParams, RegulationKind, RegulationRecord};
pub use result::{
    EquationDescriptor, FinalConcentration, ProteinSeries, RegulatoryTerm, SimulationResult,
    SimulationStatus, TimeSeries,
};
