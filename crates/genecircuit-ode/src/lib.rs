// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — ODE Engine
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Hill kinetics, the gene-expression ODE compiler, feedback-cycle
//! detection and the adaptive Dormand-Prince integrator.

pub mod hill;
pub mod integrator;
pub mod system;
pub mod topology;

pub use hill::{hill_activation, hill_factor, hill_repression};
pub use integrator::{DormandPrince, OdeSystem, Trajectory};
pub use system::{Factor, FactorInput, Gene, GeneSystem};
pub use topology::{apply_seed, needs_symmetry_breaking, RegulatoryGraph};

use genecircuit_types::{
    CircuitBlock, Diagnostic, DiagnosticCategory, EquationDescriptor, FinalConcentration,
    ProteinSeries, RegulationRecord, SimulationConfig, TimeSeries,
};

/// Everything the numerical stage contributes to a result.
#[derive(Debug, Clone, PartialEq)]
pub struct OdeOutcome {
    pub time_series: TimeSeries,
    pub final_concentrations: Vec<FinalConcentration>,
    pub equations: Vec<EquationDescriptor>,
    pub symmetry_seeded: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile and integrate. Pure given its inputs; never fails.
///
/// A solver stop (step budget, deadline, step-size underflow) keeps the
/// samples reached so far and adds a numerical diagnostic.
pub fn simulate(
    circuits: &[CircuitBlock],
    regulations: &[RegulationRecord],
    config: &SimulationConfig,
) -> OdeOutcome {
    let (system, mut diagnostics) = GeneSystem::compile(circuits, regulations, config);

    let mut y0 = system.initial_state();
    let symmetry_seeded = needs_symmetry_breaking(&system.graph(), &y0, config);
    if symmetry_seeded {
        apply_seed(&mut y0, &config.symmetry_seed);
        diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Numerical,
            format!(
                "all-zero initial state on a feedback cycle of length >= {}; seeded with {:?}",
                config.min_cycle_length, y0
            ),
        ));
    }

    let t_eval = config.sample_times();
    let trajectory = DormandPrince::from_config(config).integrate(&system, &y0, &t_eval);
    if let Some(stop) = &trajectory.stop {
        diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Numerical,
            format!(
                "{stop}; returning {} of {} samples",
                trajectory.time.len(),
                t_eval.len()
            ),
        ));
    }

    let proteins: Vec<ProteinSeries> = system
        .genes()
        .iter()
        .enumerate()
        .map(|(i, gene)| ProteinSeries {
            protein: gene.protein.clone(),
            sequence_index: gene.sequence_index,
            circuit: gene.circuit.clone(),
            values: trajectory.component(i),
        })
        .collect();

    diagnostics.extend(sample_diagnostics(&proteins));

    let final_concentrations = proteins
        .iter()
        .filter_map(|s| {
            s.last().map(|value| FinalConcentration {
                protein: s.protein.clone(),
                value,
            })
        })
        .collect();

    log::debug!(
        "integrated {} proteins over {} samples (seeded: {symmetry_seeded})",
        proteins.len(),
        trajectory.time.len()
    );

    OdeOutcome {
        time_series: TimeSeries {
            time: trajectory.time,
            proteins,
        },
        final_concentrations,
        equations: system.equations(),
        symmetry_seeded,
        diagnostics,
    }
}

/// NaN and negative-concentration warnings, one per affected protein.
pub fn sample_diagnostics(proteins: &[ProteinSeries]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for series in proteins {
        let nan = series.values.iter().filter(|v| v.is_nan()).count();
        let negative = series.values.iter().filter(|v| **v < 0.0).count();
        if nan > 0 {
            diagnostics.push(Diagnostic::warn(
                DiagnosticCategory::Numerical,
                format!("{}: {nan} NaN samples", series.protein),
            ));
        }
        if negative > 0 {
            diagnostics.push(Diagnostic::warn(
                DiagnosticCategory::Numerical,
                format!(
                    "{}: {negative} negative samples (min {:.3e})",
                    series.protein,
                    series.min()
                ),
            ));
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    use genecircuit_types::CircuitError;

    /// Constant drain: dy/dt = -1.
    struct Drain;

    impl OdeSystem for Drain {
        fn dimension(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, _y: &[f64], dydt: &mut [f64]) {
            dydt[0] = -1.0;
        }
    }

    struct Poisoned;

    impl OdeSystem for Poisoned {
        fn dimension(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, _y: &[f64], dydt: &mut [f64]) {
            dydt[0] = f64::NAN;
        }
    }

    fn series(name: &str, trajectory: &Trajectory) -> ProteinSeries {
        ProteinSeries {
            protein: name.to_string(),
            sequence_index: 0,
            circuit: "circuit_1".to_string(),
            values: trajectory.component(0),
        }
    }

    fn times(n: usize, t_end: f64) -> Vec<f64> {
        (0..n).map(|i| t_end * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn test_negative_samples_are_reported() {
        // y = 0.45 - t goes negative from t = 0.5 on
        let traj = DormandPrince::default().integrate(&Drain, &[0.45], &times(11, 1.0));
        assert!(traj.is_complete());
        let diags = sample_diagnostics(&[series("cds_1", &traj)]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].category, DiagnosticCategory::Numerical);
        assert!(
            diags[0].message.starts_with("cds_1: 6 negative samples"),
            "{}",
            diags[0].message
        );
    }

    #[test]
    fn test_nan_rhs_stops_with_underflow() {
        let traj = DormandPrince::default().integrate(&Poisoned, &[1.0], &times(5, 1.0));
        assert!(matches!(
            traj.stop,
            Some(CircuitError::Numerical(ref m)) if m.contains("underflow")
        ));
        assert_eq!(traj.time.len(), 1);
    }

    #[test]
    fn test_nan_state_is_reported() {
        let traj = DormandPrince::default().integrate(&Drain, &[f64::NAN], &times(5, 1.0));
        assert!(!traj.is_complete());
        let diags = sample_diagnostics(&[series("cds_2", &traj)]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "cds_2: 1 NaN samples");
    }

    #[test]
    fn test_clean_series_has_no_diagnostics() {
        let traj = DormandPrince::default().integrate(&Drain, &[5.0], &times(11, 1.0));
        assert!(sample_diagnostics(&[series("cds_1", &traj)]).is_empty());
    }

    #[test]
    fn test_zero_deadline_times_out() {
        let solver = DormandPrince {
            deadline: Some(std::time::Duration::ZERO),
            ..Default::default()
        };
        let traj = solver.integrate(&Drain, &[5.0], &times(11, 1.0));
        assert!(matches!(traj.stop, Some(CircuitError::Timeout { deadline_ms: 0 })));
        assert_eq!(traj.time, vec![0.0]);
    }
}
