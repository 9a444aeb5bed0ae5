// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Gene Expression System
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Compiles circuit blocks and regulation records into one coupled ODE
//! system, one state per CDS:
//!
//!   dP_i/dt = k0_i + kprod_i · Π_j f_j(P) − d_i · P_i
//!
//!   kprod_i = promoter strength × RBS efficiency (nearest upstream)
//!   k0_i    = basal_leak_fraction × kprod_i
//!
//! Regulatory factors combine multiplicatively.

use std::collections::BTreeMap;

use genecircuit_types::part::{
    DEFAULT_DEGRADATION_RATE, DEFAULT_FLOATING_CONCENTRATION, DEFAULT_HILL_COEFFICIENT,
    DEFAULT_INITIAL_CONC, DEFAULT_REGULATOR_THRESHOLD,
};
use genecircuit_types::{
    CircuitBlock, CircuitIndex, Diagnostic, DiagnosticCategory, EquationDescriptor, HillMode,
    HillParams, PartParameters, RegulationKind, RegulationRecord, RegulatoryTerm,
    SimulationConfig,
};

use crate::hill::hill_factor;
use crate::integrator::OdeSystem;
use crate::topology::RegulatoryGraph;

/// One simulated protein.
#[derive(Debug, Clone, PartialEq)]
pub struct Gene {
    pub protein: String,
    pub sequence_index: usize,
    pub circuit: String,
    pub promoter: Option<String>,
    pub rbs: Option<String>,
    pub kprod: f64,
    pub k0: f64,
    pub degradation_rate: f64,
    pub initial_conc: f64,
}

/// What a regulatory factor reads its regulator level from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorInput {
    /// Another (or the same) simulated protein.
    State(usize),
    /// Fixed environmental dose.
    Fixed(f64),
    /// Contributes exactly 1.0.
    Unit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub kind: RegulationKind,
    pub input: FactorInput,
    pub params: HillParams,
    pub source: Option<String>,
    pub concentration: Option<f64>,
}

impl Factor {
    #[inline]
    fn value(&self, y: &[f64]) -> f64 {
        match self.input {
            FactorInput::State(j) => hill_factor(self.kind.mode(), y[j], self.params),
            FactorInput::Fixed(level) => hill_factor(self.kind.mode(), level, self.params),
            FactorInput::Unit => 1.0,
        }
    }

    fn term(&self) -> RegulatoryTerm {
        let mode = self.kind.mode();
        let hill = mode != HillMode::None;
        RegulatoryTerm {
            kind: self.kind,
            source: self.source.clone(),
            threshold_name: hill.then(|| {
                let name = if mode == HillMode::Repression { "Kr" } else { "Ka" };
                name.to_string()
            }),
            threshold: hill.then_some(self.params.threshold),
            n: hill.then_some(self.params.n),
            concentration: self.concentration,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeneSystem {
    genes: Vec<Gene>,
    factors: Vec<Vec<Factor>>,
    /// CDS sequence index → state slot.
    slots: BTreeMap<usize, usize>,
}

impl GeneSystem {
    /// Build the system. Never fails: missing pieces compile to zero
    /// production or unit factors and are reported in the diagnostics.
    pub fn compile(
        circuits: &[CircuitBlock],
        regulations: &[RegulationRecord],
        config: &SimulationConfig,
    ) -> (Self, Vec<Diagnostic>) {
        let mut system = Self::default();
        let mut diagnostics = Vec::new();

        for block in circuits {
            let index = CircuitIndex::build(block);
            for slot in index.cds_slots() {
                let cds = &block.components[slot];
                let (degradation_rate, initial_conc) = match &cds.parameters {
                    Some(PartParameters::Cds {
                        degradation_rate,
                        initial_conc,
                        ..
                    }) if *degradation_rate > 0.0 && *initial_conc >= 0.0 => {
                        (*degradation_rate, *initial_conc)
                    }
                    _ => {
                        diagnostics.push(Diagnostic::warn(
                            DiagnosticCategory::Numerical,
                            format!(
                                "{} has no usable CDS parameters; using degradation {} and initial {}",
                                cds.label, DEFAULT_DEGRADATION_RATE, DEFAULT_INITIAL_CONC
                            ),
                        ));
                        (DEFAULT_DEGRADATION_RATE, DEFAULT_INITIAL_CONC)
                    }
                };

                let promoter = index
                    .governing_promoter(cds.sequence_index)
                    .map(|s| &block.components[s]);
                let rbs = index
                    .upstream_rbs(cds.sequence_index)
                    .map(|s| &block.components[s]);
                let strength = promoter
                    .and_then(|p| p.parameters.as_ref())
                    .and_then(PartParameters::strength)
                    .unwrap_or(0.0);
                let efficiency = rbs
                    .and_then(|p| p.parameters.as_ref())
                    .and_then(PartParameters::efficiency)
                    .unwrap_or(0.0);
                if promoter.is_none() || rbs.is_none() {
                    diagnostics.push(Diagnostic::warn(
                        DiagnosticCategory::Structural,
                        format!(
                            "{} in {} has no upstream {}; its production term is zero",
                            cds.label,
                            block.name,
                            if promoter.is_none() { "promoter" } else { "RBS" }
                        ),
                    ));
                }

                let kprod = strength * efficiency;
                system.slots.insert(cds.sequence_index, system.genes.len());
                system.genes.push(Gene {
                    protein: cds.label.clone(),
                    sequence_index: cds.sequence_index,
                    circuit: block.name.clone(),
                    promoter: promoter.map(|p| p.label.clone()),
                    rbs: rbs.map(|p| p.label.clone()),
                    kprod,
                    k0: config.basal_leak_fraction * kprod,
                    degradation_rate,
                    initial_conc,
                });
            }
        }

        system.factors = vec![Vec::new(); system.genes.len()];
        for record in regulations {
            let Some(factor) = system.factor_for(record, config, &mut diagnostics) else {
                continue;
            };
            for seq in &record.gene_indices {
                if let Some(&i) = system.slots.get(seq) {
                    system.factors[i].push(factor.clone());
                }
            }
        }

        log::debug!(
            "compiled {} genes, {} regulatory factors",
            system.genes.len(),
            system.factors.iter().map(Vec::len).sum::<usize>()
        );
        (system, diagnostics)
    }

    fn factor_for(
        &self,
        record: &RegulationRecord,
        config: &SimulationConfig,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Factor> {
        let params = record.params.unwrap_or(HillParams {
            threshold: DEFAULT_REGULATOR_THRESHOLD,
            n: DEFAULT_HILL_COEFFICIENT,
        });
        let input = match record.kind {
            RegulationKind::Constitutive => FactorInput::Unit,
            kind if kind.is_environmental() => {
                if config.environmental_dosing {
                    FactorInput::Fixed(
                        record
                            .concentration
                            .unwrap_or(DEFAULT_FLOATING_CONCENTRATION),
                    )
                } else {
                    FactorInput::Unit
                }
            }
            _ => match record.source_index.and_then(|s| self.slots.get(&s)) {
                Some(&j) => FactorInput::State(j),
                None => {
                    diagnostics.push(Diagnostic::warn(
                        DiagnosticCategory::Regulation,
                        format!(
                            "{} regulation from {} has no simulated source; dropped",
                            record.kind.as_str(),
                            record.source.as_deref().unwrap_or("<none>")
                        ),
                    ));
                    return None;
                }
            },
        };
        Some(Factor {
            kind: record.kind,
            input,
            params,
            source: record.source.clone(),
            concentration: record.concentration,
        })
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn factors(&self, gene: usize) -> &[Factor] {
        &self.factors[gene]
    }

    pub fn slot_of(&self, sequence_index: usize) -> Option<usize> {
        self.slots.get(&sequence_index).copied()
    }

    pub fn initial_state(&self) -> Vec<f64> {
        self.genes.iter().map(|g| g.initial_conc).collect()
    }

    /// Regulator → regulated-protein edges between simulated states.
    pub fn graph(&self) -> RegulatoryGraph {
        let edges = self.factors.iter().enumerate().flat_map(|(target, fs)| {
            fs.iter().filter_map(move |f| match f.input {
                FactorInput::State(source) => Some((source, target)),
                _ => None,
            })
        });
        RegulatoryGraph::new(self.genes.len(), edges)
    }

    /// `kprod_i · Π f_j` at state `y`.
    pub fn production(&self, i: usize, y: &[f64]) -> f64 {
        let gene = &self.genes[i];
        let f: f64 = self.factors[i].iter().map(|f| f.value(y)).product();
        gene.kprod * f
    }

    pub fn equations(&self) -> Vec<EquationDescriptor> {
        self.genes
            .iter()
            .zip(&self.factors)
            .map(|(g, fs)| EquationDescriptor {
                protein: g.protein.clone(),
                circuit: g.circuit.clone(),
                promoter: g.promoter.clone(),
                rbs: g.rbs.clone(),
                kprod: g.kprod,
                k0: g.k0,
                degradation_rate: g.degradation_rate,
                initial_conc: g.initial_conc,
                terms: fs.iter().map(Factor::term).collect(),
            })
            .collect()
    }
}

impl OdeSystem for GeneSystem {
    fn dimension(&self) -> usize {
        self.genes.len()
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        for (i, gene) in self.genes.iter().enumerate() {
            dydt[i] = gene.k0 + self.production(i, y) - gene.degradation_rate * y[i];
        }
    }
}
