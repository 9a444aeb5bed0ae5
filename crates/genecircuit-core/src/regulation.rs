// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Regulation Resolver
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Pairs start/end regulator markers by family key across all circuits
//! and emits normalized regulation records.
//!
//! - an `end` marker regulates the promoter it directly follows
//! - a `start` marker names the CDS it directly follows as the source
//! - floating regulators act on every authoritative promoter
//! - every CDS left without a record gets one constitutive record
//!
//! Nothing here fails. Irregular designs produce diagnostics and the
//! offending regulation is left out.

use std::collections::{BTreeMap, BTreeSet};

use genecircuit_types::part::{DEFAULT_HILL_COEFFICIENT, DEFAULT_REGULATOR_THRESHOLD};
use genecircuit_types::{
    CircuitBlock, CircuitIndex, Diagnostic, DiagnosticCategory, HillParams, PartCategory,
    PartInstance, PartKind, PartParameters, RegulationKind, RegulationRecord, RegulatorKind,
    RegulatorRole,
};

/// Output of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegulationReport {
    pub records: Vec<RegulationRecord>,
    /// Labels of regulator markers that could not be paired.
    pub unpaired_regulators: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Block and component slot of one marker.
#[derive(Debug, Clone, Copy)]
struct Locus {
    block: usize,
    slot: usize,
}

#[derive(Debug, Default)]
struct Family {
    kind: Option<RegulatorKind>,
    starts: Vec<Locus>,
    ends: Vec<Locus>,
    bare: Vec<Locus>,
}

struct Target {
    block: usize,
    promoter_slot: usize,
    end_slot: usize,
}

struct Resolver<'a> {
    circuits: &'a [CircuitBlock],
    indexes: Vec<CircuitIndex>,
    report: RegulationReport,
}

/// Resolve every regulatory relationship in `circuits`.
///
/// `floating` holds the floating regulator instances collected by the
/// assembler, including those from discarded blocks.
pub fn resolve(circuits: &[CircuitBlock], floating: &[PartInstance]) -> RegulationReport {
    let mut resolver = Resolver {
        circuits,
        indexes: circuits.iter().map(CircuitIndex::build).collect(),
        report: RegulationReport::default(),
    };
    resolver.floating(floating);
    resolver.positional();
    resolver.constitutive();

    let report = resolver.report;
    log::debug!(
        "resolved {} regulation records, {} unpaired regulators",
        report.records.len(),
        report.unpaired_regulators.len()
    );
    report
}

impl<'a> Resolver<'a> {
    fn part(&self, locus: Locus) -> &'a PartInstance {
        &self.circuits[locus.block].components[locus.slot]
    }

    fn warn(&mut self, message: String) {
        self.report
            .diagnostics
            .push(Diagnostic::warn(DiagnosticCategory::Regulation, message));
    }

    /// Genes transcribed from the authoritative promoter of `block`.
    fn genes(&self, block: usize, promoter_slot: usize) -> Vec<&'a PartInstance> {
        let circuit = &self.circuits[block];
        let seq = circuit.components[promoter_slot].sequence_index;
        self.indexes[block]
            .genes_of(seq)
            .into_iter()
            .map(|slot| &circuit.components[slot])
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        kind: RegulationKind,
        family: Option<String>,
        source: Option<&PartInstance>,
        block: usize,
        promoter_slot: usize,
        params: Option<HillParams>,
        concentration: Option<f64>,
    ) -> RegulationRecord {
        let promoter = &self.circuits[block].components[promoter_slot];
        let genes = self.genes(block, promoter_slot);
        RegulationRecord {
            kind,
            family,
            source: source.map(|s| s.label.clone()),
            source_index: source.map(|s| s.sequence_index),
            targets: vec![promoter.label.clone()],
            target_indices: vec![promoter.sequence_index],
            target_genes: genes.iter().map(|g| g.label.clone()).collect(),
            gene_indices: genes.iter().map(|g| g.sequence_index).collect(),
            params,
            concentration,
        }
    }

    /// (block, slot) of each block's authoritative promoter.
    fn promoters(&self) -> Vec<(usize, usize)> {
        self.circuits
            .iter()
            .enumerate()
            .filter_map(|(b, c)| {
                let seq = c.promoter?;
                let slot = c.components.iter().position(|p| p.sequence_index == seq)?;
                Some((b, slot))
            })
            .collect()
    }

    fn floating(&mut self, floating: &[PartInstance]) {
        let mut seen = BTreeSet::new();
        let promoters = self.promoters();
        for reg in floating {
            let (Some(kind), Some(family)) = (reg.kind.regulator_kind(), reg.kind.family()) else {
                continue;
            };
            if !seen.insert(family.to_string()) {
                continue;
            }
            let record_kind = if kind.is_repressive() {
                RegulationKind::EnvironmentalRepression
            } else {
                RegulationKind::EnvironmentalActivation
            };
            let (params, concentration) = hill_params(reg);
            for &(block, slot) in &promoters {
                let record = self.record(
                    record_kind,
                    Some(family.to_string()),
                    None,
                    block,
                    slot,
                    params,
                    concentration,
                );
                self.report.records.push(record);
            }
            log::debug!(
                "floating regulator {family} applied to {} promoters",
                promoters.len()
            );
        }
    }

    fn families(&self) -> BTreeMap<String, Family> {
        let mut families: BTreeMap<String, Family> = BTreeMap::new();
        for (block, circuit) in self.circuits.iter().enumerate() {
            for (slot, part) in circuit.components.iter().enumerate() {
                let PartKind::Regulator { kind, role, family } = &part.kind else {
                    continue;
                };
                let entry = families.entry(family.clone()).or_default();
                entry.kind.get_or_insert(*kind);
                let locus = Locus { block, slot };
                match role {
                    RegulatorRole::Start => entry.starts.push(locus),
                    RegulatorRole::End => entry.ends.push(locus),
                    RegulatorRole::Bare => entry.bare.push(locus),
                    RegulatorRole::Floating => {}
                }
            }
        }
        families
    }

    fn positional(&mut self) {
        for (key, family) in self.families() {
            for &locus in &family.bare {
                let label = self.part(locus).label.clone();
                self.warn(format!("regulator {label} has no start/end role"));
                self.report.unpaired_regulators.push(label);
            }
            let Some(kind) = family.kind else { continue };
            if family.starts.is_empty() && family.ends.is_empty() {
                continue;
            }
            if family.starts.is_empty() || family.ends.is_empty() {
                let missing = if family.starts.is_empty() { "start" } else { "end" };
                for &locus in family.starts.iter().chain(&family.ends) {
                    let label = self.part(locus).label.clone();
                    self.report.unpaired_regulators.push(label);
                }
                self.warn(format!("regulator family {key} has no {missing} marker"));
                continue;
            }

            let sources: Vec<(Locus, Locus)> = family
                .starts
                .iter()
                .filter_map(|&start| self.source_of(start).map(|cds| (start, cds)))
                .collect();
            let Some(&(start, source)) = sources.first() else {
                self.warn(format!("regulator family {key}: no start marker follows a CDS"));
                continue;
            };
            if sources.len() > 1 {
                self.warn(format!(
                    "regulator family {key} has {} resolved starts; using {}",
                    sources.len(),
                    self.part(start).label
                ));
            }

            let mut targeted = BTreeSet::new();
            for &end in &family.ends {
                let Some(target) = self.target_of(end) else {
                    continue;
                };
                if !targeted.insert((target.block, target.promoter_slot)) {
                    continue;
                }
                self.emit(&key, kind, start, source, &target);
            }
        }
    }

    /// CDS a start marker is attached to.
    fn source_of(&mut self, start: Locus) -> Option<Locus> {
        let marker = self.part(start);
        let index = &self.indexes[start.block];
        let block = start.block;
        if let Some(slot) = index.nearest_non_regulator_before(marker.sequence_index) {
            if self.part(Locus { block, slot }).category() == PartCategory::Cds {
                return Some(Locus { block, slot });
            }
        }
        match index.nearest_cds_before(marker.sequence_index) {
            Some(slot) => {
                let cds = self.part(Locus { block, slot });
                self.warn(format!(
                    "start marker {} does not directly follow a CDS; using {}",
                    marker.label, cds.label
                ));
                Some(Locus { block, slot })
            }
            None => {
                self.warn(format!("start marker {} has no upstream CDS", marker.label));
                None
            }
        }
    }

    /// Promoter an end marker regulates.
    fn target_of(&mut self, end: Locus) -> Option<Target> {
        let marker = self.part(end);
        let circuits = self.circuits;
        let circuit = &circuits[end.block];
        let index = &self.indexes[end.block];
        if let Some(slot) = index.nearest_non_regulator_before(marker.sequence_index) {
            if circuit.promoter == Some(circuit.components[slot].sequence_index) {
                return Some(Target {
                    block: end.block,
                    promoter_slot: slot,
                    end_slot: end.slot,
                });
            }
        }
        match index.governing_promoter(marker.sequence_index) {
            Some(slot) => {
                let promoter = &circuit.components[slot];
                self.warn(format!(
                    "end marker {} does not directly follow a promoter; using {}",
                    marker.label, promoter.label
                ));
                Some(Target {
                    block: end.block,
                    promoter_slot: slot,
                    end_slot: end.slot,
                })
            }
            None => {
                self.warn(format!("end marker {} has no upstream promoter", marker.label));
                None
            }
        }
    }

    fn emit(&mut self, key: &str, kind: RegulatorKind, start: Locus, source: Locus, target: &Target) {
        let base = match kind {
            RegulatorKind::Repressor | RegulatorKind::Inhibitor => {
                RegulationKind::TranscriptionalRepression
            }
            RegulatorKind::Activator => RegulationKind::TranscriptionalActivation,
            RegulatorKind::Inducer => RegulationKind::InducedActivation,
        };
        let source_part = self.part(source);
        let is_self = source.block == target.block
            && self
                .genes(target.block, target.promoter_slot)
                .iter()
                .any(|g| g.sequence_index == source_part.sequence_index);
        let record_kind = if is_self { base.as_self() } else { base };

        let end_part = self.part(Locus {
            block: target.block,
            slot: target.end_slot,
        });
        let (params, _) = hill_params(end_part);
        let params = params
            .or_else(|| hill_params(self.part(start)).0)
            .or(Some(HillParams {
                threshold: DEFAULT_REGULATOR_THRESHOLD,
                n: DEFAULT_HILL_COEFFICIENT,
            }));

        let record = self.record(
            record_kind,
            Some(key.to_string()),
            Some(source_part),
            target.block,
            target.promoter_slot,
            params,
            None,
        );
        log::debug!(
            "{key}: {} {} -> {}",
            record_kind.as_str(),
            source_part.label,
            record.targets.join(",")
        );
        self.report.records.push(record);
    }

    /// One constitutive record per promoter whose genes nothing
    /// regulates, and one per CDS with no governing promoter.
    fn constitutive(&mut self) {
        let regulated: BTreeSet<usize> = self
            .report
            .records
            .iter()
            .flat_map(|r| r.gene_indices.iter().copied())
            .collect();

        let mut records = Vec::new();
        for (block, circuit) in self.circuits.iter().enumerate() {
            let index = &self.indexes[block];
            if let Some(slot) = circuit
                .promoter
                .and_then(|seq| circuit.components.iter().position(|p| p.sequence_index == seq))
            {
                let mut record =
                    self.record(RegulationKind::Constitutive, None, None, block, slot, None, None);
                let (genes, indices): (Vec<String>, Vec<usize>) = record
                    .target_genes
                    .iter()
                    .cloned()
                    .zip(record.gene_indices.iter().copied())
                    .filter(|(_, seq)| !regulated.contains(seq))
                    .unzip();
                if !indices.is_empty() {
                    record.target_genes = genes;
                    record.gene_indices = indices;
                    records.push(record);
                }
            }

            for slot in index.cds_slots() {
                let cds = &circuit.components[slot];
                if index.governing_promoter(cds.sequence_index).is_some()
                    || regulated.contains(&cds.sequence_index)
                {
                    continue;
                }
                records.push(RegulationRecord {
                    kind: RegulationKind::Constitutive,
                    family: None,
                    source: None,
                    source_index: None,
                    targets: Vec::new(),
                    target_indices: Vec::new(),
                    target_genes: vec![cds.label.clone()],
                    gene_indices: vec![cds.sequence_index],
                    params: None,
                    concentration: None,
                });
            }
        }
        self.report.records.extend(records);
    }
}

/// Hill parameters and fixed concentration carried by a regulator part.
fn hill_params(part: &PartInstance) -> (Option<HillParams>, Option<f64>) {
    match &part.parameters {
        Some(PartParameters::Regulator {
            threshold,
            n,
            concentration,
        }) => (
            Some(HillParams {
                threshold: *threshold,
                n: *n,
            }),
            *concentration,
        ),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use genecircuit_params::PartRegistry;
    use genecircuit_types::SequenceEntry;

    fn resolve_labels(labels: &[&str]) -> (Vec<CircuitBlock>, RegulationReport) {
        let entries: Vec<SequenceEntry> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| {
                if *l == "|" {
                    SequenceEntry::Gap
                } else {
                    SequenceEntry::part(*l, i as i64)
                }
            })
            .collect();
        let asm = assemble(&entries, &PartRegistry::builtin());
        let report = resolve(&asm.circuits, &asm.floating_regulators);
        (asm.circuits, report)
    }

    fn repressilator() -> Vec<&'static str> {
        vec![
            "promoter_1", "repressor_end_3", "rbs_1", "cds_1", "repressor_start_1", "terminator_1",
            "|",
            "promoter_2", "repressor_end_1", "rbs_2", "cds_2", "repressor_start_2", "terminator_2",
            "|",
            "promoter_3", "repressor_end_2", "rbs_3", "cds_3", "repressor_start_3", "terminator_3",
        ]
    }

    #[test]
    fn test_constitutive_only() {
        let (_, r) = resolve_labels(&["promoter_1", "rbs_1", "cds_1", "terminator_1"]);
        assert_eq!(r.records.len(), 1);
        let rec = &r.records[0];
        assert_eq!(rec.kind, RegulationKind::Constitutive);
        assert_eq!(rec.targets, vec!["promoter_1"]);
        assert_eq!(rec.target_genes, vec!["cds_1"]);
        assert!(rec.source.is_none());
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_repressilator_ring() {
        let (_, r) = resolve_labels(&repressilator());
        assert_eq!(r.records.len(), 3, "{:#?}", r.records);
        assert!(r.unpaired_regulators.is_empty());
        assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
        let edges: Vec<(&str, &str)> = r
            .records
            .iter()
            .map(|rec| (rec.source.as_deref().unwrap(), rec.target_genes[0].as_str()))
            .collect();
        assert_eq!(edges, vec![("cds_1", "cds_2"), ("cds_2", "cds_3"), ("cds_3", "cds_1")]);
        for rec in &r.records {
            assert_eq!(rec.kind, RegulationKind::TranscriptionalRepression);
            assert_eq!(rec.params.unwrap().threshold, 0.35);
        }
    }

    #[test]
    fn test_self_repression() {
        let (_, r) = resolve_labels(&[
            "promoter_1", "repressor_end_1", "rbs_1", "cds_1", "repressor_start_1", "terminator_1",
        ]);
        assert_eq!(r.records.len(), 1);
        assert_eq!(r.records[0].kind, RegulationKind::SelfRepression);
        assert_eq!(r.records[0].source.as_deref(), Some("cds_1"));
    }

    #[test]
    fn test_hardware_activator_format() {
        let (_, r) = resolve_labels(&[
            "promoter_a", "rbs_a", "cds_a", "activator_b_start", "terminator_a", "|",
            "promoter_b", "activator_b_end", "rbs_b", "cds_b", "terminator_b",
        ]);
        let act: Vec<&RegulationRecord> = r
            .records
            .iter()
            .filter(|x| x.kind == RegulationKind::TranscriptionalActivation)
            .collect();
        assert_eq!(act.len(), 1);
        assert_eq!(act[0].params.unwrap().threshold, 0.4);
        assert_eq!(act[0].target_genes, vec!["cds_b"]);
        // cds_a is not regulated by anything
        let constitutive: Vec<&str> = r
            .records
            .iter()
            .filter(|x| x.kind == RegulationKind::Constitutive)
            .flat_map(|x| x.target_genes.iter().map(String::as_str))
            .collect();
        assert_eq!(constitutive, vec!["cds_a"]);
    }

    #[test]
    fn test_inducer_is_induced_activation() {
        let (_, r) = resolve_labels(&[
            "promoter_1", "rbs_1", "cds_1", "inducer_c_start", "|",
            "promoter_2", "inducer_c_end", "rbs_2", "cds_2",
        ]);
        assert!(r
            .records
            .iter()
            .any(|x| x.kind == RegulationKind::InducedActivation));
    }

    #[test]
    fn test_unpaired_start() {
        let (_, r) = resolve_labels(&["promoter_1", "rbs_1", "cds_1", "repressor_start_2"]);
        assert_eq!(r.unpaired_regulators, vec!["repressor_start_2"]);
        assert_eq!(r.records.len(), 1);
        assert_eq!(r.records[0].kind, RegulationKind::Constitutive);
        assert_eq!(r.diagnostics[0].category, DiagnosticCategory::Regulation);
    }

    #[test]
    fn test_bare_regulator_unpaired() {
        let (_, r) = resolve_labels(&["promoter_1", "repressor_a", "rbs_1", "cds_1"]);
        assert_eq!(r.unpaired_regulators, vec!["repressor_a"]);
    }

    #[test]
    fn test_floating_hits_every_promoter() {
        let (_, r) = resolve_labels(&[
            "floating_inhibitor_a", "|", "promoter_1", "rbs_1", "cds_1", "|",
            "promoter_2", "rbs_2", "cds_2",
        ]);
        let env: Vec<&RegulationRecord> = r
            .records
            .iter()
            .filter(|x| x.kind == RegulationKind::EnvironmentalRepression)
            .collect();
        assert_eq!(env.len(), 2);
        assert!(env.iter().all(|x| x.source.is_none()));
        assert_eq!(env[0].concentration, Some(1.0));
        // floating regulation counts as regulation; no constitutive fallback
        assert!(r
            .records
            .iter()
            .all(|x| x.kind != RegulationKind::Constitutive));
    }

    #[test]
    fn test_end_not_after_promoter_falls_back() {
        let (_, r) = resolve_labels(&[
            "promoter_1", "rbs_1", "cds_1", "repressor_start_1", "|",
            "promoter_2", "rbs_2", "repressor_end_1", "cds_2",
        ]);
        let rep = r
            .records
            .iter()
            .find(|x| x.kind == RegulationKind::TranscriptionalRepression)
            .unwrap();
        assert_eq!(rep.targets, vec!["promoter_2"]);
        assert_eq!(r.diagnostics.len(), 1);
    }

    #[test]
    fn test_every_cds_has_exactly_one_record() {
        let (circuits, r) = resolve_labels(&repressilator());
        for c in &circuits {
            for cds in c.cds_parts() {
                let n = r
                    .records
                    .iter()
                    .filter(|x| x.regulates_gene(cds.sequence_index))
                    .count();
                assert_eq!(n, 1, "{} has {n} records", cds.label);
            }
        }
    }

    #[test]
    fn test_cds_before_promoter_gets_own_record() {
        let (_, r) = resolve_labels(&["cds_0", "promoter_1", "rbs_1", "cds_1"]);
        let c: Vec<&RegulationRecord> = r
            .records
            .iter()
            .filter(|x| x.kind == RegulationKind::Constitutive)
            .collect();
        assert_eq!(c.len(), 2);
        assert!(c.iter().any(|x| x.targets.is_empty() && x.target_genes == vec!["cds_0"]));
    }
}
