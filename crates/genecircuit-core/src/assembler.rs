// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Circuit Assembler
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Splits the ordered part stream at explicit gaps, classifies every
//! label, finalizes blocks that contain a CDS and records structural
//! anomalies without rejecting anything.

use genecircuit_params::PartRegistry;
use genecircuit_types::part::{DEFAULT_DEGRADATION_RATE, DEFAULT_INITIAL_CONC};
use genecircuit_types::{
    classify_label, Anomaly, CircuitAnomalies, CircuitBlock, ComponentCounts, Diagnostic,
    DiagnosticCategory, PartCategory, PartInstance, PartParameters, RbsLayout, SequenceEntry,
};

/// Output of one assembly pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub circuits: Vec<CircuitBlock>,
    /// Parts of discarded (CDS-less) blocks.
    pub outside_any_circuit: Vec<Anomaly>,
    pub unrecognized: Vec<Anomaly>,
    /// Every floating regulator seen, whatever block it sat in.
    pub floating_regulators: Vec<PartInstance>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AssemblyReport {
    pub fn part_count(&self) -> usize {
        self.circuits.iter().map(|c| c.components.len()).sum()
    }
}

/// Group `entries` into circuit blocks with parameters taken from the
/// (already override-resolved) `registry`.
pub fn assemble(entries: &[SequenceEntry], registry: &PartRegistry) -> AssemblyReport {
    let mut report = AssemblyReport::default();
    let mut run: Vec<PartInstance> = Vec::new();
    let mut sequence_index = 0usize;

    for entry in entries {
        match entry {
            SequenceEntry::Gap => close_block(&mut run, registry, &mut report),
            SequenceEntry::Part(input) => {
                let seq = sequence_index;
                sequence_index += 1;
                match classify_label(&input.label, input.kind_hint.as_deref()) {
                    Ok(kind) => {
                        let mut part = PartInstance::new(input.label.trim(), kind, seq);
                        part.position = input.position;
                        part.strength_hint = input.strength_hint;
                        run.push(part);
                    }
                    Err(e) => {
                        report.unrecognized.push(Anomaly {
                            label: input.label.clone(),
                            sequence_index: seq,
                            reason: e.to_string(),
                        });
                        report
                            .diagnostics
                            .push(Diagnostic::warn(DiagnosticCategory::Input, e.to_string()));
                    }
                }
            }
        }
    }
    close_block(&mut run, registry, &mut report);

    log::debug!(
        "assembled {} circuits ({} parts), {} outside, {} unrecognized",
        report.circuits.len(),
        report.part_count(),
        report.outside_any_circuit.len(),
        report.unrecognized.len()
    );
    report
}

fn close_block(run: &mut Vec<PartInstance>, registry: &PartRegistry, report: &mut AssemblyReport) {
    if run.is_empty() {
        return;
    }
    let mut parts = std::mem::take(run);
    parts.sort_by_key(|p| p.sequence_index);

    for part in parts.iter().filter(|p| p.kind.is_floating()) {
        let mut floating = part.clone();
        floating.parameters = Some(lookup(part, registry, &mut report.diagnostics));
        report.floating_regulators.push(floating);
    }

    if !parts.iter().any(|p| p.category() == PartCategory::Cds) {
        log::debug!("discarding block of {} parts with no CDS", parts.len());
        report.outside_any_circuit.extend(
            parts
                .iter()
                .filter(|p| !p.kind.is_floating())
                .map(|p| Anomaly::new(p, "Block has no coding sequence")),
        );
        return;
    }

    let id = report.circuits.len() + 1;
    let name = format!("circuit_{id}");
    let promoter = parts
        .iter()
        .find(|p| p.category() == PartCategory::Promoter)
        .map(|p| p.sequence_index);

    for part in &mut parts {
        part.circuit_id = Some(id);
        let extra_promoter =
            part.category() == PartCategory::Promoter && Some(part.sequence_index) != promoter;
        part.parameters = if extra_promoter {
            None
        } else {
            Some(lookup(part, registry, &mut report.diagnostics))
        };
    }

    let anomalies = inspect(&parts, promoter);
    for a in anomalies.extras.iter().chain(&anomalies.misplaced) {
        report.diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Structural,
            format!("{name}: {} ({}) at {}", a.reason, a.label, a.sequence_index),
        ));
    }
    if !anomalies.missing.is_empty() {
        let missing: Vec<&str> = anomalies.missing.iter().map(PartCategory::as_str).collect();
        report.diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Structural,
            format!("{name}: missing {}", missing.join(", ")),
        ));
    }
    if anomalies.rbs_layout == RbsLayout::Invalid {
        report.diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Structural,
            format!("{name}: RBS/CDS order is neither alternating nor grouped"),
        ));
    }

    log::debug!("closed {name} with {} parts", parts.len());
    report.circuits.push(CircuitBlock {
        id,
        name,
        component_counts: ComponentCounts::tally(&parts),
        components: parts,
        anomalies,
        promoter,
    });
}

/// Registry parameters for `part`, or documented defaults.
fn lookup(
    part: &PartInstance,
    registry: &PartRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) -> PartParameters {
    let params = match registry.get(&part.label) {
        Some(entry) if entry.matches(&part.kind) => entry.params.clone(),
        Some(entry) => {
            diagnostics.push(Diagnostic::warn(
                DiagnosticCategory::Structural,
                format!(
                    "registry entry '{}' is a {}, not a {}; using defaults",
                    part.label,
                    entry.category.as_str(),
                    part.category().as_str()
                ),
            ));
            PartParameters::fallback(&part.kind, part.strength_hint)
        }
        None => {
            log::debug!("no registry entry for '{}'; using defaults", part.label);
            PartParameters::fallback(&part.kind, part.strength_hint)
        }
    };

    match params {
        PartParameters::Cds {
            translation_rate,
            degradation_rate,
            initial_conc,
        } if !(degradation_rate > 0.0 && degradation_rate.is_finite())
            || !(initial_conc >= 0.0 && initial_conc.is_finite()) =>
        {
            diagnostics.push(Diagnostic::warn(
                DiagnosticCategory::Input,
                format!(
                    "{}: degradation_rate {degradation_rate} / initial_conc {initial_conc} \
                     out of range; using {DEFAULT_DEGRADATION_RATE} / {DEFAULT_INITIAL_CONC}",
                    part.label
                ),
            ));
            PartParameters::Cds {
                translation_rate,
                degradation_rate: DEFAULT_DEGRADATION_RATE,
                initial_conc: DEFAULT_INITIAL_CONC,
            }
        }
        other => other,
    }
}

/// Structural checks on a finalized, sorted block.
fn inspect(parts: &[PartInstance], promoter: Option<usize>) -> CircuitAnomalies {
    let mut anomalies = CircuitAnomalies::default();

    let mut seen_terminator: Option<usize> = None;
    for part in parts {
        match part.category() {
            PartCategory::Promoter if Some(part.sequence_index) != promoter => {
                anomalies.extras.push(Anomaly::new(part, "Extra promoter"));
            }
            PartCategory::Terminator => match seen_terminator {
                Some(_) => anomalies.extras.push(Anomaly::new(part, "Extra terminator")),
                None => seen_terminator = Some(part.sequence_index),
            },
            _ => {}
        }
    }

    for part in parts.iter().filter(|p| !p.is_regulator()) {
        let category = part.category();
        if category == PartCategory::Promoter {
            continue;
        }
        if promoter.is_some_and(|p| part.sequence_index < p) {
            anomalies.misplaced.push(Anomaly::new(part, "Precedes promoter"));
        } else if matches!(category, PartCategory::Rbs | PartCategory::Cds)
            && seen_terminator.is_some_and(|t| part.sequence_index > t)
        {
            anomalies.misplaced.push(Anomaly::new(part, "Follows terminator"));
        }
    }

    let counts = ComponentCounts::tally(parts);
    for (category, count) in [
        (PartCategory::Promoter, counts.promoter),
        (PartCategory::Rbs, counts.rbs),
        (PartCategory::Terminator, counts.terminator),
    ] {
        if count == 0 {
            anomalies.missing.push(category);
        }
    }

    let expression: Vec<&PartInstance> = parts
        .iter()
        .filter(|p| matches!(p.category(), PartCategory::Rbs | PartCategory::Cds))
        .collect();
    let (layout, extra_rbs) = rbs_layout(&expression);
    anomalies.rbs_layout = layout;
    for part in extra_rbs {
        anomalies.extras.push(Anomaly::new(part, "Extra RBS"));
    }
    anomalies
}

/// Classify the RBS/CDS sub-sequence. RBS parts not followed by a CDS
/// are returned as extras.
fn rbs_layout<'a>(expression: &[&'a PartInstance]) -> (RbsLayout, Vec<&'a PartInstance>) {
    fn is_rbs(p: &PartInstance) -> bool {
        p.category() == PartCategory::Rbs
    }
    if !expression.iter().any(|p| is_rbs(p)) {
        return (RbsLayout::Missing, Vec::new());
    }

    let extras: Vec<&PartInstance> = expression
        .iter()
        .enumerate()
        .filter(|(i, p)| is_rbs(p) && expression.get(i + 1).map_or(true, |next| is_rbs(next)))
        .map(|(_, p)| *p)
        .collect();

    let starts_with_rbs = expression.first().is_some_and(|p| is_rbs(p));
    if !starts_with_rbs || !extras.is_empty() {
        return (RbsLayout::Invalid, extras);
    }
    let cds_run = expression.windows(2).any(|w| !is_rbs(w[0]) && !is_rbs(w[1]));
    let rbs_count = expression.iter().filter(|p| is_rbs(p)).count();
    // grouped means one RBS ahead of every CDS; a run after a second RBS is mixed
    let layout = match (cds_run, rbs_count) {
        (false, _) => RbsLayout::Alternating,
        (true, 1) => RbsLayout::Grouped,
        (true, _) => RbsLayout::Invalid,
    };
    (layout, extras)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genecircuit_params::RegistryEntry;
    use genecircuit_types::PartInput;

    fn parts(labels: &[&str]) -> Vec<SequenceEntry> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| {
                if *l == "|" {
                    SequenceEntry::Gap
                } else {
                    SequenceEntry::part(*l, i as i64 * 10)
                }
            })
            .collect()
    }

    fn run(labels: &[&str]) -> AssemblyReport {
        assemble(&parts(labels), &PartRegistry::builtin())
    }

    #[test]
    fn test_single_clean_circuit() {
        let r = run(&["promoter_1", "rbs_1", "cds_1", "terminator_1"]);
        assert_eq!(r.circuits.len(), 1);
        let c = &r.circuits[0];
        assert_eq!(c.name, "circuit_1");
        assert!(c.anomalies.is_clean(), "{:?}", c.anomalies);
        assert_eq!(c.anomalies.rbs_layout, RbsLayout::Alternating);
        assert_eq!(c.promoter, Some(0));
        assert!(c.components.iter().all(|p| p.circuit_id == Some(1)));
        assert!(c.components.iter().all(|p| p.parameters.is_some()));
        assert_eq!(c.components[0].position, 0);
        assert_eq!(c.components[3].position, 30);
        assert!(r.diagnostics.is_empty(), "{:?}", r.diagnostics);
    }

    #[test]
    fn test_gap_splits_and_cds_less_block_discarded() {
        let r = run(&[
            "promoter_1", "rbs_1", "cds_1", "terminator_1", "|", "promoter_2", "terminator_2",
            "|", "promoter_3", "rbs_3", "cds_3",
        ]);
        assert_eq!(r.circuits.len(), 2);
        assert_eq!(r.circuits[1].name, "circuit_2");
        assert_eq!(r.circuits[1].components[0].label, "promoter_3");
        assert_eq!(r.outside_any_circuit.len(), 2);
        assert_eq!(r.outside_any_circuit[0].reason, "Block has no coding sequence");
        assert_eq!(r.circuits[1].anomalies.missing, vec![PartCategory::Terminator]);
    }

    #[test]
    fn test_sequence_index_counts_parts_not_gaps() {
        let r = run(&["promoter_1", "rbs_1", "cds_1", "|", "promoter_2", "rbs_2", "cds_2"]);
        let seqs: Vec<usize> = r.circuits[1]
            .components
            .iter()
            .map(|p| p.sequence_index)
            .collect();
        assert_eq!(seqs, vec![3, 4, 5]);
    }

    #[test]
    fn test_extra_promoter() {
        let r = run(&["promoter_1", "promoter_2", "rbs_1", "cds_1", "terminator_1"]);
        let c = &r.circuits[0];
        assert_eq!(c.promoter, Some(0));
        assert_eq!(c.anomalies.extras.len(), 1);
        assert_eq!(c.anomalies.extras[0].reason, "Extra promoter");
        assert_eq!(c.anomalies.extras[0].label, "promoter_2");
        assert!(c.components[1].parameters.is_none());
        assert!(c.components[0].parameters.is_some());
    }

    #[test]
    fn test_grouped_layout() {
        let r = run(&["promoter_1", "rbs_1", "cds_1", "cds_2", "terminator_1"]);
        assert_eq!(r.circuits[0].anomalies.rbs_layout, RbsLayout::Grouped);
        assert!(r.circuits[0].anomalies.is_clean());
    }

    #[test]
    fn test_invalid_rbs_interleaving() {
        let r = run(&["promoter_1", "rbs_1", "rbs_2", "cds_1", "cds_2", "terminator_1"]);
        let a = &r.circuits[0].anomalies;
        assert_eq!(a.rbs_layout, RbsLayout::Invalid);
        assert_eq!(a.extras.len(), 1);
        assert_eq!(a.extras[0].reason, "Extra RBS");
        assert_eq!(a.extras[0].label, "rbs_1");
        // still finalized
        assert_eq!(r.circuits[0].component_counts.cds, 2);
    }

    #[test]
    fn test_mixed_layout_is_invalid() {
        let r = run(&["promoter_1", "rbs_1", "cds_1", "cds_2", "rbs_3", "cds_3", "terminator_1"]);
        let a = &r.circuits[0].anomalies;
        assert_eq!(a.rbs_layout, RbsLayout::Invalid);
        assert!(a.extras.is_empty());
        assert!(!a.is_clean());
        assert!(r
            .diagnostics
            .iter()
            .any(|d| d.message.contains("neither alternating nor grouped")));
        assert_eq!(r.circuits[0].component_counts.cds, 3);
    }

    #[test]
    fn test_missing_rbs() {
        let r = run(&["promoter_1", "cds_1", "terminator_1"]);
        let a = &r.circuits[0].anomalies;
        assert_eq!(a.rbs_layout, RbsLayout::Missing);
        assert_eq!(a.missing, vec![PartCategory::Rbs]);
    }

    #[test]
    fn test_misplaced_parts() {
        let r = run(&["cds_0", "promoter_1", "rbs_1", "cds_1", "terminator_1", "rbs_2", "cds_2"]);
        let a = &r.circuits[0].anomalies;
        let reasons: Vec<(&str, &str)> = a
            .misplaced
            .iter()
            .map(|m| (m.label.as_str(), m.reason.as_str()))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("cds_0", "Precedes promoter"),
                ("rbs_2", "Follows terminator"),
                ("cds_2", "Follows terminator"),
            ]
        );
    }

    #[test]
    fn test_unrecognized_label() {
        let r = run(&["promoter_1", "widget", "rbs_1", "cds_1"]);
        assert_eq!(r.unrecognized.len(), 1);
        assert_eq!(r.unrecognized[0].sequence_index, 1);
        assert_eq!(r.circuits[0].components.len(), 3);
        assert_eq!(r.diagnostics[0].category, DiagnosticCategory::Input);
    }

    #[test]
    fn test_hint_and_strength_fallback() {
        let mut entries = parts(&["rbs_1", "cds_1"]);
        entries.insert(
            0,
            SequenceEntry::Part(PartInput {
                label: "pTet".into(),
                kind_hint: Some("promoter".into()),
                position: 0,
                strength_hint: Some(3.0),
            }),
        );
        let r = assemble(&entries, &PartRegistry::builtin());
        let p = &r.circuits[0].components[0];
        assert_eq!(p.category(), PartCategory::Promoter);
        assert_eq!(p.parameters.as_ref().and_then(|x| x.strength()), Some(3.0));
    }

    #[test]
    fn test_registry_values_flow_through() {
        let mut reg = PartRegistry::builtin();
        reg.insert("cds_1", RegistryEntry::cds(7.0, 0.25, 0.5));
        let r = assemble(&parts(&["promoter_1", "rbs_1", "cds_1"]), &reg);
        let cds = r.circuits[0].components[2].parameters.as_ref().unwrap();
        assert_eq!(cds.field("degradation_rate"), Some(0.25));
        assert_eq!(cds.field("initial_conc"), Some(0.5));
    }

    #[test]
    fn test_bad_cds_entry_replaced() {
        let mut reg = PartRegistry::builtin();
        reg.insert("cds_1", RegistryEntry::cds(7.0, 0.0, -1.0));
        let r = assemble(&parts(&["promoter_1", "rbs_1", "cds_1", "terminator_1"]), &reg);
        let cds = r.circuits[0].components[2].parameters.as_ref().unwrap();
        assert_eq!(cds.field("degradation_rate"), Some(DEFAULT_DEGRADATION_RATE));
        assert_eq!(cds.field("initial_conc"), Some(DEFAULT_INITIAL_CONC));
        assert_eq!(r.diagnostics.len(), 1);
    }

    #[test]
    fn test_kind_mismatch_uses_fallback() {
        let mut reg = PartRegistry::builtin();
        reg.insert("promoter_1", RegistryEntry::rbs(9.0));
        let r = assemble(&parts(&["promoter_1", "rbs_1", "cds_1"]), &reg);
        let p = r.circuits[0].components[0].parameters.as_ref().unwrap();
        assert_eq!(p.strength(), Some(5.0));
        assert_eq!(r.diagnostics[0].category, DiagnosticCategory::Structural);
    }

    #[test]
    fn test_floating_collected_even_from_discarded_block() {
        let r = run(&["floating_inducer_a", "|", "promoter_1", "rbs_1", "cds_1"]);
        assert_eq!(r.floating_regulators.len(), 1);
        assert!(r.outside_any_circuit.is_empty());
        let f = r.floating_regulators[0].parameters.as_ref().unwrap();
        assert_eq!(f.field("concentration"), Some(1.0));
    }

    #[test]
    fn test_every_part_in_exactly_one_block() {
        let r = run(&[
            "promoter_1", "repressor_end_3", "rbs_1", "cds_1", "repressor_start_1", "terminator_1",
            "|", "promoter_2", "repressor_end_1", "rbs_2", "cds_2", "repressor_start_2",
            "terminator_2",
        ]);
        let mut seen: Vec<usize> = r
            .circuits
            .iter()
            .flat_map(|c| c.components.iter().map(|p| p.sequence_index))
            .collect();
        let n = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), n);
        assert_eq!(n, 12);
        for c in &r.circuits {
            assert!(c.components.windows(2).all(|w| w[0].sequence_index < w[1].sequence_index));
        }
    }
}
