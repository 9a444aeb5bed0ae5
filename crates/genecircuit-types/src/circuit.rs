// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Circuit Blocks
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Finalized circuit blocks and the per-circuit positional index used
//! for every upstream/downstream query.

use serde::{Deserialize, Serialize};

use crate::part::{PartCategory, PartInstance};

/// One flagged part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub label: String,
    pub sequence_index: usize,
    pub reason: String,
}

impl Anomaly {
    pub fn new(part: &PartInstance, reason: impl Into<String>) -> Self {
        Self {
            label: part.label.clone(),
            sequence_index: part.sequence_index,
            reason: reason.into(),
        }
    }
}

/// Shape of a block's RBS/CDS sub-sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RbsLayout {
    /// rbs, cds, rbs, cds, ...
    #[default]
    Alternating,
    /// rbs, cds, cds, ... with a single RBS for the whole block.
    Grouped,
    /// CDS present but no RBS at all.
    Missing,
    /// Any other interleaving, including a CDS run after a second RBS.
    Invalid,
}

/// Structural findings for one block. Never blocks finalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitAnomalies {
    pub extras: Vec<Anomaly>,
    pub misplaced: Vec<Anomaly>,
    /// Part categories a complete circuit needs but this one lacks.
    pub missing: Vec<PartCategory>,
    pub rbs_layout: RbsLayout,
}

impl CircuitAnomalies {
    pub fn is_clean(&self) -> bool {
        self.extras.is_empty()
            && self.misplaced.is_empty()
            && self.missing.is_empty()
            && matches!(self.rbs_layout, RbsLayout::Alternating | RbsLayout::Grouped)
    }
}

/// Tally by part category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCounts {
    pub promoter: usize,
    pub rbs: usize,
    pub cds: usize,
    pub terminator: usize,
    pub regulator: usize,
}

impl ComponentCounts {
    pub fn tally(parts: &[PartInstance]) -> Self {
        let mut counts = Self::default();
        for part in parts {
            match part.category() {
                PartCategory::Promoter => counts.promoter += 1,
                PartCategory::Rbs => counts.rbs += 1,
                PartCategory::Cds => counts.cds += 1,
                PartCategory::Terminator => counts.terminator += 1,
                PartCategory::Regulator => counts.regulator += 1,
            }
        }
        counts
    }
}

/// A contiguous, validated run of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBlock {
    /// 1-based, in finalization order.
    pub id: usize,
    pub name: String,
    /// Sorted by `sequence_index`.
    pub components: Vec<PartInstance>,
    pub component_counts: ComponentCounts,
    pub anomalies: CircuitAnomalies,
    /// Sequence index of the authoritative (first) promoter.
    pub promoter: Option<usize>,
}

impl CircuitBlock {
    pub fn cds_parts(&self) -> impl Iterator<Item = &PartInstance> {
        self.components
            .iter()
            .filter(|p| p.category() == PartCategory::Cds)
    }

    pub fn part_at(&self, sequence_index: usize) -> Option<&PartInstance> {
        self.components
            .binary_search_by_key(&sequence_index, |p| p.sequence_index)
            .ok()
            .map(|slot| &self.components[slot])
    }

    pub fn authoritative_promoter(&self) -> Option<&PartInstance> {
        self.promoter.and_then(|seq| self.part_at(seq))
    }

    pub fn contains(&self, sequence_index: usize) -> bool {
        self.part_at(sequence_index).is_some()
    }
}

/// Sorted per-category positions of one block.
///
/// Every lookup is a `partition_point` over a sorted vector, so nearest
/// upstream queries stay O(log n) however long the block grows. Values
/// are slots into `CircuitBlock::components`.
#[derive(Debug, Clone, Default)]
pub struct CircuitIndex {
    non_regulator: Vec<(usize, usize)>,
    promoters: Vec<(usize, usize)>,
    rbs: Vec<(usize, usize)>,
    cds: Vec<(usize, usize)>,
}

impl CircuitIndex {
    pub fn build(block: &CircuitBlock) -> Self {
        let mut index = Self::default();
        for (slot, part) in block.components.iter().enumerate() {
            let entry = (part.sequence_index, slot);
            match part.category() {
                PartCategory::Regulator => continue,
                PartCategory::Promoter => {
                    // Extra promoters are excluded from governing lookups.
                    if block.promoter == Some(part.sequence_index) {
                        index.promoters.push(entry);
                    }
                }
                PartCategory::Rbs => index.rbs.push(entry),
                PartCategory::Cds => index.cds.push(entry),
                PartCategory::Terminator => {}
            }
            index.non_regulator.push(entry);
        }
        index
    }

    fn preceding(list: &[(usize, usize)], sequence_index: usize) -> Option<usize> {
        let i = list.partition_point(|&(seq, _)| seq < sequence_index);
        i.checked_sub(1).map(|i| list[i].1)
    }

    /// Closest non-regulator part strictly upstream.
    pub fn nearest_non_regulator_before(&self, sequence_index: usize) -> Option<usize> {
        Self::preceding(&self.non_regulator, sequence_index)
    }

    /// Authoritative promoter upstream of a position.
    pub fn governing_promoter(&self, sequence_index: usize) -> Option<usize> {
        Self::preceding(&self.promoters, sequence_index)
    }

    pub fn upstream_rbs(&self, sequence_index: usize) -> Option<usize> {
        Self::preceding(&self.rbs, sequence_index)
    }

    pub fn nearest_cds_before(&self, sequence_index: usize) -> Option<usize> {
        Self::preceding(&self.cds, sequence_index)
    }

    /// CDS slots transcribed from the promoter at `promoter_index`:
    /// everything after it up to the next authoritative promoter.
    pub fn genes_of(&self, promoter_index: usize) -> Vec<usize> {
        let next = self
            .promoters
            .iter()
            .map(|&(seq, _)| seq)
            .find(|&seq| seq > promoter_index)
            .unwrap_or(usize::MAX);
        let lo = self.cds.partition_point(|&(seq, _)| seq <= promoter_index);
        let hi = self.cds.partition_point(|&(seq, _)| seq < next);
        self.cds[lo..hi].iter().map(|&(_, slot)| slot).collect()
    }

    pub fn cds_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.cds.iter().map(|&(_, slot)| slot)
    }
}
