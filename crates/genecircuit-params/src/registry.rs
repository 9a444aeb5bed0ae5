// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Part Registry
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Label → parameter table.
//!
//! The built-in table reproduces the bench-calibrated constants used by
//! the board and hardware front-ends:
//!   - promoters 5.0, RBS 1.0, CDS (translation 7.0, degradation 1.0,
//!     initial 0.0), terminators 0.99
//!   - software-format repressors `repressor_{start,end}_{1,2,3}` at
//!     Kr 0.35 (repressilator range)
//!   - hardware-format `<kind>_<a..h>_{start,end}` and legacy bare
//!     `<kind>_<a..h>` regulators
//!   - floating inhibitors/inducers at a fixed concentration of 1.0
//!
//! Lookup is pure: nothing in this module mutates a registry after
//! construction except `insert`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use genecircuit_types::part::{
    PartCategory, PartKind, PartParameters, RegulatorKind, DEFAULT_DEGRADATION_RATE,
    DEFAULT_FLOATING_CONCENTRATION, DEFAULT_HILL_COEFFICIENT, DEFAULT_INITIAL_CONC,
    DEFAULT_PROMOTER_STRENGTH, DEFAULT_RBS_EFFICIENCY, DEFAULT_TERMINATOR_EFFICIENCY,
    DEFAULT_TRANSLATION_RATE,
};
use genecircuit_types::{CircuitError, CircuitResult};

const STRUCTURAL_IDS: [&str; 11] = ["1", "2", "3", "a", "b", "c", "d", "e", "f", "g", "h"];
const HARDWARE_IDS: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];
const FLOATING_IDS: [&str; 3] = ["a", "b", "c"];

/// Kr tuned for sustained repressilator oscillation.
const REPRESSILATOR_KR: f64 = 0.35;
const ACTIVATOR_KA: f64 = 0.4;
const INDUCER_KA: f64 = 0.5;
const INHIBITOR_KR: f64 = 0.5;

/// Per-letter repressor thresholds for the hardware kit.
fn hardware_repressor_kr(id: &str) -> f64 {
    match id {
        "b" => 0.1,
        "c" => 0.4,
        _ => 0.5,
    }
}

/// One registry row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub category: PartCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulator: Option<RegulatorKind>,
    #[serde(default)]
    pub is_floating: bool,
    pub params: PartParameters,
}

impl RegistryEntry {
    pub fn promoter(strength: f64) -> Self {
        Self::structural(PartParameters::Promoter { strength })
    }

    pub fn rbs(efficiency: f64) -> Self {
        Self::structural(PartParameters::Rbs { efficiency })
    }

    pub fn cds(translation_rate: f64, degradation_rate: f64, initial_conc: f64) -> Self {
        Self::structural(PartParameters::Cds {
            translation_rate,
            degradation_rate,
            initial_conc,
        })
    }

    pub fn terminator(efficiency: f64) -> Self {
        Self::structural(PartParameters::Terminator { efficiency })
    }

    pub fn regulator(kind: RegulatorKind, threshold: f64, n: f64) -> Self {
        Self {
            category: PartCategory::Regulator,
            regulator: Some(kind),
            is_floating: false,
            params: PartParameters::Regulator {
                threshold,
                n,
                concentration: None,
            },
        }
    }

    pub fn floating(kind: RegulatorKind, threshold: f64, n: f64, concentration: f64) -> Self {
        Self {
            category: PartCategory::Regulator,
            regulator: Some(kind),
            is_floating: true,
            params: PartParameters::Regulator {
                threshold,
                n,
                concentration: Some(concentration),
            },
        }
    }

    fn structural(params: PartParameters) -> Self {
        Self {
            category: params.category(),
            regulator: None,
            is_floating: false,
            params,
        }
    }

    /// Whether this row may parameterize a part classified as `kind`.
    pub fn matches(&self, kind: &PartKind) -> bool {
        self.category == kind.category() && self.regulator == kind.regulator_kind()
    }
}

/// Flat on-disk row: `{"type": "cds", "degradation_rate": 1.0, ...}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    part_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    efficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    translation_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    degradation_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "initial_conc")]
    init_conc: Option<f64>,
    #[serde(rename = "Kr", default, skip_serializing_if = "Option::is_none")]
    kr: Option<f64>,
    #[serde(rename = "Ka", default, skip_serializing_if = "Option::is_none")]
    ka: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    concentration: Option<f64>,
    #[serde(default)]
    is_floating: bool,
}

impl RawEntry {
    fn into_entry(self, label: &str) -> CircuitResult<RegistryEntry> {
        let missing = |field: &str| {
            CircuitError::Registry(format!("entry '{label}' ({}) lacks '{field}'", self.part_type))
        };
        let part_type = self.part_type.trim().to_ascii_lowercase();
        if let Some(category) = PartCategory::from_word(&part_type) {
            let entry = match category {
                PartCategory::Promoter => {
                    RegistryEntry::promoter(self.strength.ok_or_else(|| missing("strength"))?)
                }
                PartCategory::Rbs => {
                    RegistryEntry::rbs(self.efficiency.ok_or_else(|| missing("efficiency"))?)
                }
                PartCategory::Cds => RegistryEntry::cds(
                    self.translation_rate.unwrap_or(DEFAULT_TRANSLATION_RATE),
                    self.degradation_rate
                        .ok_or_else(|| missing("degradation_rate"))?,
                    self.init_conc.unwrap_or(DEFAULT_INITIAL_CONC),
                ),
                PartCategory::Terminator => RegistryEntry::terminator(
                    self.efficiency.unwrap_or(DEFAULT_TERMINATOR_EFFICIENCY),
                ),
                PartCategory::Regulator => unreachable_category(label)?,
            };
            return Ok(entry);
        }

        let kind = RegulatorKind::from_word(&part_type).ok_or_else(|| {
            CircuitError::Registry(format!("entry '{label}' has unknown type '{part_type}'"))
        })?;
        let threshold = self
            .kr
            .or(self.ka)
            .ok_or_else(|| missing(kind.threshold_name()))?;
        let n = self.n.unwrap_or(DEFAULT_HILL_COEFFICIENT);
        Ok(if self.is_floating {
            RegistryEntry::floating(
                kind,
                threshold,
                n,
                self.concentration.unwrap_or(DEFAULT_FLOATING_CONCENTRATION),
            )
        } else {
            RegistryEntry::regulator(kind, threshold, n)
        })
    }

    fn from_entry(entry: &RegistryEntry) -> Self {
        let mut raw = RawEntry {
            part_type: entry
                .regulator
                .map(|k| k.as_str())
                .unwrap_or_else(|| entry.category.as_str())
                .to_string(),
            is_floating: entry.is_floating,
            ..Default::default()
        };
        match &entry.params {
            PartParameters::Promoter { strength } => raw.strength = Some(*strength),
            PartParameters::Rbs { efficiency } | PartParameters::Terminator { efficiency } => {
                raw.efficiency = Some(*efficiency)
            }
            PartParameters::Cds {
                translation_rate,
                degradation_rate,
                initial_conc,
            } => {
                raw.translation_rate = Some(*translation_rate);
                raw.degradation_rate = Some(*degradation_rate);
                raw.init_conc = Some(*initial_conc);
            }
            PartParameters::Regulator {
                threshold,
                n,
                concentration,
            } => {
                if entry.regulator.map_or(true, |k| k.is_repressive()) {
                    raw.kr = Some(*threshold);
                } else {
                    raw.ka = Some(*threshold);
                }
                raw.n = Some(*n);
                raw.concentration = *concentration;
            }
        }
        raw
    }
}

// `PartCategory::from_word` never yields `Regulator`.
fn unreachable_category(label: &str) -> CircuitResult<RegistryEntry> {
    Err(CircuitError::Registry(format!(
        "entry '{label}' uses the bare 'regulator' type; name the sub-kind"
    )))
}

/// Immutable label → parameters table, keyed by lowercase label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl PartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bench-calibrated default table.
    pub fn builtin() -> Self {
        let mut reg = Self::new();

        for id in STRUCTURAL_IDS {
            reg.insert(format!("promoter_{id}"), RegistryEntry::promoter(DEFAULT_PROMOTER_STRENGTH));
            reg.insert(format!("rbs_{id}"), RegistryEntry::rbs(DEFAULT_RBS_EFFICIENCY));
            reg.insert(
                format!("cds_{id}"),
                RegistryEntry::cds(
                    DEFAULT_TRANSLATION_RATE,
                    DEFAULT_DEGRADATION_RATE,
                    DEFAULT_INITIAL_CONC,
                ),
            );
            reg.insert(
                format!("terminator_{id}"),
                RegistryEntry::terminator(DEFAULT_TERMINATOR_EFFICIENCY),
            );
        }

        // Software format
        for id in ["1", "2", "3"] {
            for role in ["start", "end"] {
                reg.insert(
                    format!("repressor_{role}_{id}"),
                    RegistryEntry::regulator(
                        RegulatorKind::Repressor,
                        REPRESSILATOR_KR,
                        DEFAULT_HILL_COEFFICIENT,
                    ),
                );
            }
        }

        // Hardware format plus legacy bare labels
        for id in HARDWARE_IDS {
            let rows = [
                (RegulatorKind::Repressor, hardware_repressor_kr(id), true),
                (RegulatorKind::Activator, ACTIVATOR_KA, true),
                (RegulatorKind::Inducer, INDUCER_KA, false),
                (RegulatorKind::Inhibitor, INHIBITOR_KR, false),
            ];
            for (kind, threshold, has_bare) in rows {
                let entry = RegistryEntry::regulator(kind, threshold, DEFAULT_HILL_COEFFICIENT);
                if has_bare {
                    reg.insert(format!("{}_{id}", kind.as_str()), entry.clone());
                }
                reg.insert(format!("{}_{id}_start", kind.as_str()), entry.clone());
                reg.insert(format!("{}_{id}_end", kind.as_str()), entry);
            }
        }

        for id in FLOATING_IDS {
            reg.insert(
                format!("floating_inhibitor_{id}"),
                RegistryEntry::floating(
                    RegulatorKind::Inhibitor,
                    INHIBITOR_KR,
                    DEFAULT_HILL_COEFFICIENT,
                    DEFAULT_FLOATING_CONCENTRATION,
                ),
            );
            reg.insert(
                format!("floating_inducer_{id}"),
                RegistryEntry::floating(
                    RegulatorKind::Inducer,
                    INDUCER_KA,
                    DEFAULT_HILL_COEFFICIENT,
                    DEFAULT_FLOATING_CONCENTRATION,
                ),
            );
        }

        reg
    }

    /// Load an externally supplied table in the flat
    /// `{"label": {"type": ..., <fields>}}` shape.
    pub fn from_json(json: &str) -> CircuitResult<Self> {
        let raw: BTreeMap<String, RawEntry> = serde_json::from_str(json)
            .map_err(|e| CircuitError::Registry(format!("JSON parse error: {e}")))?;
        let mut reg = Self::new();
        for (label, row) in raw {
            let entry = row.into_entry(&label)?;
            reg.insert(label, entry);
        }
        Ok(reg)
    }

    /// Serialize back to the flat shape accepted by `from_json`.
    pub fn to_json(&self) -> CircuitResult<String> {
        let raw: BTreeMap<&str, RawEntry> = self
            .entries
            .iter()
            .map(|(label, entry)| (label.as_str(), RawEntry::from_entry(entry)))
            .collect();
        serde_json::to_string_pretty(&raw)
            .map_err(|e| CircuitError::Registry(format!("JSON encode error: {e}")))
    }

    pub fn insert(&mut self, label: impl AsRef<str>, entry: RegistryEntry) {
        self.entries
            .insert(normalize_label(label.as_ref()), entry);
    }

    pub fn get(&self, label: &str) -> Option<&RegistryEntry> {
        self.entries.get(&normalize_label(label))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut RegistryEntry)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }
}

pub(crate) fn normalize_label(label: &str) -> String {
    label.trim().to_ascii_lowercase()
}
