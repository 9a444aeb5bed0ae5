// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Part Types and Label Classifier
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Closed part taxonomy plus the single function that turns free-text
//! labels into it.
//!
//! Accepted label shapes (case-insensitive):
//!
//!   promoter_<id>   rbs_<id>   cds_<id>   terminator_<id>
//!   <reg>_start_<id>   <reg>_end_<id>        (software format)
//!   <reg>_<id>_start   <reg>_<id>_end        (hardware format)
//!   floating_<reg>_<id>                      (environmental)
//!   <reg>_<id>                               (bare, no role)
//!
//! where `<reg>` is one of repressor, activator, inducer, inhibitor.

use serde::{Deserialize, Serialize};

use crate::error::{CircuitError, CircuitResult};

pub const DEFAULT_PROMOTER_STRENGTH: f64 = 5.0;
pub const DEFAULT_RBS_EFFICIENCY: f64 = 1.0;
pub const DEFAULT_TRANSLATION_RATE: f64 = 7.0;
pub const DEFAULT_DEGRADATION_RATE: f64 = 1.0;
pub const DEFAULT_INITIAL_CONC: f64 = 0.0;
pub const DEFAULT_TERMINATOR_EFFICIENCY: f64 = 0.99;
pub const DEFAULT_REGULATOR_THRESHOLD: f64 = 0.5;
pub const DEFAULT_HILL_COEFFICIENT: f64 = 2.0;
pub const DEFAULT_FLOATING_CONCENTRATION: f64 = 1.0;

/// Regulator sub-kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulatorKind {
    Repressor,
    Activator,
    Inducer,
    Inhibitor,
}

impl RegulatorKind {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "repressor" => Some(Self::Repressor),
            "activator" => Some(Self::Activator),
            "inducer" => Some(Self::Inducer),
            "inhibitor" => Some(Self::Inhibitor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repressor => "repressor",
            Self::Activator => "activator",
            Self::Inducer => "inducer",
            Self::Inhibitor => "inhibitor",
        }
    }

    /// Repressors and inhibitors lower expression; the rest raise it.
    pub fn is_repressive(&self) -> bool {
        matches!(self, Self::Repressor | Self::Inhibitor)
    }

    /// Name of the Hill threshold for this sub-kind (`Kr` or `Ka`).
    pub fn threshold_name(&self) -> &'static str {
        if self.is_repressive() {
            "Kr"
        } else {
            "Ka"
        }
    }
}

/// Where a regulator marker sits relative to the genes it links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulatorRole {
    /// Follows the CDS that produces the regulatory protein.
    Start,
    /// Follows the promoter the protein acts on.
    End,
    /// No locus; applies to every promoter.
    Floating,
    /// Legacy label with no role token. Never paired.
    Bare,
}

/// Coarse part category, used for tallies and ordering checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartCategory {
    Promoter,
    Rbs,
    Cds,
    Terminator,
    Regulator,
}

impl PartCategory {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "promoter" => Some(Self::Promoter),
            "rbs" => Some(Self::Rbs),
            "cds" => Some(Self::Cds),
            "terminator" => Some(Self::Terminator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Promoter => "promoter",
            Self::Rbs => "rbs",
            Self::Cds => "cds",
            Self::Terminator => "terminator",
            Self::Regulator => "regulator",
        }
    }
}

/// Fully classified part kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartKind {
    Promoter,
    Rbs,
    Cds,
    Terminator,
    Regulator {
        kind: RegulatorKind,
        role: RegulatorRole,
        /// Normalized family key shared by a start/end pair.
        family: String,
    },
}

impl PartKind {
    pub fn category(&self) -> PartCategory {
        match self {
            Self::Promoter => PartCategory::Promoter,
            Self::Rbs => PartCategory::Rbs,
            Self::Cds => PartCategory::Cds,
            Self::Terminator => PartCategory::Terminator,
            Self::Regulator { .. } => PartCategory::Regulator,
        }
    }

    pub fn is_regulator(&self) -> bool {
        matches!(self, Self::Regulator { .. })
    }

    pub fn is_floating(&self) -> bool {
        matches!(
            self,
            Self::Regulator {
                role: RegulatorRole::Floating,
                ..
            }
        )
    }

    pub fn regulator_kind(&self) -> Option<RegulatorKind> {
        match self {
            Self::Regulator { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn family(&self) -> Option<&str> {
        match self {
            Self::Regulator { family, .. } => Some(family.as_str()),
            _ => None,
        }
    }
}

/// Classify a part label, falling back to the producer's kind hint.
///
/// This is the only place label heuristics live. The label wins over
/// the hint when both parse; the hint only rescues labels that carry
/// no recognizable family word (`"pTet"` with hint `"promoter"`).
pub fn classify_label(label: &str, kind_hint: Option<&str>) -> CircuitResult<PartKind> {
    let normalized = label.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(CircuitError::Classification("empty part label".to_string()));
    }
    let tokens: Vec<&str> = normalized.split('_').filter(|t| !t.is_empty()).collect();

    if let Some(kind) = classify_tokens(&normalized, &tokens) {
        return Ok(kind);
    }

    if let Some(hint) = kind_hint {
        let hint = hint.trim().to_ascii_lowercase();
        if let Some(kind) = PartCategory::from_word(&hint).and_then(structural_kind) {
            return Ok(kind);
        }
        if let Some(kind) = RegulatorKind::from_word(&hint) {
            let (role, family) = split_role(&tokens, &normalized);
            return Ok(PartKind::Regulator { kind, role, family });
        }
    }

    Err(CircuitError::Classification(format!(
        "cannot classify part label '{label}' (hint: {kind_hint:?})"
    )))
}

fn classify_tokens(normalized: &str, tokens: &[&str]) -> Option<PartKind> {
    let head = *tokens.first()?;

    if head == "floating" {
        let kind = RegulatorKind::from_word(tokens.get(1)?)?;
        return Some(PartKind::Regulator {
            kind,
            role: RegulatorRole::Floating,
            family: normalized.to_string(),
        });
    }

    if let Some(kind) = RegulatorKind::from_word(head) {
        let (role, family) = split_role(tokens, normalized);
        return Some(PartKind::Regulator { kind, role, family });
    }

    // "promoter_1", "promoter1", "rbs-b" all start with their family word.
    for category in [
        PartCategory::Promoter,
        PartCategory::Terminator,
        PartCategory::Rbs,
        PartCategory::Cds,
    ] {
        if head.starts_with(category.as_str()) {
            return structural_kind(category);
        }
    }
    None
}

/// Regulators carry a sub-kind, so the bare category cannot build one.
fn structural_kind(category: PartCategory) -> Option<PartKind> {
    match category {
        PartCategory::Promoter => Some(PartKind::Promoter),
        PartCategory::Rbs => Some(PartKind::Rbs),
        PartCategory::Cds => Some(PartKind::Cds),
        PartCategory::Terminator => Some(PartKind::Terminator),
        PartCategory::Regulator => None,
    }
}

/// Pull the role token out of a regulator label and return the family key
/// built from the remaining tokens.
fn split_role(tokens: &[&str], normalized: &str) -> (RegulatorRole, String) {
    let role_at = tokens
        .iter()
        .position(|t| *t == "start" || *t == "end");
    match role_at {
        Some(i) => {
            let role = if tokens[i] == "start" {
                RegulatorRole::Start
            } else {
                RegulatorRole::End
            };
            let family: Vec<&str> = tokens
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, t)| *t)
                .collect();
            (role, family.join("_"))
        }
        None => (RegulatorRole::Bare, normalized.to_string()),
    }
}

/// Resolved numeric parameter bag, one variant per part category.
///
/// A variant is always complete: there is no way to hold a CDS with a
/// missing degradation rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartParameters {
    Promoter {
        strength: f64,
    },
    Rbs {
        efficiency: f64,
    },
    Cds {
        translation_rate: f64,
        degradation_rate: f64,
        #[serde(alias = "init_conc")]
        initial_conc: f64,
    },
    Terminator {
        efficiency: f64,
    },
    Regulator {
        /// Kr for repressive sub-kinds, Ka otherwise.
        #[serde(alias = "Kr", alias = "Ka", alias = "kr", alias = "ka")]
        threshold: f64,
        n: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        concentration: Option<f64>,
    },
}

impl PartParameters {
    /// Documented defaults used when a label has no registry entry.
    ///
    /// `hint` (the producer's strength reading) replaces the promoter
    /// strength or RBS efficiency when present and usable.
    pub fn fallback(kind: &PartKind, hint: Option<f64>) -> Self {
        let hint = hint.filter(|h| h.is_finite() && *h >= 0.0);
        match kind {
            PartKind::Promoter => Self::Promoter {
                strength: hint.unwrap_or(DEFAULT_PROMOTER_STRENGTH),
            },
            PartKind::Rbs => Self::Rbs {
                efficiency: hint.unwrap_or(DEFAULT_RBS_EFFICIENCY),
            },
            PartKind::Cds => Self::Cds {
                translation_rate: DEFAULT_TRANSLATION_RATE,
                degradation_rate: DEFAULT_DEGRADATION_RATE,
                initial_conc: DEFAULT_INITIAL_CONC,
            },
            PartKind::Terminator => Self::Terminator {
                efficiency: DEFAULT_TERMINATOR_EFFICIENCY,
            },
            PartKind::Regulator { role, .. } => Self::Regulator {
                threshold: DEFAULT_REGULATOR_THRESHOLD,
                n: DEFAULT_HILL_COEFFICIENT,
                concentration: (*role == RegulatorRole::Floating)
                    .then_some(DEFAULT_FLOATING_CONCENTRATION),
            },
        }
    }

    pub fn category(&self) -> PartCategory {
        match self {
            Self::Promoter { .. } => PartCategory::Promoter,
            Self::Rbs { .. } => PartCategory::Rbs,
            Self::Cds { .. } => PartCategory::Cds,
            Self::Terminator { .. } => PartCategory::Terminator,
            Self::Regulator { .. } => PartCategory::Regulator,
        }
    }

    /// Read a field by its override name.
    pub fn field(&self, name: &str) -> Option<f64> {
        match (self, name) {
            (Self::Promoter { strength }, "strength") => Some(*strength),
            (Self::Rbs { efficiency }, "efficiency")
            | (Self::Terminator { efficiency }, "efficiency") => Some(*efficiency),
            (Self::Cds { translation_rate, .. }, "translation_rate") => Some(*translation_rate),
            (Self::Cds { degradation_rate, .. }, "degradation_rate") => Some(*degradation_rate),
            (Self::Cds { initial_conc, .. }, "initial_conc" | "init_conc") => Some(*initial_conc),
            (Self::Regulator { threshold, .. }, "threshold" | "kr" | "ka") => Some(*threshold),
            (Self::Regulator { n, .. }, "n") => Some(*n),
            (Self::Regulator { concentration, .. }, "concentration") => *concentration,
            _ => None,
        }
    }

    /// Overwrite a field by its override name. Returns `false` when the
    /// field does not exist on this variant.
    pub fn set_field(&mut self, name: &str, value: f64) -> bool {
        let slot: &mut f64 = match (self, name) {
            (Self::Promoter { strength }, "strength") => strength,
            (Self::Rbs { efficiency }, "efficiency")
            | (Self::Terminator { efficiency }, "efficiency") => efficiency,
            (Self::Cds { translation_rate, .. }, "translation_rate") => translation_rate,
            (Self::Cds { degradation_rate, .. }, "degradation_rate") => degradation_rate,
            (Self::Cds { initial_conc, .. }, "initial_conc" | "init_conc") => initial_conc,
            (Self::Regulator { threshold, .. }, "threshold" | "kr" | "ka") => threshold,
            (Self::Regulator { n, .. }, "n") => n,
            (Self::Regulator { concentration, .. }, "concentration") => {
                *concentration = Some(value);
                return true;
            }
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Multiply a field in place. No-op when the field is absent.
    pub fn scale_field(&mut self, name: &str, factor: f64) {
        if let Some(current) = self.field(name) {
            self.set_field(name, current * factor);
        }
    }

    pub fn strength(&self) -> Option<f64> {
        self.field("strength")
    }

    pub fn efficiency(&self) -> Option<f64> {
        self.field("efficiency")
    }
}

/// One raw entry from the producer (board state or hardware scan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInput {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind_hint: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength_hint: Option<f64>,
}

impl PartInput {
    pub fn new(label: impl Into<String>, position: i64) -> Self {
        Self {
            label: label.into(),
            kind_hint: None,
            position,
            strength_hint: None,
        }
    }
}

/// Ordered input stream: parts separated by explicit block boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum SequenceEntry {
    Part(PartInput),
    Gap,
}

impl SequenceEntry {
    pub fn part(label: impl Into<String>, position: i64) -> Self {
        Self::Part(PartInput::new(label, position))
    }
}

/// One placed, classified part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInstance {
    pub label: String,
    pub kind: PartKind,
    /// Unique, strictly increasing across the whole input.
    pub sequence_index: usize,
    /// Producer-supplied position, kept for display only.
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_id: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<PartParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength_hint: Option<f64>,
}

impl PartInstance {
    pub fn new(label: impl Into<String>, kind: PartKind, sequence_index: usize) -> Self {
        Self {
            label: label.into(),
            kind,
            sequence_index,
            position: sequence_index as i64,
            circuit_id: None,
            parameters: None,
            strength_hint: None,
        }
    }

    pub fn category(&self) -> PartCategory {
        self.kind.category()
    }

    pub fn is_regulator(&self) -> bool {
        self.kind.is_regulator()
    }
}
