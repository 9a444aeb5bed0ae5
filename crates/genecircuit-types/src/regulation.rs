// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Regulation Records
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

/// Normalized relationship between a regulatory protein and a promoter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulationKind {
    TranscriptionalRepression,
    TranscriptionalActivation,
    SelfRepression,
    SelfActivation,
    InducedActivation,
    EnvironmentalRepression,
    EnvironmentalActivation,
    Constitutive,
}

/// Which Hill form a regulation contributes to the production term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HillMode {
    Repression,
    Activation,
    /// Unit factor.
    None,
}

impl RegulationKind {
    pub fn mode(&self) -> HillMode {
        match self {
            Self::TranscriptionalRepression
            | Self::SelfRepression
            | Self::EnvironmentalRepression => HillMode::Repression,
            Self::TranscriptionalActivation
            | Self::SelfActivation
            | Self::InducedActivation
            | Self::EnvironmentalActivation => HillMode::Activation,
            Self::Constitutive => HillMode::None,
        }
    }

    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            Self::EnvironmentalRepression | Self::EnvironmentalActivation
        )
    }

    pub fn is_self(&self) -> bool {
        matches!(self, Self::SelfRepression | Self::SelfActivation)
    }

    /// Self-regulating counterpart of a transcriptional kind.
    pub fn as_self(&self) -> Self {
        match self.mode() {
            HillMode::Repression => Self::SelfRepression,
            HillMode::Activation => Self::SelfActivation,
            HillMode::None => *self,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TranscriptionalRepression => "transcriptional_repression",
            Self::TranscriptionalActivation => "transcriptional_activation",
            Self::SelfRepression => "self_repression",
            Self::SelfActivation => "self_activation",
            Self::InducedActivation => "induced_activation",
            Self::EnvironmentalRepression => "environmental_repression",
            Self::EnvironmentalActivation => "environmental_activation",
            Self::Constitutive => "constitutive",
        }
    }
}

/// Hill threshold (Kr or Ka) and cooperativity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HillParams {
    pub threshold: f64,
    pub n: f64,
}

/// One resolved regulatory relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulationRecord {
    pub kind: RegulationKind,
    /// Regulator family key; `None` for constitutive records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// Label of the CDS producing the regulator; `None` for
    /// environmental and constitutive records.
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<usize>,
    /// Promoter labels whose downstream production is modulated.
    ///
    /// Empty only for the constitutive record of a CDS that sits upstream
    /// of every promoter in its block; that gene is still listed in
    /// `target_genes` and is simulated with `kprod = 0`.
    pub targets: Vec<String>,
    pub target_indices: Vec<usize>,
    /// CDS labels downstream of the targets.
    pub target_genes: Vec<String>,
    pub gene_indices: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<HillParams>,
    /// Fixed regulator level for environmental records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concentration: Option<f64>,
}

impl RegulationRecord {
    pub fn regulates_gene(&self, sequence_index: usize) -> bool {
        self.gene_indices.contains(&sequence_index)
    }

    pub fn targets_promoter(&self, sequence_index: usize) -> bool {
        self.target_indices.contains(&sequence_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes() {
        assert_eq!(RegulationKind::InducedActivation.mode(), HillMode::Activation);
        assert_eq!(RegulationKind::EnvironmentalRepression.mode(), HillMode::Repression);
        assert_eq!(RegulationKind::Constitutive.mode(), HillMode::None);
    }

    #[test]
    fn test_as_self() {
        assert_eq!(
            RegulationKind::TranscriptionalRepression.as_self(),
            RegulationKind::SelfRepression
        );
        assert_eq!(
            RegulationKind::InducedActivation.as_self(),
            RegulationKind::SelfActivation
        );
        assert_eq!(RegulationKind::Constitutive.as_self(), RegulationKind::Constitutive);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&RegulationKind::TranscriptionalRepression).unwrap();
        assert_eq!(json, "\"transcriptional_repression\"");
        assert_eq!(
            RegulationKind::TranscriptionalRepression.as_str(),
            "transcriptional_repression"
        );
    }
}
