// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Parameter Override Resolver
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Three-tier parameter precedence:
//!
//!   1. copy the registry defaults
//!   2. per-instance overrides  `<kind><id>_<field>`  (e.g. `promoter1_strength`)
//!   3. global multipliers on the step-2 values (e.g. `global_transcription_rate`)
//!
//! so `{promoter1_strength: 10, global_transcription_rate: 1.5}` over a
//! default of 5.0 resolves to 15.0. The input registry is never touched;
//! every call returns a fresh value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use genecircuit_types::{Diagnostic, DiagnosticCategory, PartCategory};

use crate::ranges::dial_range;
use crate::registry::PartRegistry;

/// Flat key → value override mapping plus the all-or-nothing toggle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRequest {
    #[serde(default = "default_apply")]
    pub apply: bool,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

fn default_apply() -> bool {
    true
}

impl Default for OverrideRequest {
    fn default() -> Self {
        Self {
            apply: true,
            values: BTreeMap::new(),
        }
    }
}

impl OverrideRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.apply = false;
        self
    }
}

/// Type-wide multiplier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalMultiplier {
    Transcription,
    Translation,
    Degradation,
    Temperature,
    Resources,
}

impl GlobalMultiplier {
    pub const ALL: [Self; 5] = [
        Self::Transcription,
        Self::Translation,
        Self::Degradation,
        Self::Temperature,
        Self::Resources,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Transcription => "global_transcription_rate",
            Self::Translation => "global_translation_rate",
            Self::Degradation => "global_degradation_rate",
            Self::Temperature => "temperature_factor",
            Self::Resources => "resource_availability",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }

    /// Fields this multiplier scales, per part category.
    pub fn targets(&self) -> &'static [(PartCategory, &'static str)] {
        const EXPRESSION: &[(PartCategory, &str)] = &[
            (PartCategory::Promoter, "strength"),
            (PartCategory::Rbs, "efficiency"),
            (PartCategory::Cds, "translation_rate"),
        ];
        match self {
            Self::Transcription => &[(PartCategory::Promoter, "strength")],
            Self::Translation => &[
                (PartCategory::Rbs, "efficiency"),
                (PartCategory::Cds, "translation_rate"),
            ],
            Self::Degradation => &[(PartCategory::Cds, "degradation_rate")],
            Self::Temperature | Self::Resources => EXPRESSION,
        }
    }
}

/// Override field names, longest-suffix first.
const FIELD_NAMES: [&str; 11] = [
    "translation_rate",
    "degradation_rate",
    "initial_conc",
    "init_conc",
    "concentration",
    "efficiency",
    "threshold",
    "strength",
    "kr",
    "ka",
    "n",
];

/// Parsed `<kind><id>_<field>` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceKey {
    /// Compacted address, e.g. `promoter1` or `repressora`.
    pub address: String,
    pub field: &'static str,
}

/// Split an instance override key into address and field.
///
/// Underscores inside the address are insignificant, so
/// `promoter1_strength` and `promoter_1_strength` address the same part.
pub fn parse_instance_key(key: &str) -> Option<InstanceKey> {
    let key = key.trim().to_ascii_lowercase();
    FIELD_NAMES.into_iter().find_map(|field| {
        let prefix = key.strip_suffix(field)?.strip_suffix('_')?;
        let address = compact(prefix);
        (!address.is_empty()).then_some(InstanceKey { address, field })
    })
}

/// Address a registry label answers to: role tokens dropped, underscores
/// removed. `repressor_start_1` and `repressor_end_1` both answer to
/// `repressor1`.
pub fn entry_address(label: &str) -> String {
    label
        .trim()
        .to_ascii_lowercase()
        .split('_')
        .filter(|t| *t != "start" && *t != "end")
        .collect::<Vec<_>>()
        .concat()
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| *c != '_' && *c != '-').collect()
}

/// Output of one resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveRegistry {
    pub registry: PartRegistry,
    /// Keys that changed at least one entry.
    pub applied: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve the effective registry for one request.
///
/// With no request, or `apply == false`, the result is an unmodified
/// copy of `defaults` and the request's values are not even inspected.
pub fn resolve_parameters(
    defaults: &PartRegistry,
    request: Option<&OverrideRequest>,
) -> EffectiveRegistry {
    let mut out = EffectiveRegistry {
        registry: defaults.clone(),
        applied: Vec::new(),
        diagnostics: Vec::new(),
    };
    let request = match request {
        Some(r) if r.apply => r,
        Some(r) => {
            log::debug!("overrides disabled; ignoring {} keys", r.values.len());
            return out;
        }
        None => return out,
    };

    let mut instance = Vec::new();
    let mut global = Vec::new();
    for (key, &value) in &request.values {
        let normalized = key.trim().to_ascii_lowercase();
        if let Some(multiplier) = GlobalMultiplier::from_key(&normalized) {
            global.push((key.as_str(), multiplier, value));
        } else if let Some(parsed) = parse_instance_key(&normalized) {
            instance.push((key.as_str(), parsed, value));
        } else {
            out.diagnostics.push(Diagnostic::warn(
                DiagnosticCategory::Override,
                format!("unrecognized override key '{key}' ignored"),
            ));
        }
    }

    if !instance.is_empty() {
        let mut addresses: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (label, _) in out.registry.iter() {
            addresses
                .entry(entry_address(label))
                .or_default()
                .push(label.to_string());
        }
        for (key, parsed, value) in instance {
            apply_instance(&mut out, &addresses, key, &parsed, value);
        }
    }

    for multiplier in GlobalMultiplier::ALL {
        for &(key, m, value) in &global {
            if m == multiplier {
                apply_global(&mut out, key, multiplier, value);
            }
        }
    }

    log::debug!(
        "resolved overrides: {} applied, {} diagnostics",
        out.applied.len(),
        out.diagnostics.len()
    );
    out
}

fn apply_instance(
    out: &mut EffectiveRegistry,
    addresses: &BTreeMap<String, Vec<String>>,
    key: &str,
    parsed: &InstanceKey,
    value: f64,
) {
    if !value.is_finite() || value < 0.0 {
        out.diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Override,
            format!("override '{key}' rejected: value {value} must be finite and >= 0"),
        ));
        return;
    }
    if value == 0.0 && matches!(parsed.field, "degradation_rate" | "n") {
        out.diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Override,
            format!("override '{key}' rejected: {} must be > 0", parsed.field),
        ));
        return;
    }
    let Some(labels) = addresses.get(&parsed.address) else {
        out.diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Override,
            format!("override '{key}' addresses no registry entry"),
        ));
        return;
    };

    let mut touched = 0usize;
    for (label, entry) in out.registry.iter_mut() {
        if labels.iter().any(|l| l == label) && entry.params.set_field(parsed.field, value) {
            touched += 1;
        }
    }
    if touched == 0 {
        out.diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Override,
            format!(
                "override '{key}': field '{}' does not apply to {}",
                parsed.field,
                labels.join(", ")
            ),
        ));
        return;
    }
    if let Some(range) = dial_range(parsed.field) {
        if !range.contains(value) {
            out.diagnostics.push(Diagnostic::warn(
                DiagnosticCategory::Override,
                format!(
                    "override '{key}' = {value} is outside the dial range [{}, {}]",
                    range.min, range.max
                ),
            ));
        }
    }
    out.applied.push(key.to_string());
}

fn apply_global(out: &mut EffectiveRegistry, key: &str, multiplier: GlobalMultiplier, value: f64) {
    if !value.is_finite() || value <= 0.0 {
        out.diagnostics.push(Diagnostic::warn(
            DiagnosticCategory::Override,
            format!("multiplier '{key}' rejected: value {value} must be finite and > 0"),
        ));
        return;
    }
    if let Some(range) = dial_range(multiplier.key()) {
        if !range.contains(value) {
            out.diagnostics.push(Diagnostic::warn(
                DiagnosticCategory::Override,
                format!(
                    "multiplier '{key}' = {value} is outside the dial range [{}, {}]",
                    range.min, range.max
                ),
            ));
        }
    }
    for (_, entry) in out.registry.iter_mut() {
        for &(category, field) in multiplier.targets() {
            if entry.category == category {
                entry.params.scale_field(field, value);
            }
        }
    }
    out.applied.push(key.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryEntry;

    fn strength(reg: &PartRegistry, label: &str) -> f64 {
        reg.get(label).unwrap().params.strength().unwrap()
    }

    #[test]
    fn test_parse_instance_key() {
        let k = parse_instance_key("promoter1_strength").unwrap();
        assert_eq!(k.address, "promoter1");
        assert_eq!(k.field, "strength");
        let k = parse_instance_key("cds_2_degradation_rate").unwrap();
        assert_eq!(k.address, "cds2");
        assert_eq!(k.field, "degradation_rate");
        let k = parse_instance_key("repressor_a_n").unwrap();
        assert_eq!(k.address, "repressora");
        assert_eq!(k.field, "n");
        assert!(parse_instance_key("strength").is_none());
        assert!(parse_instance_key("promoter1strength").is_none());
    }

    #[test]
    fn test_entry_address_drops_roles() {
        assert_eq!(entry_address("repressor_start_1"), "repressor1");
        assert_eq!(entry_address("repressor_1_end"), "repressor1");
        assert_eq!(entry_address("promoter_1"), "promoter1");
    }

    #[test]
    fn test_override_then_multiplier() {
        let defaults = PartRegistry::builtin();
        let req = OverrideRequest::new()
            .with("promoter1_strength", 10.0)
            .with("global_transcription_rate", 1.5);
        let eff = resolve_parameters(&defaults, Some(&req));
        assert!((strength(&eff.registry, "promoter_1") - 15.0).abs() < 1e-12);
        assert!((strength(&eff.registry, "promoter_2") - 7.5).abs() < 1e-12);
        assert_eq!(strength(&defaults, "promoter_1"), 5.0);
    }

    #[test]
    fn test_disabled_request_returns_defaults() {
        let defaults = PartRegistry::builtin();
        let req = OverrideRequest::new()
            .with("promoter1_strength", 10.0)
            .with("global_degradation_rate", 2.0)
            .with("garbage", 1.0)
            .disabled();
        let eff = resolve_parameters(&defaults, Some(&req));
        assert_eq!(eff.registry, defaults);
        assert!(eff.diagnostics.is_empty());
        assert!(eff.applied.is_empty());
    }

    #[test]
    fn test_no_request_returns_defaults() {
        let defaults = PartRegistry::builtin();
        assert_eq!(resolve_parameters(&defaults, None).registry, defaults);
    }

    #[test]
    fn test_idempotent() {
        let defaults = PartRegistry::builtin();
        let req = OverrideRequest::new()
            .with("cds1_degradation_rate", 0.4)
            .with("temperature_factor", 1.2)
            .with("resource_availability", 0.8);
        let a = resolve_parameters(&defaults, Some(&req));
        let b = resolve_parameters(&defaults, Some(&req));
        assert_eq!(a, b);
    }

    #[test]
    fn test_translation_and_degradation_multipliers() {
        let defaults = PartRegistry::builtin();
        let req = OverrideRequest::new()
            .with("global_translation_rate", 2.0)
            .with("global_degradation_rate", 0.5);
        let eff = resolve_parameters(&defaults, Some(&req));
        let cds = &eff.registry.get("cds_1").unwrap().params;
        assert_eq!(cds.field("translation_rate"), Some(14.0));
        assert_eq!(cds.field("degradation_rate"), Some(0.5));
        assert_eq!(eff.registry.get("rbs_1").unwrap().params.efficiency(), Some(2.0));
        // terminators are not expression dials
        assert_eq!(
            eff.registry.get("terminator_1").unwrap().params.efficiency(),
            Some(0.99)
        );
    }

    #[test]
    fn test_temperature_and_resources_compound() {
        let defaults = PartRegistry::builtin();
        let req = OverrideRequest::new()
            .with("temperature_factor", 2.0)
            .with("resource_availability", 0.5)
            .with("global_transcription_rate", 3.0);
        let eff = resolve_parameters(&defaults, Some(&req));
        assert!((strength(&eff.registry, "promoter_a") - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_regulator_override_hits_both_roles() {
        let defaults = PartRegistry::builtin();
        let req = OverrideRequest::new().with("repressor1_kr", 0.2);
        let eff = resolve_parameters(&defaults, Some(&req));
        for label in ["repressor_start_1", "repressor_end_1"] {
            assert_eq!(eff.registry.get(label).unwrap().params.field("kr"), Some(0.2));
        }
        assert_eq!(
            eff.registry.get("repressor_start_2").unwrap().params.field("kr"),
            Some(0.35)
        );
    }

    #[test]
    fn test_bad_values_rejected() {
        let defaults = PartRegistry::builtin();
        let req = OverrideRequest::new()
            .with("cds1_degradation_rate", 0.0)
            .with("promoter1_strength", -1.0)
            .with("global_transcription_rate", f64::NAN)
            .with("promoter9_strength", 1.0)
            .with("promoter1_degradation_rate", 1.0);
        let eff = resolve_parameters(&defaults, Some(&req));
        assert_eq!(eff.registry, defaults);
        assert_eq!(eff.diagnostics.len(), 5);
        assert!(eff.applied.is_empty());
    }

    #[test]
    fn test_out_of_dial_range_applies_with_warning() {
        let defaults = PartRegistry::builtin();
        let req = OverrideRequest::new().with("promoter1_strength", 10.0);
        let eff = resolve_parameters(&defaults, Some(&req));
        assert_eq!(strength(&eff.registry, "promoter_1"), 10.0);
        assert_eq!(eff.diagnostics.len(), 1);
        assert_eq!(eff.diagnostics[0].category, DiagnosticCategory::Override);
    }

    #[test]
    fn test_custom_registry() {
        let mut defaults = PartRegistry::new();
        defaults.insert("promoter_1", RegistryEntry::promoter(5.0));
        let req = OverrideRequest::new()
            .with("promoter1_strength", 10.0)
            .with("global_transcription_rate", 1.5);
        let eff = resolve_parameters(&defaults, Some(&req));
        assert!((strength(&eff.registry, "promoter_1") - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_request_json_defaults_apply_true() {
        let req: OverrideRequest =
            serde_json::from_str(r#"{"values": {"promoter1_strength": 2.0}}"#).unwrap();
        assert!(req.apply);
    }
}
