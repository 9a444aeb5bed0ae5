// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Dial Ranges
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Physical ranges of the parameter dials on the board front-end.
//! Values outside a range are still applied; the resolver only warns.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialRange {
    pub min: f64,
    pub max: f64,
}

impl DialRange {
    const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Dial range for an override field or global multiplier key.
pub fn dial_range(name: &str) -> Option<DialRange> {
    let range = match name {
        "strength" => DialRange::new(0.1, 5.0),
        "efficiency" => DialRange::new(0.1, 2.0),
        "translation_rate" => DialRange::new(1.0, 20.0),
        "degradation_rate" => DialRange::new(0.01, 1.0),
        "kr" | "ka" | "threshold" | "binding_affinity" => DialRange::new(0.01, 1.0),
        "n" | "cooperativity" => DialRange::new(0.5, 3.0),
        "max_expression" => DialRange::new(10.0, 500.0),
        "global_transcription_rate" | "global_translation_rate" | "global_degradation_rate" => {
            DialRange::new(0.1, 3.0)
        }
        "temperature_factor" => DialRange::new(0.5, 2.0),
        "resource_availability" => DialRange::new(0.1, 2.0),
        _ => return None,
    };
    Some(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ranges() {
        assert!(dial_range("strength").unwrap().contains(5.0));
        assert!(!dial_range("strength").unwrap().contains(10.0));
        assert!(dial_range("kr").unwrap().contains(0.35));
        assert!(dial_range("temperature_factor").unwrap().contains(0.5));
    }

    #[test]
    fn test_unranged_fields() {
        assert!(dial_range("initial_conc").is_none());
        assert!(dial_range("concentration").is_none());
    }
}
