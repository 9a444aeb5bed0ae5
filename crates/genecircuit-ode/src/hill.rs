// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Hill Kinetics
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Cooperative dose-response terms.
//!
//!   repression:  K^n / (K^n + x^n)
//!   activation:  x^n / (K^n + x^n)
//!
//! Negative regulator levels are read as zero. NaN levels propagate.

use genecircuit_types::{HillMode, HillParams};

/// Fraction of promoter activity left under repressor level `x`.
#[inline]
pub fn hill_repression(x: f64, k: f64, n: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let kn = k.powf(n);
    let xn = x.powf(n);
    let denom = kn + xn;
    if denom <= 0.0 {
        return 1.0;
    }
    kn / denom
}

/// Fraction of promoter activity driven by activator level `x`.
#[inline]
pub fn hill_activation(x: f64, k: f64, n: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let kn = k.powf(n);
    let xn = x.powf(n);
    let denom = kn + xn;
    if denom <= 0.0 {
        return 0.0;
    }
    xn / denom
}

/// Multiplicative factor for one regulatory input.
#[inline]
pub fn hill_factor(mode: HillMode, x: f64, params: HillParams) -> f64 {
    match mode {
        HillMode::Repression => hill_repression(x, params.threshold, params.n),
        HillMode::Activation => hill_activation(x, params.threshold, params.n),
        HillMode::None => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repression_boundaries() {
        assert_eq!(hill_repression(0.0, 0.5, 2.0), 1.0);
        let f = hill_repression(5.0, 0.5, 2.0);
        assert!(f < 0.02, "f={f}");
        assert!((hill_repression(0.5, 0.5, 2.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_activation_boundaries() {
        assert_eq!(hill_activation(0.0, 0.4, 2.0), 0.0);
        assert!((hill_activation(0.4, 0.4, 2.0) - 0.5).abs() < 1e-12);
        assert!(hill_activation(40.0, 0.4, 2.0) > 0.999);
    }

    #[test]
    fn test_negative_level_reads_as_zero() {
        let p = HillParams { threshold: 0.5, n: 2.0 };
        assert_eq!(hill_factor(HillMode::Repression, -1e-9, p), 1.0);
        assert_eq!(hill_factor(HillMode::Activation, -3.0, p), 0.0);
    }

    #[test]
    fn test_nan_level_propagates() {
        let p = HillParams { threshold: 0.5, n: 2.0 };
        assert!(hill_factor(HillMode::Repression, f64::NAN, p).is_nan());
        assert!(hill_factor(HillMode::Activation, f64::NAN, p).is_nan());
        assert_eq!(hill_factor(HillMode::None, f64::NAN, p), 1.0);
    }

    #[test]
    fn test_repression_monotone() {
        let mut prev = 1.0;
        for i in 1..50 {
            let f = hill_repression(i as f64 * 0.1, 0.35, 2.0);
            assert!(f < prev, "not decreasing at x={}", i as f64 * 0.1);
            prev = f;
        }
    }

    #[test]
    fn test_unit_factor() {
        let p = HillParams { threshold: 0.5, n: 2.0 };
        assert_eq!(hill_factor(HillMode::None, 123.0, p), 1.0);
    }
}
