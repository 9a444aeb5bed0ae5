// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Dormand-Prince 5(4) Integrator
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Adaptive explicit Runge-Kutta with embedded 4th-order error estimate
//! and first-same-as-last stage reuse.
//!
//! Steps are clipped so every requested sample time is hit exactly; no
//! dense-output interpolation is needed. The step budget and wall-clock
//! deadline both end the run early with a partial trajectory.

use std::time::{Duration, Instant};

use genecircuit_types::{CircuitError, SimulationConfig};

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// 5th minus 4th order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Right-hand side of `dy/dt = f(t, y)`.
pub trait OdeSystem {
    fn dimension(&self) -> usize;

    /// Write `f(t, y)` into `dydt`. Both slices have `dimension()` entries.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// Sampled solution. `states[k]` is the state at `time[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub time: Vec<f64>,
    pub states: Vec<Vec<f64>>,
    pub steps_accepted: usize,
    pub steps_rejected: usize,
    /// Why integration ended before the last sample, if it did.
    pub stop: Option<CircuitError>,
}

impl Trajectory {
    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }

    pub fn final_state(&self) -> Option<&[f64]> {
        self.states.last().map(Vec::as_slice)
    }

    /// Values of state component `i` across all samples.
    pub fn component(&self, i: usize) -> Vec<f64> {
        self.states.iter().map(|s| s[i]).collect()
    }
}

#[derive(Debug, Clone)]
pub struct DormandPrince {
    pub rtol: f64,
    pub atol: f64,
    pub max_steps: usize,
    pub deadline: Option<Duration>,
}

impl Default for DormandPrince {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

struct Stages {
    k: [Vec<f64>; 7],
    y_stage: Vec<f64>,
    y_new: Vec<f64>,
}

impl Stages {
    fn new(n: usize) -> Self {
        Self {
            k: std::array::from_fn(|_| vec![0.0; n]),
            y_stage: vec![0.0; n],
            y_new: vec![0.0; n],
        }
    }
}

impl DormandPrince {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            rtol: config.rtol,
            atol: config.atol,
            max_steps: config.max_steps,
            deadline: Some(Duration::from_millis(config.deadline_ms)),
        }
    }

    /// Integrate from `y0` at `t_eval[0]` through every later sample.
    ///
    /// `t_eval` must be strictly increasing. The returned trajectory
    /// always holds at least the initial sample.
    pub fn integrate<S: OdeSystem>(&self, system: &S, y0: &[f64], t_eval: &[f64]) -> Trajectory {
        let started = Instant::now();
        let mut out = Trajectory {
            time: Vec::with_capacity(t_eval.len()),
            states: Vec::with_capacity(t_eval.len()),
            steps_accepted: 0,
            steps_rejected: 0,
            stop: None,
        };
        let Some(&t0) = t_eval.first() else {
            return out;
        };
        let n = y0.len();
        out.time.push(t0);
        out.states.push(y0.to_vec());
        if n == 0 {
            for &t in &t_eval[1..] {
                out.time.push(t);
                out.states.push(Vec::new());
            }
            return out;
        }

        let mut st = Stages::new(n);
        let mut t = t0;
        let mut y = y0.to_vec();
        system.rhs(t, &y, &mut st.k[0]);

        let span = t_eval[t_eval.len() - 1] - t0;
        let mut h = self.initial_step(&y, &st.k[0], span);
        let mut next = 1;

        while next < t_eval.len() {
            let attempts = out.steps_accepted + out.steps_rejected;
            if attempts >= self.max_steps {
                out.stop = Some(CircuitError::Integration { steps: attempts });
                break;
            }
            if let Some(limit) = self.deadline {
                if started.elapsed() >= limit {
                    out.stop = Some(CircuitError::Timeout {
                        deadline_ms: limit.as_millis() as u64,
                    });
                    break;
                }
            }

            let target = t_eval[next];
            let remaining = target - t;
            let h_min = 16.0 * f64::EPSILON * t.abs().max(1.0);
            // never leave a sliver shorter than h_min before a sample
            let lands = h >= remaining - h_min;
            let h_step = if lands { remaining } else { h };
            if h_step < h_min {
                out.stop = Some(CircuitError::Numerical(format!(
                    "step size underflow (h={h_step:e}) at t={t}"
                )));
                break;
            }

            self.stages(system, t, h_step, &y, &mut st);
            let err = self.error_norm(h_step, &y, &st);

            if !err.is_finite() || err > 1.0 {
                out.steps_rejected += 1;
                let factor = if err.is_finite() {
                    (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, 1.0)
                } else {
                    MIN_FACTOR
                };
                h = h_step * factor;
                continue;
            }

            out.steps_accepted += 1;
            t = if lands { target } else { t + h_step };
            std::mem::swap(&mut y, &mut st.y_new);
            // FSAL: the last stage is f(t_new, y_new)
            st.k.swap(0, 6);

            let factor = if err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };
            let proposed = h_step * factor;
            h = if lands { h.max(proposed) } else { proposed };

            if lands {
                out.time.push(t);
                out.states.push(y.clone());
                next += 1;
            }
        }

        log::debug!(
            "dopri5: {} accepted, {} rejected, {} of {} samples, {:?}",
            out.steps_accepted,
            out.steps_rejected,
            out.time.len(),
            t_eval.len(),
            started.elapsed()
        );
        out
    }

    fn scale(&self, a: f64, b: f64) -> f64 {
        self.atol + self.rtol * a.abs().max(b.abs())
    }

    /// Hairer's first-step heuristic, single pass.
    fn initial_step(&self, y: &[f64], f0: &[f64], span: f64) -> f64 {
        let n = y.len() as f64;
        let (mut d0, mut d1) = (0.0, 0.0);
        for (yi, fi) in y.iter().zip(f0) {
            let sc = self.scale(*yi, *yi);
            d0 += (yi / sc).powi(2);
            d1 += (fi / sc).powi(2);
        }
        let (d0, d1) = ((d0 / n).sqrt(), (d1 / n).sqrt());
        let h0 = if d0 < 1e-5 || d1 < 1e-5 || !d1.is_finite() {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        h0.min(span.abs()).max(f64::EPSILON)
    }

    fn stages<S: OdeSystem>(&self, system: &S, t: f64, h: f64, y: &[f64], st: &mut Stages) {
        let Stages { k, y_stage, y_new } = st;
        let n = y.len();

        for i in 0..n {
            y_stage[i] = y[i] + h * A21 * k[0][i];
        }
        system.rhs(t + C2 * h, y_stage.as_slice(), &mut k[1]);

        for i in 0..n {
            y_stage[i] = y[i] + h * (A31 * k[0][i] + A32 * k[1][i]);
        }
        system.rhs(t + C3 * h, y_stage.as_slice(), &mut k[2]);

        for i in 0..n {
            y_stage[i] = y[i] + h * (A41 * k[0][i] + A42 * k[1][i] + A43 * k[2][i]);
        }
        system.rhs(t + C4 * h, y_stage.as_slice(), &mut k[3]);

        for i in 0..n {
            y_stage[i] = y[i]
                + h * (A51 * k[0][i] + A52 * k[1][i] + A53 * k[2][i] + A54 * k[3][i]);
        }
        system.rhs(t + C5 * h, y_stage.as_slice(), &mut k[4]);

        for i in 0..n {
            y_stage[i] = y[i]
                + h * (A61 * k[0][i]
                    + A62 * k[1][i]
                    + A63 * k[2][i]
                    + A64 * k[3][i]
                    + A65 * k[4][i]);
        }
        system.rhs(t + h, y_stage.as_slice(), &mut k[5]);

        for i in 0..n {
            y_new[i] = y[i]
                + h * (B1 * k[0][i] + B3 * k[2][i] + B4 * k[3][i] + B5 * k[4][i] + B6 * k[5][i]);
        }
        system.rhs(t + h, y_new.as_slice(), &mut k[6]);
    }

    /// RMS of the scaled local error estimate.
    fn error_norm(&self, h: f64, y: &[f64], st: &Stages) -> f64 {
        let k = &st.k;
        let mut acc = 0.0;
        for i in 0..y.len() {
            let e = h
                * (E1 * k[0][i] + E3 * k[2][i] + E4 * k[3][i] + E5 * k[4][i] + E6 * k[5][i]
                    + E7 * k[6][i]);
            let sc = self.scale(y[i], st.y_new[i]);
            acc += (e / sc).powi(2);
        }
        (acc / y.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay {
        rate: f64,
    }

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = -self.rate * y[0];
        }
    }

    /// Harmonic oscillator: x'' = -x.
    struct Spring;

    impl OdeSystem for Spring {
        fn dimension(&self) -> usize {
            2
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = y[1];
            dydt[1] = -y[0];
        }
    }

    fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| a + (b - a) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn test_exponential_decay() {
        let solver = DormandPrince::default();
        let t = linspace(0.0, 5.0, 51);
        let traj = solver.integrate(&Decay { rate: 1.0 }, &[1.0], &t);
        assert!(traj.is_complete());
        assert_eq!(traj.time.len(), 51);
        for (ti, s) in traj.time.iter().zip(&traj.states) {
            let exact = (-ti).exp();
            assert!((s[0] - exact).abs() < 1e-5, "t={ti} got {} want {exact}", s[0]);
        }
    }

    #[test]
    fn test_samples_hit_exactly() {
        let solver = DormandPrince::default();
        let t = linspace(0.0, 24.0, 241);
        let traj = solver.integrate(&Spring, &[1.0, 0.0], &t);
        assert_eq!(traj.time, t);
        let last = traj.final_state().unwrap();
        assert!((last[0] - 24.0f64.cos()).abs() < 1e-4, "x(24)={}", last[0]);
    }

    #[test]
    fn test_step_budget_stops_early() {
        let solver = DormandPrince {
            max_steps: 3,
            ..Default::default()
        };
        let t = linspace(0.0, 24.0, 241);
        let traj = solver.integrate(&Spring, &[1.0, 0.0], &t);
        assert!(matches!(traj.stop, Some(CircuitError::Integration { .. })));
        assert!(traj.time.len() < t.len());
        assert!(!traj.time.is_empty());
    }

    #[test]
    fn test_empty_system() {
        let solver = DormandPrince::default();
        let t = linspace(0.0, 1.0, 3);
        let traj = solver.integrate(&Decay { rate: 1.0 }, &[], &t);
        assert_eq!(traj.time.len(), 3);
        assert!(traj.states.iter().all(Vec::is_empty));
    }

    #[test]
    fn test_component_extraction() {
        let solver = DormandPrince::default();
        let t = linspace(0.0, 1.0, 11);
        let traj = solver.integrate(&Spring, &[0.0, 1.0], &t);
        let x = traj.component(0);
        assert_eq!(x.len(), 11);
        assert!((x[10] - 1.0f64.sin()).abs() < 1e-6);
    }
}
