// ─────────────────────────────────────────────────────────────────────
// Gene Circuit Simulator — Regulatory Topology
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
//! Directed source → target gene graph, feedback-cycle detection and
//! the symmetry-breaking seed.
//!
//! A ring of identical repressors started from all-zero concentrations
//! sits on an unstable symmetric fixed point: every protein rises in
//! lockstep and the solver never leaves the symmetric manifold. Seeding
//! one asymmetric start vector lets the oscillation develop.

use genecircuit_types::SimulationConfig;

/// Upper bound on DFS node expansions during cycle search.
const EXPANSION_BUDGET: usize = 200_000;

#[derive(Debug, Clone, Default)]
pub struct RegulatoryGraph {
    adjacency: Vec<Vec<usize>>,
}

impl RegulatoryGraph {
    /// Build from `(source_state, target_state)` edges. Duplicate edges
    /// and out-of-range endpoints are dropped.
    pub fn new(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut adjacency = vec![Vec::new(); n];
        for (from, to) in edges {
            if from < n && to < n && !adjacency[from].contains(&to) {
                adjacency[from].push(to);
            }
        }
        for targets in &mut adjacency {
            targets.sort_unstable();
        }
        Self { adjacency }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Whether any simple directed cycle has at least `min_len` nodes.
    ///
    /// Each cycle is enumerated once, from its lowest-index node. Returns
    /// `false` if the expansion budget runs out first.
    pub fn has_cycle_of_length(&self, min_len: usize) -> bool {
        let n = self.adjacency.len();
        if min_len == 0 || n < min_len.max(1) {
            return false;
        }
        let mut on_path = vec![false; n];
        let mut path = Vec::with_capacity(n);
        let mut budget = EXPANSION_BUDGET;
        for start in 0..n {
            on_path[start] = true;
            path.push(start);
            let found = self.search(start, start, min_len, &mut on_path, &mut path, &mut budget);
            path.pop();
            on_path[start] = false;
            if found {
                return true;
            }
            if budget == 0 {
                log::debug!("cycle search budget exhausted at start node {start}");
                return false;
            }
        }
        false
    }

    fn search(
        &self,
        start: usize,
        node: usize,
        min_len: usize,
        on_path: &mut [bool],
        path: &mut Vec<usize>,
        budget: &mut usize,
    ) -> bool {
        for &next in &self.adjacency[node] {
            if *budget == 0 {
                return false;
            }
            *budget -= 1;
            if next == start {
                if path.len() >= min_len {
                    return true;
                }
                continue;
            }
            if next < start || on_path[next] {
                continue;
            }
            on_path[next] = true;
            path.push(next);
            let found = self.search(start, next, min_len, on_path, path, budget);
            path.pop();
            on_path[next] = false;
            if found {
                return true;
            }
        }
        false
    }
}

/// Whether the seed should replace `initial`.
pub fn needs_symmetry_breaking(
    graph: &RegulatoryGraph,
    initial: &[f64],
    config: &SimulationConfig,
) -> bool {
    config.symmetry_breaking
        && !config.symmetry_seed.is_empty()
        && !initial.is_empty()
        && initial.iter().all(|&v| v == 0.0)
        && graph.has_cycle_of_length(config.min_cycle_length)
}

/// Overwrite `state` with `seed`, cycling. No-op for an empty seed.
pub fn apply_seed(state: &mut [f64], seed: &[f64]) {
    if seed.is_empty() {
        return;
    }
    for (i, v) in state.iter_mut().enumerate() {
        *v = seed[i % seed.len()];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize) -> RegulatoryGraph {
        RegulatoryGraph::new(n, (0..n).map(|i| (i, (i + 1) % n)))
    }

    #[test]
    fn test_three_ring_detected() {
        let g = ring(3);
        assert!(g.has_cycle_of_length(3));
        assert!(!g.has_cycle_of_length(4));
    }

    #[test]
    fn test_toggle_switch_is_short_cycle() {
        let g = RegulatoryGraph::new(2, [(0, 1), (1, 0)]);
        assert!(g.has_cycle_of_length(2));
        assert!(!g.has_cycle_of_length(3));
    }

    #[test]
    fn test_self_loop_and_chain() {
        let g = RegulatoryGraph::new(4, [(0, 0), (0, 1), (1, 2), (2, 3)]);
        assert!(!g.has_cycle_of_length(2));
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_cycle_not_through_node_zero() {
        let g = RegulatoryGraph::new(5, [(0, 1), (1, 2), (2, 3), (3, 4), (4, 2)]);
        assert!(g.has_cycle_of_length(3));
    }

    #[test]
    fn test_duplicate_edges_dropped() {
        let g = RegulatoryGraph::new(2, [(0, 1), (0, 1), (5, 0)]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_seed_cycles() {
        let mut y = vec![0.0; 5];
        apply_seed(&mut y, &[1.0, 0.1, 0.05]);
        assert_eq!(y, vec![1.0, 0.1, 0.05, 1.0, 0.1]);
    }

    #[test]
    fn test_seed_conditions() {
        let cfg = SimulationConfig::default();
        let g = ring(3);
        assert!(needs_symmetry_breaking(&g, &[0.0, 0.0, 0.0], &cfg));
        assert!(!needs_symmetry_breaking(&g, &[0.0, 0.2, 0.0], &cfg));
        let off = SimulationConfig {
            symmetry_breaking: false,
            ..Default::default()
        };
        assert!(!needs_symmetry_breaking(&g, &[0.0, 0.0, 0.0], &off));
        assert!(!needs_symmetry_breaking(&ring(2), &[0.0, 0.0], &cfg));
    }
}
