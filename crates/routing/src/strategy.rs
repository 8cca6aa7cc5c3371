//! Routing strategies (component D): single-shortest, k-shortest-simple,
//! k-disjoint-greedy, k-similarity-bounded.
//!
//! Grounded on `strategies/routing/{single_shortest_path_strat,
//! k_shortest_path_strat,k_disjoint_path_strat,k_similarity_bounded_strat}.py`.

use icarus_core::coords::great_circle_m;
use icarus_core::types::{Coverage, GridPos, LbSet, SatPos};
use std::collections::HashSet;

use crate::graph::{dijkstra_cutoff, k_shortest_simple_paths, GroundOverlay, Network, NodeId};

pub trait RoutingStrategy: icarus_core::strategy::Strategy {
    /// Route one sd-pair, returning the path(s) chosen for it (possibly
    /// empty if no path satisfies the cutoff).
    fn route(
        &self,
        g: &Network,
        grid_pos: &GridPos,
        coverage: &Coverage,
        src: u32,
        dst: u32,
    ) -> LbSet;
}

fn cutoff_for(grid_pos: &GridPos, src: u32, dst: u32, stretch: f64) -> f64 {
    let a = grid_pos[&src].geo();
    let b = grid_pos[&dst].geo();
    great_circle_m(&a, &b) * stretch
}

/// One shortest path under `stretch * great_circle(src, dst)`.
pub struct SspRoutStrat {
    pub stretch: f64,
}
impl icarus_core::strategy::Strategy for SspRoutStrat {
    fn name(&self) -> &'static str {
        "ssp"
    }
    fn param_description(&self) -> String {
        format!("{}", self.stretch)
    }
}
impl RoutingStrategy for SspRoutStrat {
    fn route(&self, g: &Network, grid_pos: &GridPos, coverage: &Coverage, src: u32, dst: u32) -> LbSet {
        let cutoff = cutoff_for(grid_pos, src, dst, self.stretch);
        let overlay = GroundOverlay::for_pair(&[src, dst], coverage);
        let (s, d) = (-(src as NodeId), -(dst as NodeId));
        match dijkstra_cutoff(g, &overlay, s, d, cutoff, &HashSet::new(), &HashSet::new()) {
            Some((path, len)) => vec![(path, len)],
            None => Vec::new(),
        }
    }
}

/// The `k` shortest simple paths under the same cutoff.
pub struct KspRoutStrat {
    pub stretch: f64,
    pub k: usize,
}
impl icarus_core::strategy::Strategy for KspRoutStrat {
    fn name(&self) -> &'static str {
        "ksp"
    }
    fn param_description(&self) -> String {
        format!("{}k{}", self.stretch, self.k)
    }
}
impl RoutingStrategy for KspRoutStrat {
    fn route(&self, g: &Network, grid_pos: &GridPos, coverage: &Coverage, src: u32, dst: u32) -> LbSet {
        let cutoff = cutoff_for(grid_pos, src, dst, self.stretch);
        let overlay = GroundOverlay::for_pair(&[src, dst], coverage);
        let (s, d) = (-(src as NodeId), -(dst as NodeId));
        k_shortest_simple_paths(g, &overlay, s, d, cutoff, self.k)
    }
}

/// Repeated Dijkstra, masking the intermediate edges of each already-chosen
/// path to `+inf` so the next search is forced onto a disjoint route.
pub struct KdgRoutStrat {
    pub stretch: f64,
    pub k: usize,
}
impl icarus_core::strategy::Strategy for KdgRoutStrat {
    fn name(&self) -> &'static str {
        "kdg"
    }
    fn param_description(&self) -> String {
        format!("{}k{}", self.stretch, self.k)
    }
}
impl RoutingStrategy for KdgRoutStrat {
    fn route(&self, g: &Network, grid_pos: &GridPos, coverage: &Coverage, src: u32, dst: u32) -> LbSet {
        let cutoff = cutoff_for(grid_pos, src, dst, self.stretch);
        let overlay = GroundOverlay::for_pair(&[src, dst], coverage);
        let (s, d) = (-(src as NodeId), -(dst as NodeId));
        let mut result = LbSet::new();
        let mut excluded: HashSet<(NodeId, NodeId)> = HashSet::new();
        let empty_nodes = HashSet::new();
        for _ in 0..self.k {
            match dijkstra_cutoff(g, &overlay, s, d, cutoff, &excluded, &empty_nodes) {
                Some((path, len)) => {
                    // Mask every intermediate hop (not the ground stubs at
                    // either end, which every path necessarily shares) so
                    // the next search is pushed onto a disjoint route.
                    for w in path.windows(2) {
                        excluded.insert((w[0], w[1]));
                    }
                    result.push((path, len));
                }
                None => break,
            }
        }
        result
    }
}

/// ESX-style k-similarity-bounded routing: repeatedly take the shortest
/// remaining path, accept it only if its Jaccard-length similarity to every
/// already-accepted path is `<= esx_theta`, otherwise mask its edges one at
/// a time (shortest-edge-first) and retry.
pub struct KloRoutStrat {
    pub stretch: f64,
    pub k: usize,
    pub esx_theta: f64,
}
impl icarus_core::strategy::Strategy for KloRoutStrat {
    fn name(&self) -> &'static str {
        "klo"
    }
    fn param_description(&self) -> String {
        format!("{}k{}t{}", self.stretch, self.k, self.esx_theta)
    }
}

fn jaccard_length_similarity(
    g: &Network,
    overlay: &GroundOverlay,
    a: &[NodeId],
    b: &[NodeId],
) -> f64 {
    let edges_a: HashSet<(NodeId, NodeId)> = a.windows(2).map(|w| (w[0], w[1])).collect();
    let edges_b: HashSet<(NodeId, NodeId)> = b.windows(2).map(|w| (w[0], w[1])).collect();
    let weight = |e: &(NodeId, NodeId)| -> f64 {
        if e.0 >= 0 && e.1 >= 0 {
            g.edge_weight(e.0, e.1).copied().unwrap_or(0.0)
        } else {
            overlay_weight(overlay, *e)
        }
    };
    let shared: f64 = edges_a.intersection(&edges_b).map(weight).sum();
    let union: f64 = edges_a.union(&edges_b).map(weight).sum();
    if union <= 0.0 {
        0.0
    } else {
        shared / union
    }
}

fn overlay_weight(overlay: &GroundOverlay, e: (NodeId, NodeId)) -> f64 {
    overlay
        .for_edge_weight(e.0, e.1)
        .unwrap_or(0.0)
}

impl RoutingStrategy for KloRoutStrat {
    fn route(&self, g: &Network, grid_pos: &GridPos, coverage: &Coverage, src: u32, dst: u32) -> LbSet {
        let cutoff = cutoff_for(grid_pos, src, dst, self.stretch);
        let overlay = GroundOverlay::for_pair(&[src, dst], coverage);
        let (s, d) = (-(src as NodeId), -(dst as NodeId));
        let mut accepted: LbSet = LbSet::new();
        let mut excluded: HashSet<(NodeId, NodeId)> = HashSet::new();
        let empty_nodes = HashSet::new();
        let mut guard = 0usize;
        // Bounded retry budget: every rejection masks at least one edge, so
        // this terminates once the graph is exhausted.
        let max_attempts = g.all_edges().count() * 4 + 64;

        while accepted.len() < self.k && guard < max_attempts {
            guard += 1;
            let candidate = match dijkstra_cutoff(g, &overlay, s, d, cutoff, &excluded, &empty_nodes) {
                Some(p) => p,
                None => break,
            };
            let too_similar = accepted
                .iter()
                .any(|(prev, _)| jaccard_length_similarity(g, &overlay, &candidate.0, prev) > self.esx_theta);
            if !too_similar {
                accepted.push(candidate);
                continue;
            }
            // Reject: mask this candidate's shortest edge and retry, rather
            // than discarding the whole path (ESX's "removable edge" step).
            if let Some(shortest_edge) = candidate
                .0
                .windows(2)
                .map(|w| (w[0], w[1]))
                .min_by(|a, b| {
                    let wa = if a.0 >= 0 && a.1 >= 0 {
                        g.edge_weight(a.0, a.1).copied().unwrap_or(f64::INFINITY)
                    } else {
                        overlay_weight(&overlay, *a)
                    };
                    let wb = if b.0 >= 0 && b.1 >= 0 {
                        g.edge_weight(b.0, b.1).copied().unwrap_or(f64::INFINITY)
                    } else {
                        overlay_weight(&overlay, *b)
                    };
                    wa.partial_cmp(&wb).unwrap_or(std::cmp::Ordering::Equal)
                })
            {
                excluded.insert(shortest_edge);
            } else {
                break;
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::{GeoPoint, GridPoint};

    fn fixture() -> (Network, GridPos, Coverage) {
        let mut g = Network::new();
        g.add_edge(0, 1, 1.0);
        g.add_edge(1, 2, 1.0);
        g.add_edge(0, 2, 2.5);

        let mut grid = GridPos::new();
        grid.insert(10, GridPoint { lat: 0.0, lon: 0.0, elev: 0.0, weight: 1.0, surface: 1.0 });
        grid.insert(20, GridPoint { lat: 1.0, lon: 1.0, elev: 0.0, weight: 1.0, surface: 1.0 });

        let mut coverage = Coverage::new();
        coverage.insert(10, [(0u32, 1.0)].into_iter().collect());
        coverage.insert(20, [(2u32, 1.0)].into_iter().collect());
        (g, grid, coverage)
    }

    #[test]
    fn ssp_finds_one_path() {
        let (g, grid, cov) = fixture();
        let strat = SspRoutStrat { stretch: 1000.0 };
        let lb = strat.route(&g, &grid, &cov, 10, 20);
        assert_eq!(lb.len(), 1);
        assert_eq!(lb[0].0.first(), Some(&-10));
        assert_eq!(lb[0].0.last(), Some(&-20));
    }

    #[test]
    fn ksp_returns_up_to_k_paths() {
        let (g, grid, cov) = fixture();
        let strat = KspRoutStrat { stretch: 1000.0, k: 2 };
        let lb = strat.route(&g, &grid, &cov, 10, 20);
        assert!(lb.len() <= 2);
        assert!(!lb.is_empty());
    }

    #[test]
    fn kdg_paths_share_no_intermediate_edge() {
        let (g, grid, cov) = fixture();
        let strat = KdgRoutStrat { stretch: 1000.0, k: 2 };
        let lb = strat.route(&g, &grid, &cov, 10, 20);
        if lb.len() == 2 {
            let e0: HashSet<_> = lb[0].0.windows(2).map(|w| (w[0], w[1])).collect();
            let e1: HashSet<_> = lb[1].0.windows(2).map(|w| (w[0], w[1])).collect();
            assert!(e0.is_disjoint(&e1));
        }
    }

    #[test]
    fn klo_rejects_too_similar_duplicate_path() {
        let (g, grid, cov) = fixture();
        let strat = KloRoutStrat { stretch: 1000.0, k: 5, esx_theta: 0.1 };
        let lb = strat.route(&g, &grid, &cov, 10, 20);
        assert!(lb.len() >= 1);
    }
}
