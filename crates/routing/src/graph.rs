//! Routing graph: an undirected weighted `petgraph` graph over satellites,
//! plus a from-scratch Dijkstra with cutoff and Yen's k-shortest-simple-paths.
//!
//! Grounded on the donor's use of `networkx.Graph` + `single_source_dijkstra`
//! / `shortest_simple_paths`. `petgraph::graphmap::UnGraphMap` plays the
//! role of `nx.Graph`; cutoff-aware Dijkstra and Yen's algorithm are
//! hand-rolled since `petgraph` does not ship either.
//!
//! The donor injects each pair's two ground nodes into the (single,
//! process-local) network, routes, then removes them. The Batched Worker
//! Pool here shares one immutable base network across rayon workers
//! (SPEC_FULL.md §5, "no shared mutable state"), so ground-node injection
//! is instead a per-call read-only [`GroundOverlay`] consulted alongside
//! the base graph — the same "overlay over mutation" preference SPEC_FULL.md
//! §9 states for edge masking, generalized here to node injection so no
//! worker ever mutates the shared graph. `kdg`/`klo`'s edge-weight masking
//! still mutates-then-restores a local `HashMap` of excluded edges exactly
//! as the donor does, since that state is already per-call and private.

use icarus_core::types::{Coverage, IslInfo, SatId, SatPos};
use petgraph::graphmap::UnGraphMap;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

pub type NodeId = i64;
pub type Network = UnGraphMap<NodeId, f64>;

/// Build the base ISL network (satellite nodes and ISL edges only; ground
/// nodes are injected per-pair via [`GroundOverlay`]).
pub fn build_isl_network(sat_pos: &SatPos, isls: &[IslInfo]) -> Network {
    let mut g = Network::new();
    for &sat in sat_pos.keys() {
        g.add_node(sat as NodeId);
    }
    for isl in isls {
        g.add_edge(isl.sat1 as NodeId, isl.sat2 as NodeId, isl.length);
    }
    g
}

/// Read-only overlay of ground-stub edges (`-gnd <-> sat`) for the one or
/// two ground ids involved in a single routing query.
#[derive(Default, Clone)]
pub struct GroundOverlay {
    adjacency: HashMap<NodeId, Vec<(NodeId, f64)>>,
}

impl GroundOverlay {
    pub fn for_pair(gnds: &[SatId], coverage: &Coverage) -> Self {
        let mut adjacency: HashMap<NodeId, Vec<(NodeId, f64)>> = HashMap::new();
        for &gnd in gnds {
            let node = -(gnd as NodeId);
            let mut edges = Vec::new();
            if let Some(sats) = coverage.get(&gnd) {
                for (&sat, &dist) in sats {
                    edges.push((sat as NodeId, dist));
                    adjacency.entry(sat as NodeId).or_default().push((node, dist));
                }
            }
            adjacency.entry(node).or_default().extend(edges);
        }
        Self { adjacency }
    }

    fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.adjacency.get(&node).into_iter().flatten().copied()
    }

    /// Weight of an overlay edge (either endpoint a ground stub), if present.
    pub fn for_edge_weight(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.neighbors(a).find(|(n, _)| *n == b).map(|(_, w)| w)
    }
}

#[derive(PartialEq)]
struct HeapEntry {
    cost: f64,
    node: NodeId,
}
impl Eq for HeapEntry {}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn neighbors_of(
    g: &Network,
    overlay: &GroundOverlay,
    node: NodeId,
) -> Vec<(NodeId, f64)> {
    let mut out: Vec<(NodeId, f64)> = if node >= 0 {
        g.neighbors(node)
            .map(|n| (n, *g.edge_weight(node, n).unwrap()))
            .collect()
    } else {
        Vec::new()
    };
    out.extend(overlay.neighbors(node));
    out
}

/// Single-source-single-target Dijkstra under a total-length `cutoff`,
/// honoring a set of excluded edges (masked rather than removed) and a set
/// of excluded nodes. Mirrors `nx.single_source_dijkstra(..., cutoff=...)`.
pub fn dijkstra_cutoff(
    g: &Network,
    overlay: &GroundOverlay,
    start: NodeId,
    goal: NodeId,
    cutoff: f64,
    excluded_edges: &HashSet<(NodeId, NodeId)>,
    excluded_nodes: &HashSet<NodeId>,
) -> Option<(Vec<NodeId>, f64)> {
    if excluded_nodes.contains(&start) || excluded_nodes.contains(&goal) {
        return None;
    }
    let mut dist: HashMap<NodeId, f64> = HashMap::new();
    let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(start, 0.0);
    heap.push(HeapEntry { cost: 0.0, node: start });

    while let Some(HeapEntry { cost, node }) = heap.pop() {
        if node == goal {
            break;
        }
        if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }
        for (neigh, weight) in neighbors_of(g, overlay, node) {
            if excluded_nodes.contains(&neigh) {
                continue;
            }
            let masked = excluded_edges.contains(&(node, neigh)) || excluded_edges.contains(&(neigh, node));
            if masked {
                continue;
            }
            let next_cost = cost + weight;
            if next_cost > cutoff {
                continue;
            }
            if next_cost < *dist.get(&neigh).unwrap_or(&f64::INFINITY) {
                dist.insert(neigh, next_cost);
                prev.insert(neigh, node);
                heap.push(HeapEntry { cost: next_cost, node: neigh });
            }
        }
    }

    let goal_dist = *dist.get(&goal)?;
    let mut path = vec![goal];
    let mut cur = goal;
    while cur != start {
        cur = *prev.get(&cur)?;
        path.push(cur);
    }
    path.reverse();
    Some((path, goal_dist))
}

fn path_length(g: &Network, overlay: &GroundOverlay, path: &[NodeId]) -> f64 {
    path.windows(2)
        .map(|w| {
            neighbors_of(g, overlay, w[0])
                .into_iter()
                .find(|(n, _)| *n == w[1])
                .map(|(_, weight)| weight)
                .unwrap_or(f64::INFINITY)
        })
        .sum()
}

/// Yen's k-shortest loopless paths, each under `cutoff` total length.
/// Mirrors `nx.shortest_simple_paths` truncated by the donor's own cutoff
/// check on each yielded path (the donor breaks as soon as one path
/// exceeds `fiber_len`, since `shortest_simple_paths` yields in
/// nondecreasing length order).
pub fn k_shortest_simple_paths(
    g: &Network,
    overlay: &GroundOverlay,
    start: NodeId,
    goal: NodeId,
    cutoff: f64,
    k: usize,
) -> Vec<(Vec<NodeId>, f64)> {
    let mut result: Vec<(Vec<NodeId>, f64)> = Vec::new();
    let empty_edges = HashSet::new();
    let empty_nodes = HashSet::new();
    let first = match dijkstra_cutoff(g, overlay, start, goal, f64::INFINITY, &empty_edges, &empty_nodes) {
        Some(p) => p,
        None => return result,
    };
    let mut candidates: Vec<(Vec<NodeId>, f64)> = vec![first];
    let mut seen: HashSet<Vec<NodeId>> = HashSet::new();

    while !candidates.is_empty() && result.len() < k {
        candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        let (path, length) = candidates.remove(0);
        if seen.contains(&path) {
            continue;
        }
        seen.insert(path.clone());
        if length > cutoff {
            break;
        }
        result.push((path.clone(), length));

        for i in 0..path.len() - 1 {
            let spur_node = path[i];
            let root_path = &path[..=i];

            let mut excluded_edges = HashSet::new();
            for (prev_path, _) in result.iter().chain(candidates.iter()) {
                if prev_path.len() > i && prev_path[..=i] == *root_path {
                    excluded_edges.insert((prev_path[i], prev_path[i + 1]));
                }
            }
            let excluded_nodes: HashSet<NodeId> = root_path[..i].iter().copied().collect();

            if let Some((spur_path, _)) =
                dijkstra_cutoff(g, overlay, spur_node, goal, f64::INFINITY, &excluded_edges, &excluded_nodes)
            {
                let mut total_path = root_path[..i].to_vec();
                total_path.extend(spur_path);
                if !seen.contains(&total_path) && !candidates.iter().any(|(p, _)| *p == total_path) {
                    let len = path_length(g, overlay, &total_path);
                    candidates.push((total_path, len));
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph() -> Network {
        let mut g = Network::new();
        g.add_edge(0, 1, 1.0);
        g.add_edge(1, 2, 1.0);
        g.add_edge(0, 2, 5.0);
        g
    }

    #[test]
    fn dijkstra_finds_shortest_path() {
        let g = line_graph();
        let overlay = GroundOverlay::default();
        let (path, len) =
            dijkstra_cutoff(&g, &overlay, 0, 2, 100.0, &HashSet::new(), &HashSet::new()).unwrap();
        assert_eq!(path, vec![0, 1, 2]);
        assert_eq!(len, 2.0);
    }

    #[test]
    fn dijkstra_respects_cutoff() {
        let g = line_graph();
        let overlay = GroundOverlay::default();
        assert!(dijkstra_cutoff(&g, &overlay, 0, 2, 1.5, &HashSet::new(), &HashSet::new()).is_none());
    }

    #[test]
    fn yen_returns_paths_in_nondecreasing_length_order() {
        let g = line_graph();
        let overlay = GroundOverlay::default();
        let paths = k_shortest_simple_paths(&g, &overlay, 0, 2, 100.0, 2);
        assert_eq!(paths.len(), 2);
        assert!(paths[0].1 <= paths[1].1);
        assert_eq!(paths[0].0, vec![0, 1, 2]);
    }

    #[test]
    fn ground_overlay_bridges_two_ground_nodes_via_satellite() {
        let g = line_graph();
        let mut coverage: Coverage = Coverage::new();
        coverage.insert(10, [(0u32, 2.0)].into_iter().collect());
        coverage.insert(20, [(2u32, 2.0)].into_iter().collect());
        let overlay = GroundOverlay::for_pair(&[10, 20], &coverage);
        let (path, len) = dijkstra_cutoff(&g, &overlay, -10, -20, 100.0, &HashSet::new(), &HashSet::new()).unwrap();
        assert_eq!(path.first(), Some(&-10));
        assert_eq!(path.last(), Some(&-20));
        assert!(len > 0.0);
    }
}
