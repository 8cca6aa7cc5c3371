//! Zone building/selection/edge-filtering/bottleneck-enumeration strategies
//! (SPEC_FULL.md §4.H steps 1, 3, 5).
//!
//! Grounded on `strategies/zone_build/k_closest_zone_strat.py`,
//! `strategies/zone_select/rand_zone_strat.py`,
//! `strategies/zone_edges/{isl,dwl}_zone_strat.py`, and
//! `strategies/zone_bneck/detect_bneck_strat.py`.

use std::collections::{HashMap, HashSet};

use icarus_core::coords::geo2cart;
use icarus_core::rng::rng_from_seed_str;
use icarus_core::types::{AttackData, Edge, GridId, GridPos, PathEdgeData, Zone};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

pub trait ZoneSelectStrategy: icarus_core::strategy::Strategy {
    /// Draw `samples` candidate `(center1, center2)` ground-id pairs.
    fn select(&self, grid_pos: &GridPos) -> Vec<(GridId, GridId)>;
}

/// Uniform-random sampling of distinct center pairs.
pub struct RandZoneSelectStrat {
    pub samples: usize,
}
impl icarus_core::strategy::Strategy for RandZoneSelectStrat {
    fn name(&self) -> &'static str {
        "rand"
    }
    fn param_description(&self) -> String {
        format!("{}", self.samples)
    }
}
impl ZoneSelectStrategy for RandZoneSelectStrat {
    fn select(&self, grid_pos: &GridPos) -> Vec<(GridId, GridId)> {
        let mut rng: ChaCha8Rng = rng_from_seed_str("ARN-zone-selection");
        let ids: Vec<GridId> = grid_pos.keys().copied().collect();
        if ids.len() < 2 {
            return Vec::new();
        }
        (0..self.samples)
            .filter_map(|_| {
                let pair: Vec<&GridId> = ids.choose_multiple(&mut rng, 2).collect();
                match (pair.first(), pair.get(1)) {
                    (Some(&&a), Some(&&b)) => Some((a, b)),
                    _ => None,
                }
            })
            .collect()
    }
}

pub trait ZoneBuildStrategy: icarus_core::strategy::Strategy {
    /// Build the zone of `size` nearest grid points around `center`.
    fn build(&self, grid_pos: &GridPos, center: GridId) -> Zone;
}

struct CartPoint {
    cart: [f64; 3],
    grid_id: GridId,
}
impl RTreeObject for CartPoint {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.cart)
    }
}
impl PointDistance for CartPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.cart[0] - point[0];
        let dy = self.cart[1] - point[1];
        let dz = self.cart[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// The `size` nearest grid points to `center` by Euclidean distance on
/// `geo2cart`.
pub struct KClosestZoneStrat {
    pub size: usize,
}
impl icarus_core::strategy::Strategy for KClosestZoneStrat {
    fn name(&self) -> &'static str {
        "kclosest"
    }
    fn param_description(&self) -> String {
        format!("{}", self.size)
    }
}
impl ZoneBuildStrategy for KClosestZoneStrat {
    fn build(&self, grid_pos: &GridPos, center: GridId) -> Zone {
        let Some(center_point) = grid_pos.get(&center) else {
            return Vec::new();
        };
        let center_cart = geo2cart(&center_point.geo());
        let tree: RTree<CartPoint> = RTree::bulk_load(
            grid_pos
                .iter()
                .map(|(&id, p)| {
                    let c = geo2cart(&p.geo());
                    CartPoint { cart: [c.0, c.1, c.2], grid_id: id }
                })
                .collect(),
        );
        tree.nearest_neighbor_iter(&[center_cart.0, center_cart.1, center_cart.2])
            .take(self.size)
            .map(|p| p.grid_id)
            .collect()
    }
}

/// `true` if two zones share any grid point (SPEC_FULL.md §4.H step 1).
pub fn zones_intersect(a: &Zone, b: &Zone) -> bool {
    let set: HashSet<GridId> = a.iter().copied().collect();
    b.iter().any(|g| set.contains(g))
}

pub trait ZoneEdgeStrategy: icarus_core::strategy::Strategy {
    /// Keep only the edges of `candidates` eligible to be part of a cut
    /// (e.g. ISL-only, or ISL+downlink).
    fn filter(&self, candidates: &[Edge]) -> Vec<Edge>;
}

/// ISL-only cut edges: both endpoints are satellites (non-negative ids).
pub struct IslZoneStrat;
impl icarus_core::strategy::Strategy for IslZoneStrat {
    fn name(&self) -> &'static str {
        "isl"
    }
}
impl ZoneEdgeStrategy for IslZoneStrat {
    fn filter(&self, candidates: &[Edge]) -> Vec<Edge> {
        candidates.iter().copied().filter(|&(u, v)| u >= 0 && v >= 0).collect()
    }
}

/// ISL and downlink (`sat -> -1`) cut edges.
pub struct DwlZoneStrat;
impl icarus_core::strategy::Strategy for DwlZoneStrat {
    fn name(&self) -> &'static str {
        "dwl"
    }
}
impl ZoneEdgeStrategy for DwlZoneStrat {
    fn filter(&self, candidates: &[Edge]) -> Vec<Edge> {
        candidates
            .iter()
            .copied()
            .filter(|&(u, v)| (u >= 0 && v >= 0) || (u >= 0 && v == -1))
            .collect()
    }
}

/// Candidate cut edges individually attackable, restricted by the
/// zone-edge strategy, paired with the set of cross-zone path indices each
/// one covers.
pub fn candidate_cut_edges(
    cross_zone_paths: &[icarus_core::types::Path],
    edge_strategy: &dyn ZoneEdgeStrategy,
    attack_data: &AttackData,
) -> PathEdgeData {
    let mut raw: HashSet<Edge> = HashSet::new();
    for path in cross_zone_paths {
        raw.extend(icarus_core::types::path_edges(path, 0, 0));
    }
    let filtered: Vec<Edge> = edge_strategy
        .filter(&raw.into_iter().collect::<Vec<_>>())
        .into_iter()
        .filter(|e| matches!(attack_data.get(e), Some(Some(_))))
        .collect();

    let mut path_edge_data: PathEdgeData = PathEdgeData::new();
    for &edge in &filtered {
        let covered: HashSet<usize> = cross_zone_paths
            .iter()
            .enumerate()
            .filter(|(_, path)| icarus_core::types::path_edges(path, 0, 0).contains(&edge))
            .map(|(i, _)| i)
            .collect();
        path_edge_data.insert(edge, covered);
    }
    path_edge_data
}

pub trait BottleneckStrategy: icarus_core::strategy::Strategy {
    /// Enumerate up to three candidate minimal cut sets, each covering
    /// every cross-zone path index in `0..num_paths`.
    fn enumerate(
        &self,
        path_edge_data: &PathEdgeData,
        attack_data: &AttackData,
        num_paths: usize,
    ) -> Vec<Vec<Edge>>;
}

fn detectability_of(attack_data: &AttackData, e: &Edge) -> f64 {
    attack_data
        .get(e)
        .and_then(|o| o.as_ref())
        .map(|info| info.detectability as f64)
        .unwrap_or(f64::INFINITY)
}

/// Greedy weighted set-cover (ratio `detectability / new_paths_covered`)
/// run three times with a different forced first pick, then redundancy-pruned.
pub struct GreedySetCoverBneckStrat;
impl icarus_core::strategy::Strategy for GreedySetCoverBneckStrat {
    fn name(&self) -> &'static str {
        "greedy"
    }
}

impl GreedySetCoverBneckStrat {
    fn greedy_cover(
        &self,
        path_edge_data: &PathEdgeData,
        attack_data: &AttackData,
        num_paths: usize,
        forced_first: Option<Edge>,
    ) -> Vec<Edge> {
        let mut covered: HashSet<usize> = HashSet::new();
        let mut chosen: Vec<Edge> = Vec::new();
        let mut remaining_edges: HashMap<Edge, HashSet<usize>> = path_edge_data.clone();

        if let Some(first) = forced_first {
            if let Some(paths) = remaining_edges.remove(&first) {
                covered.extend(paths);
                chosen.push(first);
            }
        }

        while covered.len() < num_paths {
            let best = remaining_edges
                .iter()
                .filter(|(_, paths)| !paths.is_empty())
                .map(|(&edge, paths)| {
                    let new_paths = paths.difference(&covered).count();
                    let ratio = if new_paths == 0 {
                        f64::INFINITY
                    } else {
                        detectability_of(attack_data, &edge) / new_paths as f64
                    };
                    (edge, ratio)
                })
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            let Some((edge, ratio)) = best else { break };
            if !ratio.is_finite() {
                break;
            }
            let paths = remaining_edges.remove(&edge).unwrap_or_default();
            covered.extend(paths);
            chosen.push(edge);
        }
        chosen
    }

    /// Remove edges whose removal keeps every path still covered, breaking
    /// ties by minimum cross-path redundancy then max remaining bandwidth
    /// (SPEC_FULL.md §4.H step 5).
    fn prune(
        &self,
        chosen: Vec<Edge>,
        path_edge_data: &PathEdgeData,
        attack_data: &AttackData,
        num_paths: usize,
    ) -> Vec<Edge> {
        let mut set = chosen;
        loop {
            let full_cover = |edges: &[Edge]| -> HashSet<usize> {
                edges
                    .iter()
                    .filter_map(|e| path_edge_data.get(e))
                    .flatten()
                    .copied()
                    .collect()
            };
            if full_cover(&set).len() < num_paths {
                break;
            }
            let mut removable: Vec<(usize, usize, i64)> = Vec::new(); // (index, redundancy, remaining_bw)
            for (i, &edge) in set.iter().enumerate() {
                let mut without = set.clone();
                without.remove(i);
                if full_cover(&without).len() == num_paths {
                    let redundancy = path_edge_data.get(&edge).map(|p| p.len()).unwrap_or(0);
                    let remaining = attack_data
                        .get(&edge)
                        .and_then(|o| o.as_ref())
                        .map(|info| -info.detectability)
                        .unwrap_or(0);
                    removable.push((i, redundancy, remaining));
                }
            }
            let Some(&(idx, ..)) = removable
                .iter()
                .min_by_key(|(_, redundancy, remaining)| (*redundancy, std::cmp::Reverse(*remaining)))
            else {
                break;
            };
            set.remove(idx);
        }
        set
    }
}

impl BottleneckStrategy for GreedySetCoverBneckStrat {
    fn enumerate(
        &self,
        path_edge_data: &PathEdgeData,
        attack_data: &AttackData,
        num_paths: usize,
    ) -> Vec<Vec<Edge>> {
        if num_paths == 0 || path_edge_data.is_empty() {
            return Vec::new();
        }
        let all_covered: HashSet<usize> = path_edge_data.values().flatten().copied().collect();
        if all_covered.len() < num_paths {
            return Vec::new();
        }

        let mut ranked: Vec<(Edge, f64)> = path_edge_data
            .keys()
            .map(|&e| (e, detectability_of(attack_data, &e) / path_edge_data[&e].len().max(1) as f64))
            .collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let seeds: Vec<Option<Edge>> = ranked.iter().take(3).map(|(e, _)| Some(*e)).collect();
        let mut results = Vec::new();
        for seed in seeds {
            let cover = self.greedy_cover(path_edge_data, attack_data, num_paths, seed);
            if cover.is_empty() {
                continue;
            }
            let pruned = self.prune(cover, path_edge_data, attack_data, num_paths);
            results.push(pruned);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::GridPoint;

    #[test]
    fn zone_intersect_detects_shared_point() {
        assert!(zones_intersect(&vec![1, 2, 3], &vec![3, 4]));
        assert!(!zones_intersect(&vec![1, 2], &vec![3, 4]));
    }

    #[test]
    fn k_closest_includes_the_center_itself() {
        let mut grid = GridPos::new();
        for (i, (lat, lon)) in [(0.0, 0.0), (1.0, 1.0), (80.0, 80.0)].into_iter().enumerate() {
            grid.insert(i as GridId, GridPoint { lat, lon, elev: 0.0, weight: 1.0, surface: 1.0 });
        }
        let strat = KClosestZoneStrat { size: 2 };
        let zone = strat.build(&grid, 0);
        assert_eq!(zone.len(), 2);
        assert!(zone.contains(&0));
        assert!(zone.contains(&1));
    }

    #[test]
    fn isl_zone_strat_drops_ground_stubs() {
        let strat = IslZoneStrat;
        let filtered = strat.filter(&[(0, 1), (-1, 2), (3, -1)]);
        assert_eq!(filtered, vec![(0, 1)]);
    }

    #[test]
    fn greedy_cover_reaches_full_coverage() {
        let mut attack_data = AttackData::new();
        for e in [(0, 1), (1, 2)] {
            attack_data.insert(
                e,
                Some(icarus_core::types::AttackInfo {
                    cost: 10,
                    detectability: 5,
                    flows_on_trg: 5,
                    atkflowset: Default::default(),
                }),
            );
        }
        let mut path_edge_data = PathEdgeData::new();
        path_edge_data.insert((0, 1), [0usize].into_iter().collect());
        path_edge_data.insert((1, 2), [1usize].into_iter().collect());
        let strat = GreedySetCoverBneckStrat;
        let cuts = strat.enumerate(&path_edge_data, &attack_data, 2);
        assert!(!cuts.is_empty());
        for cut in &cuts {
            let covered: HashSet<usize> = cut
                .iter()
                .filter_map(|e| path_edge_data.get(e))
                .flatten()
                .copied()
                .collect();
            assert_eq!(covered.len(), 2);
        }
    }
}
