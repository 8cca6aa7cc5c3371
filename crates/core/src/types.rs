//! Shared data model.
//!
//! Mirrors `structure_definitions.py` in the reference implementation:
//! every entity here is produced exactly once by its owning phase, then
//! frozen and consumed read-only by downstream phases.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub type Length = f64;

/// Ground point or satellite geodetic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    /// Elevation above the Earth surface, in meters. Never Earth-center-relative.
    pub elev: f64,
}

/// A ground grid point: a `GeoPoint` plus population weight and coverage area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lon: f64,
    pub elev: f64,
    /// Normalized population weight in `[0, 1]`.
    pub weight: f64,
    /// Surface area this grid point represents, in km^2.
    pub surface: f64,
}

impl GridPoint {
    pub fn geo(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
            elev: self.elev,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IslInfo {
    pub sat1: u32,
    pub sat2: u32,
    pub length: Length,
}

pub type SatId = u32;
pub type GridId = u32;

pub type SatPos = HashMap<SatId, GeoPoint>;
pub type GridPos = HashMap<GridId, GridPoint>;

/// `grid_id -> sat_id -> distance(m)`
pub type Coverage = HashMap<GridId, HashMap<SatId, Length>>;

/// A routed node id: non-negative is a satellite, negative is a (negated)
/// ground point sentinel (`-1` alone marks "any ground endpoint" in an edge).
pub type NodeId = i64;

pub type Path = Vec<NodeId>;
pub type PathInfo = (Path, Length);
pub type LbSet = Vec<PathInfo>;

/// Ordered ground pair, `src < dst`.
pub type SdPair = (GridId, GridId);

/// `PathData` keys are strictly ordered (`src < dst`); the reverse direction
/// is obtained by reversing the stored path, never stored separately.
pub type PathData = BTreeMap<SdPair, LbSet>;

/// `(src, dst, index-in-LbSet)`.
pub type PathId = (GridId, GridId, usize);

/// An edge is an ordered pair of node ids: `(-1, sat)` is an uplink stub,
/// `(sat, -1)` a downlink stub, `(sat, sat)` an ISL.
pub type Edge = (NodeId, NodeId);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub paths_through: Vec<PathId>,
    pub centrality: f64,
    pub cov_centr: f64,
}

/// Contains both directions of every ISL and both `(-1,sat)`/`(sat,-1)`
/// stubs for every satellite, per invariant I1.
pub type EdgeData = HashMap<Edge, EdgeInfo>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BwInfo {
    pub idle_bw: i64,
    pub capacity: i64,
}

impl BwInfo {
    pub fn remaining_bw(&self) -> i64 {
        self.capacity - self.idle_bw
    }
}

pub type BwData = HashMap<Edge, BwInfo>;

pub type AtkFlowSet = HashSet<(SdPair, i64)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackInfo {
    pub cost: i64,
    pub detectability: i64,
    pub flows_on_trg: i64,
    pub atkflowset: AtkFlowSet,
}

/// `None` means the edge cannot be flooded (infeasible); this is expected,
/// not an error.
pub type AttackData = HashMap<Edge, Option<AttackInfo>>;

pub type Zone = Vec<GridId>;
/// Sorted, hashable form of a `Zone` used as a map key.
pub type ZoneKey = Vec<GridId>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneAttackInfo {
    pub base: AttackInfo,
    pub cross_zone_paths: Vec<Path>,
    pub bottlenecks: Vec<Edge>,
    pub distance: Length,
}

pub type ZoneAttackData = HashMap<(ZoneKey, ZoneKey), Option<ZoneAttackInfo>>;

/// `edge -> set of covered cross-zone-path indices`, used by the bottleneck
/// enumeration strategies.
pub type PathEdgeData = HashMap<Edge, HashSet<usize>>;

/// Numerically order an unordered id pair; returns `(ordered_pair, was_already_ordered)`.
pub fn ordered_idx(a: GridId, b: GridId) -> ((GridId, GridId), bool) {
    if a > b {
        ((b, a), false)
    } else {
        ((a, b), true)
    }
}

/// Yield the consecutive `(u, v)` hops of `path`, optionally excluding a
/// prefix/suffix of hops (mirrors `utils.py::get_edges`).
pub fn path_edges(path: &[NodeId], excl_start: usize, excl_end: usize) -> Vec<Edge> {
    let minus = 1 + excl_end;
    if path.len() < minus + excl_start {
        return Vec::new();
    }
    let end = path.len() - minus;
    (excl_start..end)
        .filter(|&i| i + 1 < path.len())
        .map(|i| (path[i], path[i + 1]))
        .collect()
}
