//! Population weighting strategies for the ground grid.
//!
//! Grounded on `strategies/grid_weight/{gdp_weight_strat,uniform_weight_strat}.py`.
//! NetCDF raster decoding is out of this crate's scope (no NetCDF crate in
//! the retrieved pack, and SPEC_FULL.md §4.C treats the raster as an input
//! read elsewhere); `GdpWeightStrat` accepts an already-extracted
//! `(lat, lon, value)` slice and preserves the donor's
//! nearest-grid-point/normalize-by-max algorithm exactly.

use icarus_core::coords::geo2cart;
use icarus_core::types::GridPos;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

pub trait WeightStrategy: icarus_core::strategy::Strategy {
    fn compute(&self, grid_pos: &mut GridPos);
}

/// Every grid point receives uniform weight `1.0` (the donor's default when
/// no raster is configured).
pub struct UniformWeightStrat;
impl icarus_core::strategy::Strategy for UniformWeightStrat {
    fn name(&self) -> &'static str {
        "uni"
    }
}
impl WeightStrategy for UniformWeightStrat {
    fn compute(&self, grid_pos: &mut GridPos) {
        for p in grid_pos.values_mut() {
            p.weight = 1.0;
        }
    }
}

struct GridCartPoint {
    cart: [f64; 3],
    idx: usize,
}
impl RTreeObject for GridCartPoint {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.cart)
    }
}
impl PointDistance for GridCartPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.cart[0] - point[0];
        let dy = self.cart[1] - point[1];
        let dz = self.cart[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// A single nonzero GDP raster cell, already extracted from the NetCDF
/// source (`GDP_PPP` variable, year index 25, downsampled to 180x360).
#[derive(Debug, Clone, Copy)]
pub struct GdpCell {
    pub lat: f64,
    pub lon: f64,
    pub value: f64,
}

/// Assigns each nonzero GDP cell to its nearest grid point via R-tree,
/// sums assigned values per grid point, then normalizes by the maximum.
/// Grid points left at zero weight are dropped by the caller (edge/coverage
/// phases tolerate a shrunk `GridPos`, same as the donor).
pub struct GdpWeightStrat {
    pub cells: Vec<GdpCell>,
}
impl icarus_core::strategy::Strategy for GdpWeightStrat {
    fn name(&self) -> &'static str {
        "gdp"
    }
}
impl WeightStrategy for GdpWeightStrat {
    fn compute(&self, grid_pos: &mut GridPos) {
        for p in grid_pos.values_mut() {
            p.weight = 0.0;
        }
        let tree = RTree::bulk_load(
            grid_pos
                .iter()
                .map(|(&idx, p)| {
                    let c = geo2cart(&p.geo());
                    GridCartPoint {
                        cart: [c.0, c.1, c.2],
                        idx: idx as usize,
                    }
                })
                .collect::<Vec<_>>(),
        );
        for cell in &self.cells {
            if cell.value <= 0.0 {
                continue;
            }
            let cart = geo2cart(&icarus_core::types::GeoPoint {
                lat: cell.lat,
                lon: cell.lon,
                elev: 0.0,
            });
            if let Some(nearest) = tree.nearest_neighbor(&[cart.0, cart.1, cart.2]) {
                if let Some(p) = grid_pos.get_mut(&(nearest.idx as u32)) {
                    p.weight += cell.value;
                }
            }
        }
        let max_weight = grid_pos
            .values()
            .map(|p| p.weight)
            .fold(0.0_f64, f64::max);
        if max_weight > 0.0 {
            for p in grid_pos.values_mut() {
                p.weight /= max_weight;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::GridPoint;

    fn sample_grid() -> GridPos {
        let mut grid = GridPos::new();
        for (idx, (lat, lon)) in [(0.0, 0.0), (45.0, 45.0), (-45.0, -45.0)]
            .into_iter()
            .enumerate()
        {
            grid.insert(
                idx as u32,
                GridPoint {
                    lat,
                    lon,
                    elev: 0.0,
                    weight: 0.0,
                    surface: 1.0,
                },
            );
        }
        grid
    }

    #[test]
    fn uniform_weight_sets_all_points_to_one() {
        let mut grid = sample_grid();
        UniformWeightStrat.compute(&mut grid);
        assert!(grid.values().all(|p| p.weight == 1.0));
    }

    #[test]
    fn gdp_weight_normalizes_by_max_and_zeroes_unassigned() {
        let mut grid = sample_grid();
        let strat = GdpWeightStrat {
            cells: vec![
                GdpCell { lat: 0.1, lon: 0.1, value: 10.0 },
                GdpCell { lat: 44.9, lon: 45.1, value: 20.0 },
            ],
        };
        strat.compute(&mut grid);
        assert!((grid[&1].weight - 1.0).abs() < 1e-9);
        assert!(grid[&0].weight > 0.0 && grid[&0].weight < 1.0);
        assert_eq!(grid[&2].weight, 0.0);
    }
}
