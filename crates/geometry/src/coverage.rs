//! Ground-satellite coverage (angle-based strategy).
//!
//! Grounded on `sat_core/coverage.py::positions_satellite_coverage` and
//! `strategies/coverage/angle_cov_strat.py`. `rstar` replaces `scipy`'s
//! `KDTree`.

use icarus_core::coords::{geo2cart, max_ground_sat_dist};
use icarus_core::types::{Coverage, GridPos, SatPos};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

pub trait CoverageStrategy: icarus_core::strategy::Strategy {
    fn compute(&self, grid_pos: &GridPos, sat_pos: &SatPos) -> Coverage;
}

struct CartPoint {
    cart: [f64; 3],
    grid_id: u32,
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

/// Minimum-elevation-angle coverage: a satellite sees every grid point
/// within its horizon radius `c` (SPEC_FULL.md §4.C law-of-sines formula).
pub struct AngleCovStrat {
    pub min_elev_angle_deg: f64,
}
impl icarus_core::strategy::Strategy for AngleCovStrat {
    fn name(&self) -> &'static str {
        "ang"
    }
    fn param_description(&self) -> String {
        format!("{}°", self.min_elev_angle_deg)
    }
}
impl CoverageStrategy for AngleCovStrat {
    fn compute(&self, grid_pos: &GridPos, sat_pos: &SatPos) -> Coverage {
        let points: Vec<CartPoint> = grid_pos
            .iter()
            .map(|(&grid_id, p)| {
                let c = geo2cart(&p.geo());
                CartPoint {
                    cart: [c.0, c.1, c.2],
                    grid_id,
                }
            })
            .collect();
        let tree = RTree::bulk_load(points);

        let mut coverage: Coverage = grid_pos.keys().map(|&id| (id, Default::default())).collect();
        for (&sat_id, sat) in sat_pos {
            let max_dist = max_ground_sat_dist(sat.elev, self.min_elev_angle_deg);
            let sat_cart = geo2cart(sat);
            let query = [sat_cart.0, sat_cart.1, sat_cart.2];
            let max_dist_sq = max_dist * max_dist;
            for point in tree.locate_within_distance(query, max_dist_sq) {
                let dist = point.distance_2(&query).sqrt();
                coverage.entry(point.grid_id).or_default().insert(sat_id, dist);
            }
        }
        coverage.retain(|_, sats| !sats.is_empty());
        coverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::{GeoPoint, GridPoint};

    #[test]
    fn satellite_directly_overhead_covers_its_ground_point() {
        let mut grid = GridPos::new();
        grid.insert(
            0,
            GridPoint {
                lat: 0.0,
                lon: 0.0,
                elev: 0.0,
                weight: 1.0,
                surface: 1.0,
            },
        );
        let mut sats = SatPos::new();
        sats.insert(
            0,
            GeoPoint {
                lat: 0.0,
                lon: 0.0,
                elev: 550_000.0,
            },
        );
        let strat = AngleCovStrat { min_elev_angle_deg: 25.0 };
        let cov = strat.compute(&grid, &sats);
        assert!(cov.contains_key(&0));
        assert!(cov[&0].contains_key(&0));
    }

    #[test]
    fn empty_coverage_grid_points_are_dropped() {
        let mut grid = GridPos::new();
        grid.insert(
            0,
            GridPoint {
                lat: 0.0,
                lon: 0.0,
                elev: 0.0,
                weight: 1.0,
                surface: 1.0,
            },
        );
        grid.insert(
            1,
            GridPoint {
                lat: 89.9,
                lon: 0.0,
                elev: 0.0,
                weight: 1.0,
                surface: 1.0,
            },
        );
        let mut sats = SatPos::new();
        sats.insert(
            0,
            GeoPoint {
                lat: 0.0,
                lon: 0.0,
                elev: 550_000.0,
            },
        );
        let strat = AngleCovStrat { min_elev_angle_deg: 25.0 };
        let cov = strat.compute(&grid, &sats);
        assert!(!cov.contains_key(&1));
    }
}
