//! Geographic source constraint strategies (`atk_constr`, SPEC_FULL.md §6).
//!
//! Grounded on `strategies/atk_geo_constraint/{geo_constr,grid_constr,no_constr}_strat.py`.
//! `geo`'s polygon containment replaces `shapely`; country boundaries are
//! accepted as already-parsed GeoJSON `serde_json::Value` rather than
//! binding to a dedicated GeoJSON crate absent from the retrieved pack.

use std::collections::HashSet;

use geo::{Contains, Point, Polygon};
use icarus_core::types::{GridId, GridPos};

pub trait GeoConstraintStrategy: icarus_core::strategy::Strategy {
    fn allowed_sources(&self, grid_pos: &GridPos) -> HashSet<GridId>;
}

/// No constraint: every ground grid point is an eligible botnet source.
pub struct NoConstrStrat;
impl icarus_core::strategy::Strategy for NoConstrStrat {
    fn name(&self) -> &'static str {
        "none"
    }
}
impl GeoConstraintStrategy for NoConstrStrat {
    fn allowed_sources(&self, grid_pos: &GridPos) -> HashSet<GridId> {
        grid_pos.keys().copied().collect()
    }
}

/// Explicit allowlist of grid ids, configured directly rather than derived
/// from a geographic shape.
pub struct GridConstrStrat {
    pub grid_points: HashSet<GridId>,
}
impl icarus_core::strategy::Strategy for GridConstrStrat {
    fn name(&self) -> &'static str {
        "grid"
    }
    fn param_description(&self) -> String {
        format!("{}", self.grid_points.len())
    }
}
impl GeoConstraintStrategy for GridConstrStrat {
    fn allowed_sources(&self, _grid_pos: &GridPos) -> HashSet<GridId> {
        self.grid_points.clone()
    }
}

/// Restricts sources to grid points falling inside one of a set of named
/// country polygons, parsed from a Natural Earth GeoJSON `FeatureCollection`.
pub struct GeoConstrStrat {
    pub polygons: Vec<Polygon<f64>>,
}

impl GeoConstrStrat {
    /// Extract the polygons for `names` (matched against a `"name"` or
    /// `"ADMIN"` GeoJSON property) out of a Natural Earth-style
    /// `FeatureCollection`.
    pub fn from_geojson(geojson: &serde_json::Value, names: &HashSet<String>) -> Self {
        let mut polygons = Vec::new();
        if let Some(features) = geojson.get("features").and_then(|f| f.as_array()) {
            for feature in features {
                let props = feature.get("properties");
                let matches = props
                    .and_then(|p| p.get("name").or_else(|| p.get("ADMIN")))
                    .and_then(|n| n.as_str())
                    .map(|n| names.contains(n))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
                if let Some(polys) = extract_polygons(feature.get("geometry")) {
                    polygons.extend(polys);
                }
            }
        }
        Self { polygons }
    }
}

fn ring_to_coords(ring: &serde_json::Value) -> Vec<(f64, f64)> {
    ring.as_array()
        .map(|points| {
            points
                .iter()
                .filter_map(|p| {
                    let arr = p.as_array()?;
                    Some((arr.first()?.as_f64()?, arr.get(1)?.as_f64()?))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn extract_polygons(geometry: Option<&serde_json::Value>) -> Option<Vec<Polygon<f64>>> {
    let geometry = geometry?;
    let gtype = geometry.get("type")?.as_str()?;
    let coords = geometry.get("coordinates")?;
    match gtype {
        "Polygon" => {
            let rings = coords.as_array()?;
            let exterior = ring_to_coords(rings.first()?);
            Some(vec![Polygon::new(exterior.into(), vec![])])
        }
        "MultiPolygon" => {
            let polys = coords.as_array()?;
            Some(
                polys
                    .iter()
                    .filter_map(|poly| {
                        let rings = poly.as_array()?;
                        let exterior = ring_to_coords(rings.first()?);
                        Some(Polygon::new(exterior.into(), vec![]))
                    })
                    .collect(),
            )
        }
        _ => None,
    }
}

impl icarus_core::strategy::Strategy for GeoConstrStrat {
    fn name(&self) -> &'static str {
        "geo"
    }
    fn param_description(&self) -> String {
        format!("{}polys", self.polygons.len())
    }
}
impl GeoConstraintStrategy for GeoConstrStrat {
    fn allowed_sources(&self, grid_pos: &GridPos) -> HashSet<GridId> {
        grid_pos
            .iter()
            .filter(|(_, p)| {
                let pt = Point::new(p.lon, p.lat);
                self.polygons.iter().any(|poly| poly.contains(&pt))
            })
            .map(|(&id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icarus_core::types::GridPoint;

    fn grid() -> GridPos {
        let mut g = GridPos::new();
        g.insert(1, GridPoint { lat: 1.0, lon: 1.0, elev: 0.0, weight: 1.0, surface: 1.0 });
        g.insert(2, GridPoint { lat: 50.0, lon: 50.0, elev: 0.0, weight: 1.0, surface: 1.0 });
        g
    }

    #[test]
    fn no_constraint_allows_every_point() {
        let strat = NoConstrStrat;
        assert_eq!(strat.allowed_sources(&grid()).len(), 2);
    }

    #[test]
    fn grid_constraint_uses_the_configured_allowlist() {
        let strat = GridConstrStrat { grid_points: [1].into_iter().collect() };
        assert_eq!(strat.allowed_sources(&grid()), [1].into_iter().collect());
    }

    #[test]
    fn geo_constraint_keeps_only_points_inside_the_polygon() {
        let square = Polygon::new(
            vec![(0.0, 0.0), (0.0, 5.0), (5.0, 5.0), (5.0, 0.0), (0.0, 0.0)].into(),
            vec![],
        );
        let strat = GeoConstrStrat { polygons: vec![square] };
        let allowed = strat.allowed_sources(&grid());
        assert!(allowed.contains(&1));
        assert!(!allowed.contains(&2));
    }
}
