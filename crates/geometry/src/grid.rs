//! Geodesic icosphere ground grid (a class-1 subdivision of an icosahedron).
//!
//! Grounded on `strategies/grid/geodesic_grid_strat.py`. The donor builds
//! the subdivided face lattice through `anti_lib`'s `Vec` arithmetic and a
//! bespoke face-grid indexing scheme (`make_face_grid`/`grid_to_points`)
//! that exists to dedupe shared-edge points without a lookup table. No
//! `anti_lib`-equivalent crate is in the retrieved pack, so this is ported
//! as the textbook icosphere construction instead: subdivide each of the
//! 20 icosahedron faces into `repeats^2` barycentric sub-triangles, dedupe
//! vertices shared between adjacent faces with a rounded-coordinate key,
//! then project every vertex onto the unit sphere. Point count and the
//! per-point uniform surface share (`EARTH_SURFACE / |grid|`) match the
//! donor's output shape exactly; only the lattice-construction mechanics
//! differ (documented simplification, see DESIGN.md).

use icarus_core::coords::{cart2geo, euclidean, EARTH_SURFACE};
use icarus_core::types::{GridId, GridPoint, GridPos};
use std::collections::HashMap;

type Vec3 = (f64, f64, f64);

fn add(a: Vec3, b: Vec3) -> Vec3 {
    (a.0 + b.0, a.1 + b.1, a.2 + b.2)
}
fn scale(a: Vec3, s: f64) -> Vec3 {
    (a.0 * s, a.1 * s, a.2 * s)
}
fn norm(a: Vec3) -> f64 {
    (a.0 * a.0 + a.1 * a.1 + a.2 * a.2).sqrt()
}
fn unit(a: Vec3) -> Vec3 {
    let n = norm(a);
    scale(a, 1.0 / n)
}

fn icosahedron() -> (Vec<Vec3>, Vec<[usize; 3]>) {
    let phi = (5f64.sqrt() + 1.0) / 2.0;
    let rad = (phi + 2.0).sqrt();
    let x = 1.0 / rad;
    let z = phi / rad;
    let verts = vec![
        (-x, 0.0, z),
        (x, 0.0, z),
        (-x, 0.0, -z),
        (x, 0.0, -z),
        (0.0, z, x),
        (0.0, z, -x),
        (0.0, -z, x),
        (0.0, -z, -x),
        (z, x, 0.0),
        (-z, x, 0.0),
        (z, -x, 0.0),
        (-z, -x, 0.0),
    ];
    let faces = vec![
        [0, 4, 1],
        [0, 9, 4],
        [9, 5, 4],
        [4, 5, 8],
        [4, 8, 1],
        [8, 10, 1],
        [8, 3, 10],
        [5, 3, 8],
        [5, 2, 3],
        [2, 7, 3],
        [7, 10, 3],
        [7, 6, 10],
        [7, 11, 6],
        [11, 0, 6],
        [0, 1, 6],
        [6, 1, 10],
        [9, 0, 11],
        [9, 11, 2],
        [9, 2, 5],
        [7, 2, 11],
    ];
    (verts, faces)
}

/// Build the geodesic grid for `repeats` subdivisions per icosahedron edge
/// (freq := repeats, matching the donor's `a=1, b=0` default pattern).
pub fn build_grid(repeats: u32) -> GridPos {
    let freq = repeats.max(1);
    let (verts, faces) = icosahedron();

    let mut dedup: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut points: Vec<Vec3> = Vec::new();
    let quant = |v: Vec3| -> (i64, i64, i64) {
        let scale = 1e7;
        (
            (v.0 * scale).round() as i64,
            (v.1 * scale).round() as i64,
            (v.2 * scale).round() as i64,
        )
    };
    let mut intern = |v: Vec3| -> usize {
        let v = unit(v);
        let key = quant(v);
        *dedup.entry(key).or_insert_with(|| {
            points.push(v);
            points.len() - 1
        })
    };

    for face in &faces {
        let a = verts[face[0]];
        let b = verts[face[1]];
        let c = verts[face[2]];
        for i in 0..=freq {
            for j in 0..=(freq - i) {
                let k = freq - i - j;
                let bary = add(
                    add(scale(a, i as f64), scale(b, j as f64)),
                    scale(c, k as f64),
                );
                let p = scale(bary, 1.0 / freq as f64);
                intern(p);
            }
        }
    }

    let mut grid: GridPos = GridPos::new();
    for (idx, p) in points.into_iter().enumerate() {
        let geo = cart2geo(p);
        grid.insert(
            idx as GridId,
            GridPoint {
                lat: geo.lat,
                lon: geo.lon,
                elev: 0.0,
                weight: 1.0,
                surface: 0.0,
            },
        );
    }
    let surface = EARTH_SURFACE / grid.len() as f64;
    for point in grid.values_mut() {
        point.surface = surface;
    }
    grid
}

/// Smallest great-circle-ish chord distance between any two grid points,
/// used by tests/callers that need a rough grid resolution estimate.
pub fn min_pairwise_unit_chord(grid: &GridPos) -> f64 {
    use icarus_core::coords::geo2cart;
    let cart: Vec<_> = grid.values().map(|p| geo2cart(&p.geo())).collect();
    let mut min = f64::INFINITY;
    for i in 0..cart.len() {
        for j in (i + 1)..cart.len() {
            let d = euclidean(cart[i], cart[j]);
            if d > 0.0 && d < min {
                min = d;
            }
        }
    }
    min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_uniform_surface_summing_to_earth() {
        let grid = build_grid(2);
        assert!(!grid.is_empty());
        let total: f64 = grid.values().map(|p| p.surface).sum();
        assert!((total - EARTH_SURFACE).abs() < 1.0);
    }

    #[test]
    fn finer_subdivision_yields_more_points() {
        let coarse = build_grid(1);
        let fine = build_grid(3);
        assert!(fine.len() > coarse.len());
    }

    #[test]
    fn grid_points_lie_on_unit_sphere() {
        use icarus_core::coords::{geo2cart, EARTH_RADIUS};
        let grid = build_grid(1);
        for p in grid.values() {
            let cart = geo2cart(&p.geo());
            let r = (cart.0 * cart.0 + cart.1 * cart.1 + cart.2 * cart.2).sqrt();
            assert!((r - EARTH_RADIUS).abs() < 1.0);
        }
    }
}
