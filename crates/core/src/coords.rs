//! Planetary constants and coordinate conversions shared by every phase
//! that touches geometry (grid, coverage, routing stretch bounds, zone
//! distance). Grounded on `sat_core/planetary_const.py`, `coordinate_util.py`
//! and `isl_util.py`.

use crate::types::GeoPoint;

/// Average great-circle radius of the Earth, in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;
/// Earth surface area, in km^2.
pub const EARTH_SURFACE: f64 = 510_100_000.0;
pub const SEC_IN_DAY: f64 = 86_400.0;
/// Standard gravitational parameter for Earth (m^3/s^2), `G * EARTH_MASS`.
pub const MU: f64 = 3.986_004_418e14;

pub type Cart = (f64, f64, f64);

/// Convert a geodetic position to Earth-centered cartesian coordinates.
pub fn geo2cart(p: &GeoPoint) -> Cart {
    let theta = p.lon.to_radians();
    let phi = (90.0 - p.lat).to_radians();
    let r = p.elev + EARTH_RADIUS;
    let x = r * phi.sin() * theta.cos();
    let y = r * phi.sin() * theta.sin();
    let z = r * phi.cos();
    (x, y, z)
}

pub fn cart2geo((x, y, z): Cart) -> GeoPoint {
    // Unit-sphere cartesian back to geodetic, matching geodesic_grid_strat's
    // `cart2geo`: assumes the point already lies on a unit sphere.
    let lat = z.clamp(-1.0, 1.0).asin();
    let lon = y.atan2(x);
    GeoPoint {
        lat: lat.to_degrees(),
        lon: lon.to_degrees(),
        elev: 0.0,
    }
}

pub fn euclidean(a: Cart, b: Cart) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    let dz = a.2 - b.2;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Great-circle distance between two geodetic positions, in meters,
/// ignoring elevation. Used for routing stretch bounds and zone distance,
/// mirroring `geopy.distance.great_circle`.
pub fn great_circle_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    use geo::HaversineDistance;
    let pa = geo::Point::new(a.lon, a.lat);
    let pb = geo::Point::new(b.lon, b.lat);
    pa.haversine_distance(&pb)
}

/// Maximum ground-satellite line-of-sight distance for a satellite at
/// elevation `h` and minimum elevation angle `min_angle_deg`, via the law
/// of sines (`isl_util.py::max_ground_sat_dist`).
pub fn max_ground_sat_dist(h: f64, min_angle_deg: f64) -> f64 {
    let alpha = (min_angle_deg + 90.0).to_radians();
    let a = h + EARTH_RADIUS;
    let b = EARTH_RADIUS;
    let sin_beta = alpha.sin() / a * b;
    let beta = sin_beta.clamp(-1.0, 1.0).asin();
    let gamma = std::f64::consts::PI - alpha - beta;
    a * gamma.sin() / alpha.sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo2cart_roundtrip_on_unit_sphere() {
        let p = GeoPoint {
            lat: 12.0,
            lon: -34.0,
            elev: 0.0,
        };
        let cart = geo2cart(&p);
        let r = (cart.0 * cart.0 + cart.1 * cart.1 + cart.2 * cart.2).sqrt();
        assert!((r - EARTH_RADIUS).abs() < 1.0);
    }

    #[test]
    fn great_circle_same_point_is_zero() {
        let p = GeoPoint {
            lat: 47.0,
            lon: 8.0,
            elev: 0.0,
        };
        assert!(great_circle_m(&p, &p) < 1e-6);
    }

    #[test]
    fn max_ground_sat_dist_grows_with_elevation() {
        let d_low = max_ground_sat_dist(500_000.0, 25.0);
        let d_high = max_ground_sat_dist(1_200_000.0, 25.0);
        assert!(d_high > d_low);
    }
}
