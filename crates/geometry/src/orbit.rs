//! Walker constellation geometry and ISL network generation.
//!
//! Grounded on `sat_core/{constellation,satellite,orbit_util,orbit_shift_algo,isl_util}.py`.
//! The reference implementation delegates orbital propagation to `pyephem`'s
//! `EarthSatellite`, configured with a near-zero eccentricity (`1e-32`) and
//! zero argument-of-perigee — i.e. a circular orbit. No `pyephem`-equivalent
//! crate is available in the retrieved pack, so satellite position is
//! propagated in closed form for the circular-orbit case: mean anomaly
//! advances linearly with the configured mean motion, the orbital plane is
//! tilted by inclination, and the ascending node is placed directly at its
//! Earth-fixed longitude (no sidereal-time/Earth-rotation correction is
//! applied, since this system computes one static snapshot rather than
//! tracking dynamic evolution — see SPEC_FULL.md Non-goals). This is an
//! intentional, documented simplification of the reference's SGP-style
//! propagation, not an approximation of it.

use icarus_core::coords::{EARTH_RADIUS, MU, SEC_IN_DAY};
use icarus_core::types::{GeoPoint, IslInfo, SatId, SatPos};
use std::collections::HashMap;

/// Orbit-shift algorithms (component of Walker-constellation construction).
/// Grounded on `orbit_shift_algo.py`.
pub trait OrbitShiftAlgo: Send + Sync {
    /// Shift, in degrees, applied to the satellites of `orbit_idx`.
    fn shift(&self, orbit_idx: u32) -> f64;
}

pub struct NoShift;
impl OrbitShiftAlgo for NoShift {
    fn shift(&self, _orbit_idx: u32) -> f64 {
        0.0
    }
}

/// Shift each odd orbit by half the inter-satellite angular distance.
pub struct SimpleShift {
    pub sats_per_orbit: u32,
}
impl OrbitShiftAlgo for SimpleShift {
    fn shift(&self, orbit_idx: u32) -> f64 {
        if orbit_idx % 2 == 1 {
            360.0 / (self.sats_per_orbit as f64 * 2.0)
        } else {
            0.0
        }
    }
}

/// Walker (i, T/P/F) phasing shift between adjacent planes.
pub struct WalkerShift {
    pub plane_shift: f64,
}
impl WalkerShift {
    pub fn new(sats_per_orbit: u32, orbits: u32, f_param: u32) -> Self {
        assert!((f_param as u64) < orbits as u64);
        let t = sats_per_orbit as f64 * orbits as f64;
        Self {
            plane_shift: f_param as f64 * 360.0 / t,
        }
    }
}
impl OrbitShiftAlgo for WalkerShift {
    fn shift(&self, orbit_idx: u32) -> f64 {
        orbit_idx as f64 * self.plane_shift
    }
}

/// Orbital period, in seconds, for a circular orbit at elevation `h` meters.
pub fn elevation_to_period(h: f64) -> f64 {
    assert!(h > 0.0);
    let radius = h + EARTH_RADIUS;
    2.0 * std::f64::consts::PI * (radius.powi(3) / MU).sqrt()
}

/// Mean motion in revolutions/day for a circular orbit at elevation `h`.
pub fn elevation_to_mean_motion(h: f64) -> f64 {
    let period_days = elevation_to_period(h) / SEC_IN_DAY;
    1.0 / period_days
}

pub fn in_orbit_idx_to_sat_idx(sat_idx_in_orbit: u32, orbit_idx: u32, sats_per_orbit: u32) -> SatId {
    orbit_idx * sats_per_orbit + sat_idx_in_orbit
}

pub fn sat_idx_to_in_orbit_idx(sat_idx: SatId, sats_per_orbit: u32) -> (u32, u32) {
    (sat_idx % sats_per_orbit, sat_idx / sats_per_orbit)
}

#[derive(Debug, Clone, Copy)]
pub struct EpochOffset {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub millis: i64,
}

impl EpochOffset {
    pub fn as_days(&self) -> f64 {
        (self.hours as f64) / 24.0
            + (self.minutes as f64) / (24.0 * 60.0)
            + (self.seconds as f64) / SEC_IN_DAY
            + (self.millis as f64) / (SEC_IN_DAY * 1000.0)
    }
}

pub struct Constellation {
    pub sats_per_orbit: u32,
    pub orbits: u32,
    pub inclination_deg: f64,
    pub elevation_m: f64,
    pub mean_motion_revs_per_day: f64,
    pub shift_algo: Box<dyn OrbitShiftAlgo>,
}

impl Constellation {
    pub fn new(
        sats_per_orbit: u32,
        orbits: u32,
        inclination_deg: f64,
        elevation_m: f64,
        shift_algo: Box<dyn OrbitShiftAlgo>,
    ) -> Self {
        Self {
            sats_per_orbit,
            orbits,
            inclination_deg,
            elevation_m,
            mean_motion_revs_per_day: elevation_to_mean_motion(elevation_m),
            shift_algo,
        }
    }

    /// Right ascension of the ascending node for `orbit_idx`, in degrees,
    /// spread evenly over `orbits` planes.
    fn raan_deg(&self, orbit_idx: u32) -> f64 {
        orbit_idx as f64 * 360.0 / self.orbits as f64
    }

    fn mean_anomaly_deg(&self, sat_idx_in_orbit: u32, orbit_idx: u32) -> f64 {
        self.shift_algo.shift(orbit_idx) + sat_idx_in_orbit as f64 * 360.0 / self.sats_per_orbit as f64
    }

    pub fn positions_at_offset(&self, offset: EpochOffset) -> SatPos {
        let dt_days = offset.as_days();
        let mut positions = HashMap::new();
        for orbit_idx in 0..self.orbits {
            for sat_idx_in_orbit in 0..self.sats_per_orbit {
                let sat_idx = in_orbit_idx_to_sat_idx(sat_idx_in_orbit, orbit_idx, self.sats_per_orbit);
                let u_deg =
                    self.mean_anomaly_deg(sat_idx_in_orbit, orbit_idx) + 360.0 * self.mean_motion_revs_per_day * dt_days;
                let u = u_deg.to_radians();
                let inc = self.inclination_deg.to_radians();
                let raan = self.raan_deg(orbit_idx).to_radians();

                // Position in the orbital plane, tilted by inclination.
                let xp = u.cos();
                let yp = u.sin() * inc.cos();
                let zp = u.sin() * inc.sin();
                // Rotate ascending node to its Earth-fixed longitude.
                let x = xp * raan.cos() - yp * raan.sin();
                let y = xp * raan.sin() + yp * raan.cos();
                let z = zp;

                let lat = z.clamp(-1.0, 1.0).asin().to_degrees();
                let lon = y.atan2(x).to_degrees();
                positions.insert(
                    sat_idx,
                    GeoPoint {
                        lat,
                        lon,
                        elev: self.elevation_m,
                    },
                );
            }
        }
        positions
    }
}

/// A motif entry `(sat_offset, orbit_offset)`; e.g. the default
/// `[(1, 0), (0, 1)]` links within-orbit successors and cross-orbit peers.
pub type Motif = Vec<(i64, i64)>;

/// Neighbor satellite index for a motif offset, with the seam wrap
/// correction from `isl_util.py::get_sat_by_offset`.
pub fn sat_by_offset(
    sat_idx_in_orbit: u32,
    orbit_idx: u32,
    sat_offset: i64,
    orbit_offset: i64,
    sats_per_orbit: u32,
    orbits: u32,
    max_shift_deg: f64,
) -> SatId {
    assert!(!(sat_offset == 0 && orbit_offset == 0));
    let mut walker_shift_in_orbit = 0i64;
    if orbit_idx as i64 == orbits as i64 - 1 && orbit_offset > 0 {
        let inter_sat = 360.0 / sats_per_orbit as f64;
        walker_shift_in_orbit = (max_shift_deg / inter_sat).ceil() as i64;
    }
    let neigh_in_orbit = rem_euclid(
        sat_idx_in_orbit as i64 + sat_offset + walker_shift_in_orbit,
        sats_per_orbit as i64,
    ) as u32;
    let neigh_orbit = rem_euclid(orbit_idx as i64 + orbit_offset, orbits as i64) as u32;
    in_orbit_idx_to_sat_idx(neigh_in_orbit, neigh_orbit, sats_per_orbit)
}

fn rem_euclid(a: i64, m: i64) -> i64 {
    ((a % m) + m) % m
}

/// Build the ISL graph for `sat_pos` by applying `motif` around each
/// satellite, deduplicating symmetric pairs. Mirrors
/// `constellation_network.py::ConstellationNetwork.generate_network`.
pub fn generate_isls(
    sat_pos: &SatPos,
    sats_per_orbit: u32,
    orbits: u32,
    max_shift_deg: f64,
    motif: &Motif,
) -> Vec<IslInfo> {
    use icarus_core::coords::{euclidean, geo2cart};
    use std::collections::HashSet;

    let mut seen: HashSet<(SatId, SatId)> = HashSet::new();
    let mut isls = Vec::new();
    for sat_idx in sat_pos.keys().copied() {
        let (in_orbit, orbit_idx) = sat_idx_to_in_orbit_idx(sat_idx, sats_per_orbit);
        for &(sat_off, orbit_off) in motif {
            let neigh = sat_by_offset(
                in_orbit,
                orbit_idx,
                sat_off,
                orbit_off,
                sats_per_orbit,
                orbits,
                max_shift_deg,
            );
            let key = if sat_idx <= neigh {
                (sat_idx, neigh)
            } else {
                (neigh, sat_idx)
            };
            if !seen.insert(key) {
                continue;
            }
            let length = euclidean(geo2cart(&sat_pos[&sat_idx]), geo2cart(&sat_pos[&neigh]));
            isls.push(IslInfo {
                sat1: sat_idx,
                sat2: neigh,
                length,
            });
        }
    }
    isls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_constellation_has_expected_sat_count() {
        let c = Constellation::new(1, 2, 53.0, 550_000.0, Box::new(NoShift));
        let pos = c.positions_at_offset(EpochOffset {
            hours: 0,
            minutes: 0,
            seconds: 0,
            millis: 0,
        });
        assert_eq!(pos.len(), 2);
    }

    #[test]
    fn isl_motif_produces_bidirectional_pairs_without_duplicates() {
        let c = Constellation::new(2, 2, 53.0, 550_000.0, Box::new(NoShift));
        let pos = c.positions_at_offset(EpochOffset {
            hours: 0,
            minutes: 0,
            seconds: 0,
            millis: 0,
        });
        let motif = vec![(0, 1), (1, 0)];
        let isls = generate_isls(&pos, 2, 2, 0.0, &motif);
        assert!(!isls.is_empty());
        let mut seen = std::collections::HashSet::new();
        for isl in &isls {
            let key = (isl.sat1.min(isl.sat2), isl.sat1.max(isl.sat2));
            assert!(seen.insert(key), "duplicate undirected ISL entry");
        }
    }
}
