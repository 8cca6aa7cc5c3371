//! Geometry & Network (component C): Walker-constellation satellite
//! positions and ISL graph, the geodesic-icosphere ground grid, GDP-weighted
//! population, and angle-based ground-satellite coverage.

pub mod coverage;
pub mod grid;
pub mod orbit;
pub mod weight;
