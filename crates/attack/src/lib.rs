//! Link Attack Engine (component G) and Zone Attack Engine (component H):
//! direction synthesis, LP/probabilistic feasibility, binary-search
//! detectability optimization, geographic source constraints, and zone
//! build/select/edges/bottleneck enumeration.

pub mod direction;
pub mod feasibility;
pub mod geo_constraint;
pub mod link_phase;
pub mod optim;
pub mod zone;
pub mod zone_phase;
