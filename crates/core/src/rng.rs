//! Deterministic seeding.
//!
//! The reference implementation seeds Python's `random` module from fixed
//! strings (`"DINFK"`, per-worker `"{id}-{id}-{id}"`, `"Icarus"`, `"ETHZ"`)
//! so that shuffles and samplings reproduce across runs of the same
//! configuration. `rand_chacha::ChaCha8Rng` plays the same role here; we
//! fold the seed string's bytes into a `u64` with FNV-1a, since only
//! cross-run determinism is required, not cryptographic seed spread.

use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

pub fn rng_from_seed_str(seed: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(fnv1a(seed.as_bytes()))
}

pub fn worker_seed(worker_id: usize) -> String {
    format!("{worker_id}-{worker_id}-{worker_id}")
}
