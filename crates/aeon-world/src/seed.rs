//! Seeds and deterministic random streams.
//!
//! Every random decision in generation comes from a `ChaCha` stream derived
//! from `(map seed, stream id)`, so adding draws to one stage never shifts
//! the draws of another. New map seeds come from an injected
//! [`SeedSource`]; fixtures use [`SequentialSeeds`] instead of process-wide
//! counters.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Stream id for great-circle planning.
pub const CIRCLE_STREAM: u64 = 1;

/// Stream id for river sources.
pub const RIVER_STREAM: u64 = 2;

/// Stream id for resource placement.
pub const RESOURCE_STREAM: u64 = 3;

/// `SplitMix64` finaliser.
const fn mix(mut z: u64) -> u64 {
    z = (z ^ z.wrapping_shr(30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ z.wrapping_shr(27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ z.wrapping_shr(31)
}

/// Derive an independent seed for `stream` from a base seed.
pub const fn derive_seed(seed: u64, stream: u64) -> u64 {
    mix(seed ^ mix(stream.wrapping_add(0x9E37_79B9_7F4A_7C15)))
}

/// A `ChaCha` generator for one stream of one seed.
pub fn stream_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_seed(seed, stream))
}

/// Source of seeds for newly generated maps.
pub trait SeedSource: Send + Sync {
    /// Produce the seed for the next map.
    fn next_seed(&self) -> u64;
}

/// Seeds from operating-system entropy.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntropySeeds;

impl SeedSource for EntropySeeds {
    fn next_seed(&self) -> u64 {
        rand::random()
    }
}

/// Seeds `start, start + 1, ...` for reproducible fixtures.
#[derive(Debug)]
pub struct SequentialSeeds {
    next: AtomicU64,
}

impl SequentialSeeds {
    /// Start counting at `start`.
    pub const fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl SeedSource for SequentialSeeds {
    fn next_seed(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
