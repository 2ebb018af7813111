//! Seeded randomness for the randomizers.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

/// Seedable RNG handed to every randomizer.
///
/// Randomizers never reach for thread-local entropy; callers supply a handle
/// built from a master seed so that a job request replays identically. Work
/// that fans out (one worker per matrix column, one per layer) derives a seed
/// per unit with [`derive_substream_seed`] so the result does not depend on
/// scheduling order.
#[derive(Debug, Clone)]
pub struct RngHandle {
    seed: u64,
    rng: StdRng,
}

impl RngHandle {
    /// Handle seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Handle for unit `substream` of a fanned out job seeded with `master_seed`.
    pub fn for_substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Seed the handle started from.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Seed of `substream` under `master_seed`: SipHash-1-3 with zero keys over
/// both values, stable across platforms and releases.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut sip = SipHasher13::new_with_keys(0, 0);
    sip.write_u64(master_seed);
    sip.write_u64(substream);
    sip.finish()
}
