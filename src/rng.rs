//! Deterministic random number streams
//!
//! Every (world, system) pair gets its own ChaCha stream derived from the
//! configured master seed, so adding a system never perturbs another one.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy)]
pub struct RngManager {
    master_seed: u64,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self { master_seed: seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Fresh stream for a system inside a world.
    pub fn stream(&self, world: &str, system: &str) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.derive_seed(world, system))
    }

    fn derive_seed(&self, world: &str, system: &str) -> u64 {
        let mut seed = self.master_seed;
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= name_hash(world).wrapping_mul(1103515245);
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        seed ^= name_hash(system).wrapping_mul(48271);
        seed
    }
}

impl Default for RngManager {
    fn default() -> Self {
        Self::new(42)
    }
}

// FNV-1a; std's hasher is randomly keyed per process.
fn name_hash(name: &str) -> u64 {
    name.bytes().fold(0xcbf29ce484222325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x100000001b3)
    })
}

/// Helper functions for common random operations
pub trait RngExt {
    fn random_f32(&mut self, min: f32, max: f32) -> f32;
    fn random_bool(&mut self, probability: f32) -> bool;
}

impl<R: Rng> RngExt for R {
    fn random_f32(&mut self, min: f32, max: f32) -> f32 {
        self.gen::<f32>() * (max - min) + min
    }

    fn random_bool(&mut self, probability: f32) -> bool {
        self.gen::<f32>() < probability
    }
}
