//! Randomized ordering of the calibration set
//!
//! Batches are drawn sequentially, so the image list is permuted once up front
//! to keep calibration statistics independent of manifest file order.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

use super::manifest::ImageList;

/// Applies a single random permutation to an [`ImageList`]
#[derive(Debug, Clone, Default)]
pub struct SampleShuffler {
    /// Random seed
    seed: Option<u64>,
}

impl SampleShuffler {
    /// Create an entropy-seeded shuffler
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the random source this shuffler draws from
    pub fn rng(&self) -> Xoshiro256PlusPlus {
        match self.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Permute `images` in place
    pub fn shuffle(&self, images: &mut ImageList) {
        let mut rng = self.rng();
        Self::shuffle_with(images, &mut rng);
    }

    /// Permute `images` in place with a caller-supplied random source
    pub fn shuffle_with<R: Rng + ?Sized>(images: &mut ImageList, rng: &mut R) {
        images.paths_mut().shuffle(rng);
        debug!(images = images.len(), "Shuffled calibration images");
    }
}
