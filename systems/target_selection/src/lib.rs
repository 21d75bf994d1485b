#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Target selection system that picks the cell the player must tap next.
//!
//! Selection is uniform over the grid. The randomness source is injected so
//! rounds can be replayed deterministically from a seed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use vortex_core::CellIndex;

/// Describes how the selector treats the previously active target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RepeatPolicy {
    /// Every cell, including the previous target, is equally likely.
    #[default]
    Allow,
    /// The previous target is excluded; the remaining cells are equally likely.
    Avoid,
}

/// Configuration parameters required to construct a seeded selector.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    repeat_policy: RepeatPolicy,
    rng_seed: Option<u64>,
}

impl Config {
    /// Creates a new configuration using the provided policy and optional seed.
    ///
    /// Without a seed the selector draws its state from operating system entropy.
    #[must_use]
    pub const fn new(repeat_policy: RepeatPolicy, rng_seed: Option<u64>) -> Self {
        Self {
            repeat_policy,
            rng_seed,
        }
    }

    /// Policy applied to the previous target.
    #[must_use]
    pub const fn repeat_policy(&self) -> RepeatPolicy {
        self.repeat_policy
    }

    /// Seed used for the random number generator, if fixed.
    #[must_use]
    pub const fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }
}

/// Picks target cells from an injected random number generator.
#[derive(Debug, Clone)]
pub struct TargetSelector<R = ChaCha8Rng> {
    rng: R,
    repeat_policy: RepeatPolicy,
}

impl TargetSelector<ChaCha8Rng> {
    /// Builds a ChaCha-backed selector from the supplied configuration.
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::new(rng, config.repeat_policy)
    }
}

impl<R: Rng> TargetSelector<R> {
    /// Wraps an existing random number generator.
    #[must_use]
    pub fn new(rng: R, repeat_policy: RepeatPolicy) -> Self {
        Self { rng, repeat_policy }
    }

    /// Policy applied to the previous target.
    #[must_use]
    pub fn repeat_policy(&self) -> RepeatPolicy {
        self.repeat_policy
    }

    /// Picks the next target on a square grid with the given side length.
    ///
    /// `previous` is `None` for the first pick of a round. Under
    /// [`RepeatPolicy::Allow`] it is ignored entirely, so the new target may
    /// coincide with the old one.
    pub fn next(&mut self, side: u32, previous: Option<CellIndex>) -> CellIndex {
        let cells = side.saturating_mul(side);
        if cells <= 1 {
            return CellIndex::new(0);
        }

        match (self.repeat_policy, previous) {
            (RepeatPolicy::Avoid, Some(previous)) if previous.is_within(side) => {
                // Draw among the other cells, then shift past the excluded one.
                let draw = self.rng.gen_range(0..cells - 1);
                if draw >= previous.get() {
                    CellIndex::new(draw + 1)
                } else {
                    CellIndex::new(draw)
                }
            }
            _ => CellIndex::new(self.rng.gen_range(0..cells)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_grid_always_yields_origin() {
        let mut selector = TargetSelector::from_config(Config::new(RepeatPolicy::Avoid, Some(7)));
        assert_eq!(selector.next(1, None), CellIndex::new(0));
        assert_eq!(selector.next(1, Some(CellIndex::new(0))), CellIndex::new(0));
        assert_eq!(selector.next(0, None), CellIndex::new(0));
    }

    #[test]
    fn out_of_range_previous_target_is_ignored() {
        let mut selector = TargetSelector::from_config(Config::new(RepeatPolicy::Avoid, Some(3)));
        for _ in 0..64 {
            assert!(selector.next(2, Some(CellIndex::new(40))).is_within(2));
        }
    }
}
