//! Explicit random streams for the rules.
//!
//! Nothing in the simulation touches ambient randomness. Every rule function
//! takes a [`RollSource`], and the simulation owns exactly one, seeded once
//! when it is created. Identical seeds and inputs therefore replay identically.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// A source of die rolls.
pub trait RollSource {
    /// Roll one die, uniform in `1..=sides`. A zero-sided die yields 0.
    fn roll_die(&mut self, sides: u32) -> u32;

    /// Uniform in `0..100`, used for percentage checks such as crits.
    fn roll_percent(&mut self) -> u32;

    /// Uniform in `lo..=hi` (returns `lo` when the range is empty).
    fn roll_range(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as u32;
        lo + self.roll_die(span) as i32 - 1
    }
}

impl<R: RollSource + ?Sized> RollSource for &mut R {
    fn roll_die(&mut self, sides: u32) -> u32 {
        (**self).roll_die(sides)
    }

    fn roll_percent(&mut self) -> u32 {
        (**self).roll_percent()
    }
}

impl<R: RollSource + ?Sized> RollSource for Box<R> {
    fn roll_die(&mut self, sides: u32) -> u32 {
        (**self).roll_die(sides)
    }

    fn roll_percent(&mut self) -> u32 {
        (**self).roll_percent()
    }
}

/// The seeded production stream (ChaCha8).
#[derive(Debug, Clone)]
pub struct GameRng {
    seed: u64,
    inner: ChaCha8Rng,
}

impl GameRng {
    /// Create a stream from a 64-bit seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed this stream was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RollSource for GameRng {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.inner.gen_range(1..=sides)
    }

    fn roll_percent(&mut self) -> u32 {
        self.inner.gen_range(0..100)
    }
}

/// A predetermined sequence of draws.
///
/// Each call consumes the next value. Die draws are clamped into
/// `1..=sides` and percent draws are taken modulo 100. Once the script runs
/// out, dice yield 1 and percent draws yield 99.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRolls {
    values: VecDeque<u32>,
}

impl ScriptedRolls {
    /// Create a script from the values in draw order.
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Append more draws to the end of the script.
    pub fn extend(&mut self, values: impl IntoIterator<Item = u32>) {
        self.values.extend(values);
    }

    /// Number of scripted draws not yet consumed.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RollSource for ScriptedRolls {
    fn roll_die(&mut self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        self.values.pop_front().unwrap_or(1).clamp(1, sides)
    }

    fn roll_percent(&mut self) -> u32 {
        self.values.pop_front().map(|v| v % 100).unwrap_or(99)
    }
}
