//! Attack resolution.

use serde::{Deserialize, Serialize};

use crate::rng::RollSource;

/// Defense value before evasion is added.
pub const BASE_DEFENSE: i32 = 10;
/// A natural 1 always misses.
pub const NATURAL_MISS: u32 = 1;
/// A natural 20 always hits.
pub const NATURAL_HIT: u32 = 20;

/// Result category of a to-hit roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackOutcome {
    Miss,
    Hit,
    Crit,
}

impl AttackOutcome {
    /// Whether damage should be rolled.
    pub fn landed(&self) -> bool {
        !matches!(self, AttackOutcome::Miss)
    }

    pub fn is_crit(&self) -> bool {
        matches!(self, AttackOutcome::Crit)
    }
}

/// A resolved to-hit roll with the numbers behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRoll {
    pub outcome: AttackOutcome,
    /// The d20 result before modifiers.
    pub die: u32,
    /// The value `die + accuracy` had to meet or exceed.
    pub defense: i32,
}

/// Whether a d20 face hits, ignoring crits.
pub fn hits(die: u32, accuracy: i32, evasion: i32) -> bool {
    match die {
        NATURAL_MISS => false,
        NATURAL_HIT => true,
        _ => die as i32 + accuracy >= BASE_DEFENSE + evasion,
    }
}

/// Roll to hit.
///
/// Draws a d20: 1 always misses, 20 always hits, anything else hits when
/// `die + accuracy >= 10 + evasion`. A hit then draws a percentage; below
/// `crit_chance` (0-100) it is a crit. A miss draws nothing further.
pub fn roll_to_hit<R: RollSource + ?Sized>(
    accuracy: i32,
    evasion: i32,
    crit_chance: u32,
    rng: &mut R,
) -> AttackRoll {
    let die = rng.roll_die(20);
    let defense = BASE_DEFENSE + evasion;

    if !hits(die, accuracy, evasion) {
        return AttackRoll {
            outcome: AttackOutcome::Miss,
            die,
            defense,
        };
    }

    let crit = rng.roll_percent() < crit_chance.min(100);
    AttackRoll {
        outcome: if crit {
            AttackOutcome::Crit
        } else {
            AttackOutcome::Hit
        },
        die,
        defense,
    }
}
