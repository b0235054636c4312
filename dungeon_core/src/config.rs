//! Simulation settings supplied by the host.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//! The core never reads files; the host hands over the text.

use dungeon_rules::DiceExpr;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seeds the simulation's single random stream.
    pub seed: u64,
    pub pathfinding: PathfindingConfig,
    pub combat: CombatConfig,
    pub ai: AiConfig,
    pub events: EventConfig,
    pub dungeon: DungeonConfig,
}

impl SimConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: SimConfig = toml::from_str(s)?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Upper bound on expanded nodes per search.
    pub max_expansions: usize,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            max_expansions: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// A locked entity may not step to a cell farther than this from every
    /// live opponent, unless it is closing the distance.
    pub disengage_distance: i32,
    /// Damage dealt by attackers without a weapon.
    pub unarmed_damage: DiceExpr,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            disengage_distance: 1,
            unarmed_damage: unarmed_default(),
        }
    }
}

fn unarmed_default() -> DiceExpr {
    DiceExpr::parse("1d4+STR").unwrap_or_else(|_| DiceExpr::constant(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Manhattan range within which a chaser without vision notices its target.
    pub chase_range: i32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self { chase_range: 5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Maximum drain rounds a single phase may run.
    pub max_cascade: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { max_cascade: 32 }
    }
}

/// Level generator parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    pub width: i32,
    pub height: i32,
    pub max_rooms: usize,
    pub min_room_size: i32,
    pub max_room_size: i32,
    pub max_room_attempts: usize,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 45,
            max_rooms: 8,
            min_room_size: 4,
            max_room_size: 8,
            max_room_attempts: 50,
        }
    }
}
