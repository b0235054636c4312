//! Component definitions for entities.
//!
//! Components are plain data. Behavior lives in the systems that read them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{EntityId, Point};
use crate::dice::DiceExpr;
use crate::mechanics::{Attribute, DamageType, EquipmentSlot, StatusEffectType};

/// Location of an entity. `z` is the dungeon depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Place a point on a given depth.
    pub fn at(point: Point, z: i32) -> Self {
        Self::new(point.x, point.y, z)
    }

    /// The in-level coordinate.
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Hit points.
///
/// `hp` stays within `0..=max_hp` once a hit has been resolved, and `dead` is
/// set exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub dead: bool,
}

impl Health {
    /// Full health.
    pub fn new(max_hp: i32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            hp: max_hp,
            max_hp,
            dead: false,
        }
    }

    /// Apply damage. Returns `true` only for the hit that kills.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.hp = (self.hp - amount.max(0)).max(0);
        if self.hp == 0 {
            self.dead = true;
            return true;
        }
        false
    }

    /// Restore hit points up to the maximum. The dead are not healed.
    pub fn heal(&mut self, amount: i32) {
        if !self.dead {
            self.hp = (self.hp + amount.max(0)).min(self.max_hp);
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.dead
    }
}

/// Stats component for characters and creatures.
///
/// Every field is non-negative; unsigned fields make content with negative
/// values fail to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub strength: u32,
    pub agility: u32,
    pub intellect: u32,
    pub accuracy: u32,
    pub evasion: u32,
    /// Percent chance (0-100) that a hit is critical.
    pub crit_chance: u32,
    /// Multiplier applied to the dice of a critical hit.
    pub crit_multiplier: f32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            strength: 10,
            agility: 10,
            intellect: 10,
            accuracy: 0,
            evasion: 0,
            crit_chance: 5,
            crit_multiplier: 2.0,
        }
    }
}

impl Stats {
    /// Calculate modifier for a given attribute: `(value - 10) / 2`, rounded down.
    pub fn modifier(&self, attribute: Attribute) -> i32 {
        let value = match attribute {
            Attribute::Strength => self.strength,
            Attribute::Agility => self.agility,
            Attribute::Intellect => self.intellect,
        };
        // Fits in i32 for every u32 input.
        (i64::from(value) - 10).div_euclid(2) as i32
    }

    /// Accuracy as a to-hit bonus.
    pub fn hit_bonus(&self) -> i32 {
        i32::try_from(self.accuracy).unwrap_or(i32::MAX)
    }

    /// Evasion as a to-hit penalty for attackers.
    pub fn defense_bonus(&self) -> i32 {
        i32::try_from(self.evasion).unwrap_or(i32::MAX)
    }
}

/// Whether other entities may share this entity's cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    pub passable: bool,
}

impl Blocker {
    /// A blocker nothing can walk through.
    pub fn solid() -> Self {
        Self { passable: false }
    }
}

/// A weapon wielded by an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub damage: DiceExpr,
    pub damage_type: DamageType,
    #[serde(default = "default_reach")]
    pub reach: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_reach() -> u32 {
    1
}

impl Weapon {
    /// A melee weapon with reach 1 and no tags.
    pub fn melee(damage: DiceExpr, damage_type: DamageType) -> Self {
        Self {
            damage,
            damage_type,
            reach: 1,
            tags: Vec::new(),
        }
    }
}

/// Protective gear. Resistances are percentages, capped at 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Armor {
    #[serde(default)]
    pub soak: Option<DiceExpr>,
    #[serde(default)]
    pub resist: BTreeMap<DamageType, u8>,
    #[serde(default)]
    pub spell_resist: BTreeMap<DamageType, u8>,
}

impl Armor {
    /// Resistance percentage against a damage type.
    pub fn resistance(&self, damage_type: DamageType) -> u8 {
        self.resist.get(&damage_type).copied().unwrap_or(0).min(100)
    }

    /// Spell resistance percentage against a damage type.
    pub fn spell_resistance(&self, damage_type: DamageType) -> u8 {
        self.spell_resist.get(&damage_type).copied().unwrap_or(0).min(100)
    }
}

/// Status effects currently active on an entity, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusEffects {
    pub active: Vec<ActiveStatusEffect>,
}

/// An active status effect with duration and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveStatusEffect {
    pub effect: StatusEffectType,
    /// Turns left; `None` = permanent effect.
    pub remaining: Option<u32>,
    pub stacks: u32,
    pub source: Option<EntityId>,
}

impl StatusEffects {
    /// Check if a specific effect is active.
    pub fn has(&self, effect: StatusEffectType) -> bool {
        self.active.iter().any(|e| e.effect == effect)
    }

    /// Whether any active effect prevents acting.
    pub fn is_incapacitated(&self) -> bool {
        self.active.iter().any(|e| e.effect.is_incapacitating())
    }

    /// Add an effect. Re-applying an active effect stacks it and refreshes
    /// its duration to the longer of the two.
    pub fn apply(
        &mut self,
        effect: StatusEffectType,
        duration: Option<u32>,
        source: Option<EntityId>,
    ) {
        if let Some(existing) = self.active.iter_mut().find(|e| e.effect == effect) {
            existing.stacks += 1;
            existing.remaining = match (existing.remaining, duration) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            };
            return;
        }
        self.active.push(ActiveStatusEffect {
            effect,
            remaining: duration,
            stacks: 1,
            source,
        });
    }

    /// Advance one turn. Returns the effects that expired, in order.
    pub fn tick(&mut self) -> Vec<StatusEffectType> {
        let mut expired = Vec::new();
        self.active.retain_mut(|e| match e.remaining.as_mut() {
            Some(turns) => {
                *turns = turns.saturating_sub(1);
                if *turns == 0 {
                    expired.push(e.effect);
                    false
                } else {
                    true
                }
            }
            None => true,
        });
        expired
    }
}

/// Sight radius in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vision {
    pub radius: u32,
}

/// Field-of-view cache.
///
/// `visible` is replaced on each recompute. `seen` only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VisibleTiles {
    pub visible: BTreeSet<Position>,
    pub seen: BTreeSet<Position>,
    /// Observer position and map revision of the last recompute.
    pub origin: Option<Position>,
    pub map_revision: u64,
    pub radius: u32,
}

impl VisibleTiles {
    pub fn can_see(&self, position: Position) -> bool {
        self.visible.contains(&position)
    }

    pub fn has_seen(&self, position: Position) -> bool {
        self.seen.contains(&position)
    }
}

/// Behavior driving a non-player actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiBehavior {
    /// Stands still; attacks only what is adjacent.
    Idle,
    /// Random steps.
    Wander,
    /// Hunts the target it has seen.
    Chase,
    /// Walks waypoints in order, chasing when it sees the target.
    Patrol { waypoints: Vec<Point> },
}

/// How alarmed an actor is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AlertLevel {
    #[default]
    Calm,
    /// Lost sight of the target and heading to where it was last seen.
    Searching,
    Hostile,
}

/// The fixed memory slots of an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AiMemory {
    pub last_seen: Option<Point>,
    pub patrol_index: usize,
    pub alert: AlertLevel,
}

/// AI component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ai {
    pub behavior: AiBehavior,
    #[serde(default)]
    pub memory: AiMemory,
}

impl Ai {
    pub fn new(behavior: AiBehavior) -> Self {
        Self {
            behavior,
            memory: AiMemory::default(),
        }
    }
}

/// Inventory component for entities that can hold items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Inventory {
    pub capacity: usize,
    pub items: Vec<EntityId>,
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }
}

/// Items worn or wielded, by slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Equipment {
    pub slots: BTreeMap<EquipmentSlot, EntityId>,
}

/// Known spells and mana.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spellbook {
    pub spells: Vec<String>,
    pub mp: i32,
    pub max_mp: i32,
}

impl Default for Spellbook {
    fn default() -> Self {
        Self {
            spells: Vec::new(),
            mp: 50,
            max_mp: 50,
        }
    }
}

/// Marks an entity that can be picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Item;

/// Display name used in messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Combat side. Entities sharing a faction never count as opponents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Faction(pub u32);
