//! Game mechanics: damage types, attributes, status effects, slots, directions.

use serde::{Deserialize, Serialize};

/// All possible damage types in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageType {
    /// Weapons and claws. The only type soaked by armor.
    Physical,

    // Elemental
    Fire,
    Cold,
    Lightning,
    Acid,

    // Magical
    Arcane,
    Radiant,
    Necrotic,

    // Special
    Poison,
}

impl DamageType {
    /// Whether armor soak applies to this type.
    pub fn is_physical(&self) -> bool {
        matches!(self, DamageType::Physical)
    }

    /// Lowercase name used in combat messages.
    pub fn label(&self) -> &'static str {
        match self {
            DamageType::Physical => "physical",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Acid => "acid",
            DamageType::Arcane => "arcane",
            DamageType::Radiant => "radiant",
            DamageType::Necrotic => "necrotic",
            DamageType::Poison => "poison",
        }
    }
}

/// Primary attributes referenced by dice expressions (`STR`, `AGI`, `INT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    Strength,
    Agility,
    Intellect,
}

impl Attribute {
    /// Parse the three-letter token used in dice expressions.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "STR" => Some(Attribute::Strength),
            "AGI" => Some(Attribute::Agility),
            "INT" => Some(Attribute::Intellect),
            _ => None,
        }
    }

    /// The three-letter token for this attribute.
    pub fn token(&self) -> &'static str {
        match self {
            Attribute::Strength => "STR",
            Attribute::Agility => "AGI",
            Attribute::Intellect => "INT",
        }
    }
}

/// Status effects that can be applied to entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffectType {
    // Damage over time
    Bleeding,
    Poisoned,
    Burning,

    // Control
    Stunned,
    Paralyzed,
    Frightened,

    // Debuffs
    Weakened,
    Slowed,
    Blinded,

    // Buffs
    Blessed,
    Hasted,
    Protected,
}

impl StatusEffectType {
    /// Effects that prevent an entity from taking any action.
    pub fn is_incapacitating(&self) -> bool {
        matches!(self, StatusEffectType::Stunned | StatusEffectType::Paralyzed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusEffectType::Bleeding => "bleeding",
            StatusEffectType::Poisoned => "poisoned",
            StatusEffectType::Burning => "burning",
            StatusEffectType::Stunned => "stunned",
            StatusEffectType::Paralyzed => "paralyzed",
            StatusEffectType::Frightened => "frightened",
            StatusEffectType::Weakened => "weakened",
            StatusEffectType::Slowed => "slowed",
            StatusEffectType::Blinded => "blinded",
            StatusEffectType::Blessed => "blessed",
            StatusEffectType::Hasted => "hasted",
            StatusEffectType::Protected => "protected",
        }
    }
}

/// Equipment slots for characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EquipmentSlot {
    Head,
    Chest,
    Hands,
    Legs,
    Feet,
    MainHand,
    OffHand,
    Neck,
    Ring1,
    Ring2,
}

/// The eight compass directions of the grid. North is `-y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Direction {
    /// Orthogonal directions, in the order the pathfinder expands them.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// All eight directions.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
        Direction::SouthEast,
    ];

    /// The `(dx, dy)` step for this direction.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::NorthWest => (-1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
        }
    }
}
