//! Actor templates: component bundles supplied by content code.

use serde::{Deserialize, Serialize};

use super::{Ai, Armor, Faction, Health, Stats, Vision, Weapon};

/// Everything needed to spawn a creature or the player.
///
/// Content collaborators deserialize these from their own data files; the
/// simulation only turns them into components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorTemplate {
    pub name: String,
    pub max_hp: i32,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub weapon: Option<Weapon>,
    #[serde(default)]
    pub armor: Option<Armor>,
    #[serde(default)]
    pub vision: Option<Vision>,
    #[serde(default)]
    pub ai: Option<Ai>,
    #[serde(default)]
    pub faction: Option<Faction>,
    /// Whether the actor occupies its cell exclusively.
    #[serde(default = "default_blocks")]
    pub blocks: bool,
    /// Inventory capacity; zero means no inventory.
    #[serde(default)]
    pub inventory_capacity: usize,
}

fn default_blocks() -> bool {
    true
}

impl ActorTemplate {
    /// A template with default stats and nothing optional.
    pub fn new(name: impl Into<String>, max_hp: i32) -> Self {
        Self {
            name: name.into(),
            max_hp,
            stats: Stats::default(),
            weapon: None,
            armor: None,
            vision: None,
            ai: None,
            faction: None,
            blocks: true,
            inventory_capacity: 0,
        }
    }

    /// Starting health for a fresh spawn.
    pub fn health(&self) -> Health {
        Health::new(self.max_hp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::AiBehavior;
    use crate::mechanics::DamageType;

    #[test]
    fn test_new_template() {
        let template = ActorTemplate::new("Test Hero", 20);
        assert_eq!(template.name, "Test Hero");
        assert!(template.blocks);
        assert!(template.ai.is_none());
        assert_eq!(template.health().hp, 20);
    }

    #[test]
    fn test_template_from_content_json() {
        let json = r#"{
            "name": "Goblin",
            "max_hp": 7,
            "stats": {
                "strength": 8, "agility": 14, "intellect": 6,
                "accuracy": 3, "evasion": 2,
                "crit_chance": 5, "crit_multiplier": 1.5
            },
            "weapon": { "damage": "1d6+AGI", "damage_type": "Physical" },
            "armor": { "soak": "1d2", "resist": { "Poison": 25 } },
            "vision": { "radius": 6 },
            "ai": { "behavior": "Chase" },
            "faction": 2
        }"#;

        let goblin: ActorTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(goblin.name, "Goblin");
        assert_eq!(goblin.stats.agility, 14);

        let weapon = goblin.weapon.unwrap();
        assert_eq!(weapon.damage.to_string(), "1d6+AGI");
        assert_eq!(weapon.damage_type, DamageType::Physical);
        assert_eq!(weapon.reach, 1);

        let armor = goblin.armor.unwrap();
        assert_eq!(armor.resistance(DamageType::Poison), 25);
        assert_eq!(goblin.ai.unwrap().behavior, AiBehavior::Chase);
        assert_eq!(goblin.faction, Some(Faction(2)));
        assert!(goblin.blocks);
    }

    #[test]
    fn test_bad_dice_fails_at_load() {
        let json = r#"{
            "name": "Broken",
            "max_hp": 3,
            "weapon": { "damage": "1d", "damage_type": "Physical" }
        }"#;
        assert!(serde_json::from_str::<ActorTemplate>(json).is_err());
    }

    #[test]
    fn test_negative_stats_fail_at_load() {
        let json = r#"{
            "name": "Cursed",
            "max_hp": 3,
            "stats": {
                "strength": 10, "agility": 10, "intellect": 10,
                "accuracy": 0, "evasion": -4,
                "crit_chance": 5, "crit_multiplier": 2.0
            }
        }"#;
        assert!(serde_json::from_str::<ActorTemplate>(json).is_err());
    }
}
