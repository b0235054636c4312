//! Game events and the FIFO queue that carries them.
//!
//! Producers and consumers never call each other; they post to and drain
//! from the queue owned by the [`World`](crate::world::World). Events are
//! a closed enum so every consumer matches exhaustively.

use dungeon_rules::{DamageType, EntityId, Point};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::combat::EncounterId;

/// Something that happened or is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An entity wants to step onto `target`.
    MoveRequested { entity: EntityId, target: Point },
    MoveResolved {
        entity: EntityId,
        from: Point,
        to: Point,
    },
    /// A move ran into a living entity.
    Bump { entity: EntityId, target: EntityId },
    AttackRequested { attacker: EntityId, target: EntityId },
    DamageApplied {
        target: EntityId,
        amount: i32,
        damage_type: DamageType,
        source: Option<EntityId>,
    },
    EntityDied {
        entity: EntityId,
        killer: Option<EntityId>,
    },
    CombatStarted {
        encounter: EncounterId,
        participants: Vec<EntityId>,
    },
    CombatEnded {
        encounter: EncounterId,
        participants: Vec<EntityId>,
    },
    ItemPicked { entity: EntityId, item: EntityId },
    /// An entity wants to take the stairs down from where it stands.
    DescendRequested { entity: EntityId },
    LevelChanged { entity: EntityId, depth: i32 },
    Waited { entity: EntityId },
    /// Text for the message log.
    Message { text: String },
}

impl GameEvent {
    /// Build a message event.
    pub fn message(text: impl Into<String>) -> Self {
        GameEvent::Message { text: text.into() }
    }

    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::MoveRequested { .. } => "move_requested",
            GameEvent::MoveResolved { .. } => "move_resolved",
            GameEvent::Bump { .. } => "bump",
            GameEvent::AttackRequested { .. } => "attack_requested",
            GameEvent::DamageApplied { .. } => "damage_applied",
            GameEvent::EntityDied { .. } => "entity_died",
            GameEvent::CombatStarted { .. } => "combat_started",
            GameEvent::CombatEnded { .. } => "combat_ended",
            GameEvent::ItemPicked { .. } => "item_picked",
            GameEvent::DescendRequested { .. } => "descend_requested",
            GameEvent::LevelChanged { .. } => "level_changed",
            GameEvent::Waited { .. } => "waited",
            GameEvent::Message { .. } => "message",
        }
    }
}

/// FIFO buffer of events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.
    pub fn post(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    /// Take every queued event in post order, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Discard everything still queued.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Look at queued events without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }
}
