//! Systems: per-phase logic that reads the world, mutates components and
//! posts events.
//!
//! Every handler takes a [`SystemContext`] and returns `Result<(), SimError>`.
//! An `Err` means the entity's action is skipped; the scheduler logs it and
//! carries on with the rest of the turn.

mod aftermath;
mod ai;
mod attack;
mod inventory;
mod movement;
mod status;
mod vision;

pub use aftermath::*;
pub use ai::*;
pub use attack::*;
pub use inventory::*;
pub use movement::*;
pub use status::*;
pub use vision::*;

use dungeon_rules::{EntityId, Position, RollSource};

use crate::combat::CombatTracker;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::map::DungeonMap;
use crate::world::{ComponentKind, World};

/// Everything a system may touch during one call.
///
/// Borrows are scoped to the call; nothing here outlives a phase.
pub struct SystemContext<'a> {
    pub world: &'a mut World,
    pub map: &'a DungeonMap,
    pub combat: &'a mut CombatTracker,
    pub rng: &'a mut dyn RollSource,
    pub config: &'a SimConfig,
    /// The player-controlled entity, the target of hostile AI.
    pub player: Option<EntityId>,
}

impl SystemContext<'_> {
    /// Whether `position` lies on the level currently simulated.
    pub fn on_level(&self, position: Position) -> bool {
        position.z == self.map.depth()
    }

    /// The position of an entity that may act right now: it exists, is
    /// alive and stands on the current level.
    pub fn active_position(&self, entity: EntityId) -> Result<Position, SimError> {
        if !self.world.contains(entity) {
            return Err(crate::error::WorldError::UnknownEntity(entity).into());
        }
        if !self.world.is_alive(entity) {
            return Err(SimError::Inactive(entity));
        }
        let position = self
            .world
            .get::<Position>(entity)
            .copied()
            .ok_or(SimError::MissingComponent {
                entity,
                component: ComponentKind::Position,
            })?;
        if !self.on_level(position) {
            return Err(SimError::Inactive(entity));
        }
        Ok(position)
    }
}
