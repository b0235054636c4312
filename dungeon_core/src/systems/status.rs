//! Status effect upkeep.

use dungeon_rules::{EntityId, StatusEffects};

use super::SystemContext;
use crate::events::GameEvent;
use crate::world::ComponentKind;

/// Count every living entity's timed effects down by one turn and post a
/// message for each that wears off.
pub fn tick_status_effects(ctx: &mut SystemContext<'_>) {
    for entity in ctx.world.entities_with(&[ComponentKind::Status]) {
        if !ctx.world.is_alive(entity) {
            continue;
        }
        let expired = match ctx.world.get_mut::<StatusEffects>(entity) {
            Some(status) => status.tick(),
            None => continue,
        };
        if expired.is_empty() {
            continue;
        }

        let name = ctx.world.name_of(entity);
        for effect in expired {
            tracing::debug!("Entity {} is no longer {}", entity, effect.label());
            ctx.world.post(GameEvent::message(format!(
                "{name} is no longer {}.",
                effect.label()
            )));
        }
    }
}

/// Whether a status effect keeps `entity` from acting this turn.
pub fn is_incapacitated(ctx: &SystemContext<'_>, entity: EntityId) -> bool {
    ctx.world
        .get::<StatusEffects>(entity)
        .map(StatusEffects::is_incapacitated)
        .unwrap_or(false)
}
