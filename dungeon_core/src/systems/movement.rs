//! Movement: turns `MoveRequested` into a position change, a bump attack,
//! or nothing.

use dungeon_rules::{EntityId, Point, Position};

use super::SystemContext;
use crate::error::SimError;
use crate::events::GameEvent;
use crate::world::ComponentKind;

/// Message posted when the engagement lock refuses a step.
pub const FLEE_REFUSED: &str = "Cannot flee from combat!";
/// Message posted when a step would leave the level.
pub const OUT_OF_BOUNDS: &str = "Can't go that way!";

/// Resolve one move request.
///
/// Checks run in order: the mover can act, the target is one step away,
/// the engagement lock allows it, the target is on the map and walkable.
/// A living occupant turns the move into `Bump` + `AttackRequested`; an
/// impassable blocker stops it silently. Otherwise the mover's position is
/// updated and `MoveResolved` is posted.
pub fn handle_move(
    ctx: &mut SystemContext<'_>,
    entity: EntityId,
    target: Point,
) -> Result<(), SimError> {
    let position = ctx.active_position(entity)?;
    let from = position.point();

    if from.chebyshev(target) != 1 {
        tracing::debug!("Entity {} cannot reach {} from {} in one step", entity, target, from);
        return Ok(());
    }

    let disengage = ctx.config.combat.disengage_distance;
    if !ctx.combat.move_allowed(ctx.world, entity, from, target, disengage) {
        tracing::debug!("Entity {} is locked in combat", entity);
        ctx.world.post(GameEvent::message(FLEE_REFUSED));
        return Ok(());
    }

    if !ctx.map.in_bounds(target) {
        ctx.world.post(GameEvent::message(OUT_OF_BOUNDS));
        return Ok(());
    }
    if !ctx.map.is_walkable(target) {
        return Ok(());
    }

    let destination = Position::at(target, position.z);
    let occupant = ctx.world.entities_at(destination).into_iter().find(|&other| {
        other != entity && ctx.world.has(other, ComponentKind::Health) && ctx.world.is_alive(other)
    });
    if let Some(occupant) = occupant {
        tracing::debug!("Entity {} bumps into {}", entity, occupant);
        ctx.world.post(GameEvent::Bump {
            entity,
            target: occupant,
        });
        ctx.world.post(GameEvent::AttackRequested {
            attacker: entity,
            target: occupant,
        });
        return Ok(());
    }

    if ctx.world.is_blocked(destination, Some(entity)) {
        return Ok(());
    }

    ctx.world.attach(entity, destination)?;
    tracing::debug!("Entity {} moved {} -> {}", entity, from, target);
    ctx.world.post(GameEvent::MoveResolved {
        entity,
        from,
        to: target,
    });
    Ok(())
}
