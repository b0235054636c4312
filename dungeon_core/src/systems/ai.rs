//! Monster decisions. Each decision posts at most one intent event
//! (`MoveRequested` or `AttackRequested`); movement and attack handlers
//! resolve it later in the same phase.

use dungeon_rules::{
    Ai, AiBehavior, AiMemory, AlertLevel, Direction, EntityId, Point, Position, RollSource,
    VisibleTiles,
};

use super::{is_incapacitated, SystemContext};
use crate::error::SimError;
use crate::events::GameEvent;
use crate::pathfinding::Pathfinder;
use crate::world::{ComponentKind, World};

/// Living entities on level `depth` that get an AI decision this turn, in
/// id order.
pub fn ai_actors(world: &World, depth: i32) -> Vec<EntityId> {
    world
        .entities_with(&[ComponentKind::Ai, ComponentKind::Position])
        .into_iter()
        .filter(|&e| world.is_alive(e))
        .filter(|&e| world.get::<Position>(e).is_some_and(|p| p.z == depth))
        .collect()
}

/// The player as seen from `entity`: alive, on the same level and on
/// another side.
fn hostile_target(ctx: &SystemContext<'_>, entity: EntityId, z: i32) -> Option<(EntityId, Point)> {
    let player = ctx.player.filter(|&p| p != entity)?;
    if !ctx.world.is_alive(player) || ctx.world.side_of(player) == ctx.world.side_of(entity) {
        return None;
    }
    ctx.world
        .get::<Position>(player)
        .filter(|p| p.z == z)
        .map(|p| (player, p.point()))
}

/// Whether `entity` standing at `here` notices a target at `there`.
///
/// An entity with a visible-tile cache sees exactly its cache. Without one
/// it notices anything within the configured chase range.
fn perceives(ctx: &SystemContext<'_>, entity: EntityId, here: Position, there: Point) -> bool {
    match ctx.world.get::<VisibleTiles>(entity) {
        Some(cache) if cache.origin.is_some() => cache.can_see(Position::at(there, here.z)),
        _ => here.point().manhattan(there) <= ctx.config.ai.chase_range,
    }
}

/// Post the intent for one step of `entity` onto `step`.
///
/// Stepping onto `target` is an attack. Any other occupied cell is left
/// alone, so monsters never bump into each other. Returns whether an
/// intent was posted.
fn step_to(
    ctx: &mut SystemContext<'_>,
    entity: EntityId,
    z: i32,
    step: Point,
    target: Option<EntityId>,
) -> bool {
    if !ctx.map.is_walkable(step) {
        return false;
    }
    let at = Position::at(step, z);
    if let Some(target) = target {
        if ctx.world.entities_at(at).contains(&target) {
            ctx.world.post(GameEvent::AttackRequested {
                attacker: entity,
                target,
            });
            return true;
        }
    }
    let occupied = ctx.world.is_blocked(at, Some(entity))
        || ctx
            .world
            .entities_at(at)
            .into_iter()
            .any(|other| {
                other != entity
                    && ctx.world.has(other, ComponentKind::Health)
                    && ctx.world.is_alive(other)
            });
    if occupied {
        return false;
    }
    ctx.world.post(GameEvent::MoveRequested {
        entity,
        target: step,
    });
    true
}

/// First step of a path from `here` to `goal`, if the search finds one.
fn first_step(
    ctx: &SystemContext<'_>,
    entity: EntityId,
    here: Position,
    goal: Point,
) -> Option<Point> {
    let pathfinder = Pathfinder::new(ctx.config.pathfinding.max_expansions);
    let passable = |p: Point| {
        ctx.map.is_walkable(p)
            && (p == goal || !ctx.world.is_blocked(Position::at(p, here.z), Some(entity)))
    };
    match pathfinder.find_path(here.point(), goal, passable) {
        Ok(path) => path.first().copied(),
        Err(reason) => {
            tracing::debug!("Entity {} has no path to {}: {}", entity, goal, reason);
            None
        }
    }
}

fn wander(ctx: &mut SystemContext<'_>, entity: EntityId, here: Position, target: Option<EntityId>) {
    let index = ctx.rng.roll_range(0, Direction::ALL.len() as i32 - 1) as usize;
    let step = here.point().step(Direction::ALL[index]);
    if !step_to(ctx, entity, here.z, step, target) {
        tracing::debug!("Entity {} stays put", entity);
    }
}

fn chase(
    ctx: &mut SystemContext<'_>,
    entity: EntityId,
    here: Position,
    memory: &mut AiMemory,
    target: Option<(EntityId, Point)>,
    seen: bool,
) {
    let target_id = target.map(|(id, _)| id);
    if let (Some((id, at)), true) = (target, seen) {
        memory.last_seen = Some(at);
        memory.alert = AlertLevel::Hostile;
        if here.point().manhattan(at) == 1 {
            tracing::debug!("Entity {} attacks {}", entity, id);
            ctx.world.post(GameEvent::AttackRequested { attacker: entity, target: id });
            return;
        }
    }

    let Some(goal) = memory.last_seen else {
        memory.alert = AlertLevel::Calm;
        wander(ctx, entity, here, target_id);
        return;
    };
    if goal == here.point() {
        tracing::debug!("Entity {} lost track of its target", entity);
        memory.last_seen = None;
        memory.alert = AlertLevel::Calm;
        return;
    }
    if !seen {
        memory.alert = AlertLevel::Searching;
    }

    if let Some(step) = first_step(ctx, entity, here, goal) {
        if step_to(ctx, entity, here.z, step, target_id) {
            return;
        }
    }

    let direct = here
        .point()
        .offset((goal.x - here.x).signum(), (goal.y - here.y).signum());
    if !step_to(ctx, entity, here.z, direct, target_id) {
        wander(ctx, entity, here, target_id);
    }
}

fn patrol(
    ctx: &mut SystemContext<'_>,
    entity: EntityId,
    here: Position,
    waypoints: &[Point],
    memory: &mut AiMemory,
) {
    if waypoints.is_empty() {
        return;
    }
    let mut index = memory.patrol_index % waypoints.len();
    if waypoints[index] == here.point() {
        index = (index + 1) % waypoints.len();
    }
    memory.patrol_index = index;

    let goal = waypoints[index];
    if goal == here.point() {
        return;
    }
    if let Some(step) = first_step(ctx, entity, here, goal) {
        step_to(ctx, entity, here.z, step, None);
    }
}

/// Decide what `entity` does this turn.
///
/// Chasers and alerted patrollers pursue the player, fall back to a direct
/// step when no path exists and wander when that fails too. Idle entities
/// only strike what is orthogonally adjacent. Memory changes are written
/// back to the entity's `Ai` component.
pub fn decide(ctx: &mut SystemContext<'_>, entity: EntityId) -> Result<(), SimError> {
    let here = ctx.active_position(entity)?;
    let mut ai = ctx
        .world
        .get::<Ai>(entity)
        .cloned()
        .ok_or(SimError::MissingComponent {
            entity,
            component: ComponentKind::Ai,
        })?;
    if is_incapacitated(ctx, entity) {
        tracing::debug!("Entity {} is incapacitated", entity);
        return Ok(());
    }

    let target = hostile_target(ctx, entity, here.z);
    let seen = target.is_some_and(|(_, at)| perceives(ctx, entity, here, at));

    match ai.behavior.clone() {
        AiBehavior::Idle => {
            if let Some((id, at)) = target {
                if here.point().manhattan(at) == 1 {
                    ctx.world.post(GameEvent::AttackRequested { attacker: entity, target: id });
                }
            }
        }
        AiBehavior::Wander => wander(ctx, entity, here, target.map(|(id, _)| id)),
        AiBehavior::Chase => chase(ctx, entity, here, &mut ai.memory, target, seen),
        AiBehavior::Patrol { waypoints } => {
            if seen || ai.memory.last_seen.is_some() {
                chase(ctx, entity, here, &mut ai.memory, target, seen);
            } else {
                ai.memory.alert = AlertLevel::Calm;
                patrol(ctx, entity, here, &waypoints, &mut ai.memory);
            }
        }
    }

    ctx.world.attach(entity, ai)?;
    Ok(())
}
