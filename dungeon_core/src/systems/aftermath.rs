//! End-of-turn side effects: corpses, player death and taking the stairs.

use dungeon_rules::{Ai, Blocker, EntityId, Position};

use super::{SystemContext, FLEE_REFUSED};
use crate::error::SimError;
use crate::events::GameEvent;
use crate::map::{DungeonGenerator, GeneratedLevel, TileKind};

pub const PLAYER_DIED: &str = "You have died!";
pub const NO_STAIRS: &str = "There are no stairs here.";
pub const DESCENDED: &str = "You descend the stairs.";

/// Turn a dead entity into a corpse: it leaves its encounter, stops
/// thinking and stops blocking. Returns `true` if it was the player.
pub fn handle_death(ctx: &mut SystemContext<'_>, entity: EntityId) -> bool {
    ctx.combat.on_death(ctx.world, entity);
    ctx.world.detach::<Ai>(entity);
    ctx.world.detach::<Blocker>(entity);
    tracing::info!("Entity {} ({}) died", entity, ctx.world.name_of(entity));

    if ctx.player == Some(entity) {
        ctx.world.post(GameEvent::message(PLAYER_DIED));
        return true;
    }
    false
}

/// Take the stairs down from where `entity` stands.
///
/// On success the next level is generated, `entity` is moved to its entry
/// point one level deeper and the level is returned for the caller to swap
/// in. Standing off the stairs or being locked in combat refuses with a
/// message and returns `None`.
pub fn descend(
    ctx: &mut SystemContext<'_>,
    entity: EntityId,
    generator: &DungeonGenerator,
) -> Result<Option<GeneratedLevel>, SimError> {
    let position = ctx.active_position(entity)?;
    if ctx.map.tile(position.point()) != Some(TileKind::StairsDown) {
        ctx.world.post(GameEvent::message(NO_STAIRS));
        return Ok(None);
    }
    if ctx.combat.is_locked(entity) && !ctx.combat.opponents_of(ctx.world, entity).is_empty() {
        ctx.world.post(GameEvent::message(FLEE_REFUSED));
        return Ok(None);
    }

    let depth = position.z + 1;
    let mut level = generator.generate(depth, &mut *ctx.rng);
    level.map.follow_revision(ctx.map.revision());

    ctx.combat.disengage(ctx.world, entity);
    ctx.world.attach(entity, Position::at(level.entry, depth))?;
    tracing::info!("Entity {} descended to depth {}", entity, depth);
    ctx.world.post(GameEvent::LevelChanged { entity, depth });
    ctx.world.post(GameEvent::message(DESCENDED));
    Ok(Some(level))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::config::DungeonConfig;
    use crate::map::DungeonMap;
    use dungeon_rules::{AiBehavior, Health};

    fn small_generator() -> DungeonGenerator {
        DungeonGenerator::new(DungeonConfig {
            width: 30,
            height: 20,
            max_rooms: 4,
            min_room_size: 3,
            max_room_size: 5,
            max_room_attempts: 20,
        })
    }

    #[test]
    fn test_death_leaves_a_corpse() {
        let mut h = Harness::open(5, 5);
        let rat = h.spawn("Rat", 3, 1, 1);
        h.world.attach(rat, Ai::new(AiBehavior::Wander)).unwrap();
        h.world.get_mut::<Health>(rat).unwrap().apply_damage(3);

        assert!(!handle_death(&mut h.ctx(), rat));
        assert!(h.world.get::<Ai>(rat).is_none());
        assert!(h.world.get::<Blocker>(rat).is_none());
        assert!(h.world.contains(rat));
        assert!(h.world.drain_events().is_empty());
    }

    #[test]
    fn test_player_death() {
        let mut h = Harness::open(5, 5);
        let hero = h.spawn("Hero", 3, 1, 1);
        h.player = Some(hero);
        h.world.get_mut::<Health>(hero).unwrap().apply_damage(3);

        assert!(handle_death(&mut h.ctx(), hero));
        assert_eq!(h.world.drain_events(), vec![GameEvent::message(PLAYER_DIED)]);
    }

    #[test]
    fn test_descend_needs_stairs() {
        let mut h = Harness::open(5, 5);
        let hero = h.spawn("Hero", 10, 1, 1);

        let level = descend(&mut h.ctx(), hero, &small_generator()).unwrap();
        assert!(level.is_none());
        assert_eq!(h.world.drain_events(), vec![GameEvent::message(NO_STAIRS)]);
    }

    #[test]
    fn test_descend_refused_while_locked() {
        let mut h = Harness::new(DungeonMap::from_ascii(&[">.."], 0).unwrap());
        let hero = h.spawn("Hero", 10, 0, 0);
        let orc = h.spawn("Orc", 10, 1, 0);
        h.combat.engage(&mut h.world, orc, hero);
        h.world.drain_events();

        let level = descend(&mut h.ctx(), hero, &small_generator()).unwrap();
        assert!(level.is_none());
        assert_eq!(h.world.drain_events(), vec![GameEvent::message(FLEE_REFUSED)]);
    }

    #[test]
    fn test_descend_moves_to_next_level() {
        let mut h = Harness::new(DungeonMap::from_ascii(&["..>"], 0).unwrap());
        let hero = h.spawn("Hero", 10, 2, 0);

        let level = descend(&mut h.ctx(), hero, &small_generator())
            .unwrap()
            .expect("stairs taken");
        assert_eq!(level.map.depth(), 1);
        assert!(level.map.revision() > h.map.revision());
        assert!(level.map.is_walkable(level.entry));
        assert_eq!(
            h.world.get::<Position>(hero),
            Some(&Position::at(level.entry, 1))
        );
        assert_eq!(
            h.world.drain_events(),
            vec![
                GameEvent::LevelChanged {
                    entity: hero,
                    depth: 1
                },
                GameEvent::message(DESCENDED),
            ]
        );
    }
}
