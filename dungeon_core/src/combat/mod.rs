//! Combat state machine.
//!
//! Tracks encounters, who belongs to which, and the engagement lock. The
//! tracker only stores entity ids; component data stays in the [`World`].
//!
//! ## Lock rule
//!
//! A participant of an active encounter may not step to a cell whose
//! Chebyshev distance to the nearest live opponent exceeds the configured
//! disengage distance, unless that distance does not grow. Closing in and
//! side-stepping are always allowed.

mod encounter;

pub use encounter::*;

use dungeon_rules::{EntityId, Point, Position};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::events::GameEvent;
use crate::world::{Side, World};

/// Owns every encounter and the entity-to-encounter membership.
#[derive(Debug, Clone, Default)]
pub struct CombatTracker {
    encounters: IndexMap<EncounterId, Encounter>,
    membership: BTreeMap<EntityId, EncounterId>,
    next_id: u32,
}

impl CombatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The encounter `entity` belongs to, if any.
    pub fn encounter_of(&self, entity: EntityId) -> Option<&Encounter> {
        self.membership
            .get(&entity)
            .and_then(|id| self.encounters.get(id))
    }

    pub fn encounter(&self, id: EncounterId) -> Option<&Encounter> {
        self.encounters.get(&id)
    }

    /// All encounters in creation order, including ended ones not yet swept.
    pub fn encounters(&self) -> impl Iterator<Item = &Encounter> {
        self.encounters.values()
    }

    pub fn in_combat(&self, entity: EntityId) -> bool {
        self.membership.contains_key(&entity)
    }

    /// Whether `entity` is held by an active encounter's lock.
    pub fn is_locked(&self, entity: EntityId) -> bool {
        self.encounter_of(entity)
            .map(|e| e.locked && e.is_active())
            .unwrap_or(false)
    }

    /// Link `attacker` and `target` in one encounter.
    ///
    /// Creates an encounter if neither is engaged (posting `CombatStarted`),
    /// adds the newcomer if one is, and merges two different encounters into
    /// the older one.
    pub fn engage(
        &mut self,
        world: &mut World,
        attacker: EntityId,
        target: EntityId,
    ) -> EncounterId {
        let a = self.membership.get(&attacker).copied();
        let b = self.membership.get(&target).copied();

        match (a, b) {
            (None, None) => self.start(world, attacker, target),
            (Some(id), None) => {
                self.join(id, target);
                id
            }
            (None, Some(id)) => {
                self.join(id, attacker);
                id
            }
            (Some(a), Some(b)) if a == b => a,
            (Some(a), Some(b)) => self.merge(a.min(b), a.max(b)),
        }
    }

    fn start(&mut self, world: &mut World, attacker: EntityId, target: EntityId) -> EncounterId {
        self.next_id += 1;
        let id = EncounterId(self.next_id);
        let mut encounter = Encounter::new(id);
        encounter.participants.insert(attacker);
        encounter.participants.insert(target);
        self.membership.insert(attacker, id);
        self.membership.insert(target, id);
        self.encounters.insert(id, encounter);

        self.transition(id, EncounterState::Active);
        if let Some(encounter) = self.encounters.get_mut(&id) {
            encounter.locked = true;
            world.post(GameEvent::CombatStarted {
                encounter: id,
                participants: encounter.participant_list(),
            });
        }
        id
    }

    fn join(&mut self, id: EncounterId, entity: EntityId) {
        if let Some(encounter) = self.encounters.get_mut(&id) {
            encounter.participants.insert(entity);
            self.membership.insert(entity, id);
            tracing::debug!("Entity {} joined {}", entity, id);
        }
    }

    fn merge(&mut self, keep: EncounterId, fold: EncounterId) -> EncounterId {
        let Some(folded) = self.encounters.shift_remove(&fold) else {
            return keep;
        };
        if let Some(encounter) = self.encounters.get_mut(&keep) {
            for entity in folded.participants {
                encounter.participants.insert(entity);
                self.membership.insert(entity, keep);
            }
        }
        tracing::info!("Merged {} into {}", fold, keep);
        keep
    }

    /// Fold damage into encounter membership. Damage between a participant
    /// and an outsider pulls the outsider in.
    pub fn on_damage(&mut self, world: &mut World, target: EntityId, source: Option<EntityId>) {
        let Some(source) = source else {
            return;
        };
        if source == target {
            return;
        }
        if self.in_combat(source) || self.in_combat(target) {
            self.engage(world, source, target);
        }
    }

    /// A participant died; the encounter may be over.
    pub fn on_death(&mut self, world: &mut World, entity: EntityId) {
        if let Some(id) = self.membership.get(&entity).copied() {
            self.resolve(world, id);
        }
    }

    /// Remove `entity` from its encounter, then re-check the encounter.
    pub fn disengage(&mut self, world: &mut World, entity: EntityId) {
        let Some(id) = self.membership.remove(&entity) else {
            return;
        };
        if let Some(encounter) = self.encounters.get_mut(&id) {
            encounter.participants.remove(&entity);
        }
        tracing::debug!("Entity {} left {}", entity, id);
        self.resolve(world, id);
    }

    /// Move an active encounter to `Resolving` and then `Ended` once its live
    /// participants span at most one side.
    pub fn resolve(&mut self, world: &mut World, id: EncounterId) {
        let Some(encounter) = self.encounters.get(&id) else {
            return;
        };
        if !encounter.is_active() {
            return;
        }

        let survivors: Vec<EntityId> = encounter
            .participants
            .iter()
            .copied()
            .filter(|&e| world.is_alive(e))
            .collect();
        let sides: BTreeSet<Side> = survivors.iter().map(|&e| world.side_of(e)).collect();
        if sides.len() > 1 {
            return;
        }

        self.transition(id, EncounterState::Resolving);
        let text = if survivors.is_empty() {
            "The fight is over. Nobody is left standing.".to_string()
        } else {
            let names: Vec<String> = survivors.iter().map(|&e| world.name_of(e)).collect();
            format!("The fight is over. {} prevailed.", names.join(", "))
        };
        world.post(GameEvent::message(text));

        self.transition(id, EncounterState::Ended);
        let Some(encounter) = self.encounters.get_mut(&id) else {
            return;
        };
        encounter.locked = false;
        for entity in &encounter.participants {
            self.membership.remove(entity);
        }
        world.post(GameEvent::CombatEnded {
            encounter: id,
            participants: encounter.participant_list(),
        });
    }

    /// Drop ended encounters. Called at the end of each turn.
    pub fn sweep_ended(&mut self) -> usize {
        let before = self.encounters.len();
        self.encounters.retain(|_, e| !e.is_ended());
        before - self.encounters.len()
    }

    /// Live opponents of `entity` in its encounter, on the same level.
    pub fn opponents_of(&self, world: &World, entity: EntityId) -> Vec<EntityId> {
        let Some(encounter) = self.encounter_of(entity) else {
            return Vec::new();
        };
        let side = world.side_of(entity);
        let z = world.get::<Position>(entity).map(|p| p.z);
        encounter
            .participants
            .iter()
            .copied()
            .filter(|&other| other != entity && world.is_alive(other))
            .filter(|&other| world.side_of(other) != side)
            .filter(|&other| world.get::<Position>(other).map(|p| p.z) == z)
            .collect()
    }

    /// Whether the lock allows `entity` to step from `from` to `to`.
    pub fn move_allowed(
        &self,
        world: &World,
        entity: EntityId,
        from: Point,
        to: Point,
        disengage_distance: i32,
    ) -> bool {
        if !self.is_locked(entity) {
            return true;
        }

        let opponents: Vec<Point> = self
            .opponents_of(world, entity)
            .into_iter()
            .filter_map(|e| world.get::<Position>(e).map(Position::point))
            .collect();
        let nearest = |p: Point| opponents.iter().map(|o| p.chebyshev(*o)).min();

        match (nearest(from), nearest(to)) {
            (Some(current), Some(next)) => next <= disengage_distance || next <= current,
            _ => true,
        }
    }

    fn transition(&mut self, id: EncounterId, next: EncounterState) {
        let Some(encounter) = self.encounters.get_mut(&id) else {
            return;
        };
        let old = encounter.state;
        if !old.can_become(next) {
            tracing::warn!(
                "Refused {} transition: {} -> {}",
                id,
                old.name(),
                next.name()
            );
            return;
        }
        encounter.state = next;
        tracing::info!(
            "Encounter transition: {} {} -> {} ({} participants)",
            id,
            old.name(),
            next.name(),
            encounter.participants.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_rules::{Faction, Health, Name};

    fn fighter(world: &mut World, name: &str, x: i32, y: i32) -> EntityId {
        let e = world.create_entity();
        world.attach(e, Name::new(name)).unwrap();
        world.attach(e, Health::new(10)).unwrap();
        world.attach(e, Position::new(x, y, 0)).unwrap();
        e
    }

    fn kill(world: &mut World, e: EntityId) {
        world.get_mut::<Health>(e).unwrap().apply_damage(100);
    }

    #[test]
    fn test_engage_starts_active_encounter() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 1, 0);
        let mut tracker = CombatTracker::new();

        let id = tracker.engage(&mut world, a, b);
        let encounter = tracker.encounter(id).unwrap();
        assert_eq!(encounter.state, EncounterState::Active);
        assert!(encounter.locked);
        assert!(tracker.is_locked(a) && tracker.is_locked(b));

        let events = world.drain_events();
        assert_eq!(
            events,
            vec![GameEvent::CombatStarted {
                encounter: id,
                participants: vec![a, b],
            }]
        );

        // Re-engaging the same pair changes nothing.
        assert_eq!(tracker.engage(&mut world, b, a), id);
        assert!(world.drain_events().is_empty());
    }

    #[test]
    fn test_newcomer_joins_and_encounters_merge() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 1, 0);
        let c = fighter(&mut world, "C", 5, 5);
        let d = fighter(&mut world, "D", 6, 5);
        let e = fighter(&mut world, "E", 9, 9);
        let mut tracker = CombatTracker::new();

        let first = tracker.engage(&mut world, a, b);
        let second = tracker.engage(&mut world, c, d);
        assert_ne!(first, second);

        assert_eq!(tracker.engage(&mut world, e, c), second);
        assert_eq!(tracker.engage(&mut world, d, a), first);

        assert!(tracker.encounter(second).is_none());
        let merged = tracker.encounter(first).unwrap();
        assert_eq!(merged.participant_list(), vec![a, b, c, d, e]);
        assert_eq!(tracker.encounter_of(e).unwrap().id, first);
    }

    #[test]
    fn test_death_ends_encounter() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 1, 0);
        let mut tracker = CombatTracker::new();
        let id = tracker.engage(&mut world, a, b);
        world.drain_events();

        kill(&mut world, b);
        tracker.on_death(&mut world, b);

        let encounter = tracker.encounter(id).unwrap();
        assert_eq!(encounter.state, EncounterState::Ended);
        assert!(!encounter.locked);
        assert!(!tracker.in_combat(a));

        let events = world.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            GameEvent::message("The fight is over. A prevailed.")
        );
        assert_eq!(
            events[1],
            GameEvent::CombatEnded {
                encounter: id,
                participants: vec![a, b],
            }
        );

        assert_eq!(tracker.sweep_ended(), 1);
        assert!(tracker.encounter(id).is_none());
    }

    #[test]
    fn test_allies_left_standing_end_the_fight() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 1, 0);
        let c = fighter(&mut world, "C", 2, 0);
        world.attach(a, Faction(1)).unwrap();
        world.attach(c, Faction(1)).unwrap();
        let mut tracker = CombatTracker::new();
        let id = tracker.engage(&mut world, a, b);
        tracker.engage(&mut world, c, b);

        kill(&mut world, b);
        tracker.on_death(&mut world, b);
        assert!(tracker.encounter(id).unwrap().is_ended());
    }

    #[test]
    fn test_three_sides_keep_fighting() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 1, 0);
        let c = fighter(&mut world, "C", 2, 0);
        let mut tracker = CombatTracker::new();
        let id = tracker.engage(&mut world, a, b);
        tracker.engage(&mut world, c, b);

        kill(&mut world, b);
        tracker.on_death(&mut world, b);
        assert!(tracker.encounter(id).unwrap().is_active());
    }

    #[test]
    fn test_disengage_resolves() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 1, 0);
        let mut tracker = CombatTracker::new();
        let id = tracker.engage(&mut world, a, b);

        tracker.disengage(&mut world, b);
        let encounter = tracker.encounter(id).unwrap();
        assert!(encounter.is_ended());
        assert_eq!(encounter.participant_list(), vec![a]);
        assert!(!tracker.is_locked(a));
    }

    #[test]
    fn test_damage_pulls_in_outsider() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 1, 0);
        let c = fighter(&mut world, "C", 3, 0);
        let mut tracker = CombatTracker::new();

        // Damage between two outsiders does not start a fight on its own.
        tracker.on_damage(&mut world, b, Some(a));
        assert!(!tracker.in_combat(a));

        let id = tracker.engage(&mut world, a, b);
        tracker.on_damage(&mut world, c, Some(b));
        assert_eq!(tracker.encounter_of(c).unwrap().id, id);
    }

    #[test]
    fn test_lock_rule() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 5, 5);
        let b = fighter(&mut world, "B", 6, 5);
        let mut tracker = CombatTracker::new();

        // Unengaged entities move freely.
        assert!(tracker.move_allowed(&world, a, Point::new(5, 5), Point::new(3, 5), 1));

        tracker.engage(&mut world, a, b);
        let from = Point::new(5, 5);
        // Fleeing beyond reach is refused.
        assert!(!tracker.move_allowed(&world, a, from, Point::new(4, 5), 1));
        // Side-stepping while staying adjacent is fine.
        assert!(tracker.move_allowed(&world, a, from, Point::new(5, 4), 1));
        assert!(tracker.move_allowed(&world, a, from, Point::new(6, 6), 1));
        // A wider threshold allows backing off one cell.
        assert!(tracker.move_allowed(&world, a, from, Point::new(4, 5), 2));
    }

    #[test]
    fn test_distance_alone_never_ends_a_fight() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 1, 0);
        let mut tracker = CombatTracker::new();
        let id = tracker.engage(&mut world, a, b);

        world.attach(b, Position::new(9, 9, 0)).unwrap();
        tracker.resolve(&mut world, id);
        assert!(tracker.encounter(id).unwrap().is_active());
        assert!(tracker.is_locked(a));
    }

    #[test]
    fn test_lock_lets_distant_fighters_close_in() {
        let mut world = World::new();
        let a = fighter(&mut world, "A", 0, 0);
        let b = fighter(&mut world, "B", 5, 0);
        let mut tracker = CombatTracker::new();
        tracker.engage(&mut world, a, b);

        let from = Point::new(0, 0);
        assert!(tracker.move_allowed(&world, a, from, Point::new(1, 0), 1));
        assert!(tracker.move_allowed(&world, a, from, Point::new(0, 1), 1));
        assert!(!tracker.move_allowed(&world, a, from, Point::new(-1, 0), 1));
    }
}
