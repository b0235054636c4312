//! The component store ("World").
//!
//! Owns entity identity, every component record and the event queue.
//! Systems borrow records for the duration of one call; nothing holds a
//! reference across phases.

mod storage;

pub use storage::*;

use dungeon_rules::{
    ActorTemplate, Ai, Armor, Blocker, EntityId, Faction, Health, Inventory, Item, Name, Position,
    Stats, Vision, Weapon,
};
use std::collections::BTreeSet;

use crate::error::WorldError;
use crate::events::{EventQueue, GameEvent};

/// Entity and component storage plus the turn's event queue.
#[derive(Debug, Clone)]
pub struct World {
    /// Next id to hand out. Only ever increases.
    next_id: u64,
    alive: BTreeSet<EntityId>,
    components: ComponentStore,
    events: EventQueue,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            alive: BTreeSet::new(),
            components: ComponentStore::default(),
            events: EventQueue::new(),
        }
    }

    /// Allocate a fresh identifier. Identifiers are never reused.
    pub fn create_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.alive.insert(id);
        id
    }

    /// Whether `entity` was created and not destroyed.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    /// Remove the entity and all its components. The id stays retired.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<(), WorldError> {
        if !self.alive.remove(&entity) {
            return Err(WorldError::UnknownEntity(entity));
        }
        self.components.remove_all(entity);
        Ok(())
    }

    /// Store `component`, replacing any record of the same type.
    ///
    /// Returns the replaced record.
    pub fn attach<T: Component>(
        &mut self,
        entity: EntityId,
        component: T,
    ) -> Result<Option<T>, WorldError> {
        if !self.contains(entity) {
            return Err(WorldError::UnknownEntity(entity));
        }
        Ok(T::column_mut(&mut self.components).insert(entity, component))
    }

    /// Remove and return the record of type `T`, if any.
    pub fn detach<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        T::column_mut(&mut self.components).remove(&entity)
    }

    /// The record of type `T`, or `None` when absent. Never fails.
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        T::column(&self.components).get(&entity)
    }

    /// Exclusive access to the record of type `T`.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        T::column_mut(&mut self.components).get_mut(&entity)
    }

    /// Whether `entity` has a record of `kind`.
    pub fn has(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.components.contains(entity, kind)
    }

    /// Every entity that has all of `kinds`, in ascending id order.
    ///
    /// An empty `kinds` lists every live entity.
    pub fn entities_with(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        self.alive
            .iter()
            .copied()
            .filter(|&id| kinds.iter().all(|&kind| self.components.contains(id, kind)))
            .collect()
    }

    /// Append an event to the queue.
    pub fn post(&mut self, event: GameEvent) {
        self.events.post(event);
    }

    /// Take every queued event in post order, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Number of events waiting to be drained.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Discard every queued event.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Live entity that exists and is not dead. Entities without health
    /// count as alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.contains(entity)
            && self
                .get::<Health>(entity)
                .map(Health::is_alive)
                .unwrap_or(true)
    }

    /// Entities standing at `position`, in ascending id order.
    pub fn entities_at(&self, position: Position) -> Vec<EntityId> {
        self.entities_with(&[ComponentKind::Position])
            .into_iter()
            .filter(|&id| self.get::<Position>(id) == Some(&position))
            .collect()
    }

    /// Whether an impassable blocker other than `ignore` occupies `position`.
    pub fn is_blocked(&self, position: Position, ignore: Option<EntityId>) -> bool {
        self.entities_at(position).into_iter().any(|id| {
            Some(id) != ignore
                && self
                    .get::<Blocker>(id)
                    .map(|b| !b.passable)
                    .unwrap_or(false)
        })
    }

    /// Display name for messages.
    pub fn name_of(&self, entity: EntityId) -> String {
        self.get::<Name>(entity)
            .map(|n| n.0.clone())
            .unwrap_or_else(|| format!("entity {entity}"))
    }

    /// The combat side of an entity: its faction, or itself.
    pub fn side_of(&self, entity: EntityId) -> Side {
        match self.get::<Faction>(entity) {
            Some(faction) => Side::Faction(*faction),
            None => Side::Solo(entity),
        }
    }

    /// Create an entity from a template at `position`.
    pub fn spawn_actor(&mut self, template: &ActorTemplate, position: Position) -> EntityId {
        let id = self.create_entity();
        let components = &mut self.components;
        Position::column_mut(components).insert(id, position);
        Name::column_mut(components).insert(id, Name::new(template.name.clone()));
        Health::column_mut(components).insert(id, template.health());
        Stats::column_mut(components).insert(id, template.stats.clone());
        if template.blocks {
            Blocker::column_mut(components).insert(id, Blocker::solid());
        }
        if let Some(weapon) = &template.weapon {
            Weapon::column_mut(components).insert(id, weapon.clone());
        }
        if let Some(armor) = &template.armor {
            Armor::column_mut(components).insert(id, armor.clone());
        }
        if let Some(vision) = template.vision {
            Vision::column_mut(components).insert(id, vision);
        }
        if let Some(ai) = &template.ai {
            Ai::column_mut(components).insert(id, ai.clone());
        }
        if let Some(faction) = template.faction {
            Faction::column_mut(components).insert(id, faction);
        }
        if template.inventory_capacity > 0 {
            Inventory::column_mut(components)
                .insert(id, Inventory::with_capacity(template.inventory_capacity));
        }
        id
    }

    /// Create a pickable item lying at `position`.
    pub fn spawn_item(&mut self, name: &str, position: Position) -> EntityId {
        let id = self.create_entity();
        let components = &mut self.components;
        Item::column_mut(components).insert(id, Item);
        Name::column_mut(components).insert(id, Name::new(name));
        Position::column_mut(components).insert(id, position);
        id
    }
}

/// Which side an entity fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Faction(Faction),
    /// No faction: the entity is a side of its own.
    Solo(EntityId),
}
