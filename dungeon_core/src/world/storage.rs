//! Type-indexed component columns.
//!
//! Every component type gets its own column, a `BTreeMap` keyed by entity.
//! The set of component types is closed: [`ComponentKind`] names each one and
//! the store matches on it exhaustively.

use dungeon_rules::{
    Ai, Armor, Blocker, EntityId, Equipment, Faction, Health, Inventory, Item, Name, Position,
    Spellbook, Stats, StatusEffects, VisibleTiles, Vision, Weapon,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A record type that can be attached to an entity.
pub trait Component: Clone + std::fmt::Debug + 'static {
    /// Which column this type lives in.
    const KIND: ComponentKind;

    fn column(store: &ComponentStore) -> &BTreeMap<EntityId, Self>;

    fn column_mut(store: &mut ComponentStore) -> &mut BTreeMap<EntityId, Self>;
}

macro_rules! component_store {
    ($($field:ident: $ty:ty => $kind:ident),* $(,)?) => {
        /// Names every component type the world can store.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ComponentKind {
            $($kind),*
        }

        /// One column per component type.
        #[derive(Debug, Clone, Default)]
        pub struct ComponentStore {
            $($field: BTreeMap<EntityId, $ty>),*
        }

        impl ComponentStore {
            /// Whether `entity` has a record of `kind`.
            pub fn contains(&self, entity: EntityId, kind: ComponentKind) -> bool {
                match kind {
                    $(ComponentKind::$kind => self.$field.contains_key(&entity)),*
                }
            }

            /// Number of records of `kind`.
            pub fn count(&self, kind: ComponentKind) -> usize {
                match kind {
                    $(ComponentKind::$kind => self.$field.len()),*
                }
            }

            /// Drop a record of `kind`, if present.
            pub fn remove_kind(&mut self, entity: EntityId, kind: ComponentKind) -> bool {
                match kind {
                    $(ComponentKind::$kind => self.$field.remove(&entity).is_some()),*
                }
            }

            /// Drop every record belonging to `entity`.
            pub fn remove_all(&mut self, entity: EntityId) {
                $(self.$field.remove(&entity);)*
            }
        }

        $(
            impl Component for $ty {
                const KIND: ComponentKind = ComponentKind::$kind;

                fn column(store: &ComponentStore) -> &BTreeMap<EntityId, Self> {
                    &store.$field
                }

                fn column_mut(store: &mut ComponentStore) -> &mut BTreeMap<EntityId, Self> {
                    &mut store.$field
                }
            }
        )*
    };
}

component_store! {
    positions: Position => Position,
    health: Health => Health,
    stats: Stats => Stats,
    blockers: Blocker => Blocker,
    weapons: Weapon => Weapon,
    armor: Armor => Armor,
    statuses: StatusEffects => Status,
    visions: Vision => Vision,
    visible: VisibleTiles => VisibleTiles,
    ai: Ai => Ai,
    inventories: Inventory => Inventory,
    equipment: Equipment => Equipment,
    spellbooks: Spellbook => Spellbook,
    items: Item => Item,
    names: Name => Name,
    factions: Faction => Faction,
}
