//! Item pickup after a completed move.

use dungeon_rules::{EntityId, Inventory, Point, Position};

use super::SystemContext;
use crate::error::SimError;
use crate::events::GameEvent;
use crate::world::ComponentKind;

pub const INVENTORY_FULL: &str = "Inventory full!";

/// Pick up every item lying at `at` while the mover's inventory has room.
///
/// Entities without an inventory pick up nothing. A picked item loses its
/// position and stays alive, owned by the inventory.
pub fn pick_up_items(
    ctx: &mut SystemContext<'_>,
    entity: EntityId,
    at: Point,
) -> Result<(), SimError> {
    let position = ctx.active_position(entity)?;
    if !ctx.world.has(entity, ComponentKind::Inventory) {
        return Ok(());
    }

    let here = Position::at(at, position.z);
    let items: Vec<EntityId> = ctx
        .world
        .entities_at(here)
        .into_iter()
        .filter(|&e| e != entity && ctx.world.has(e, ComponentKind::Item))
        .collect();

    for item in items {
        let full = ctx
            .world
            .get::<Inventory>(entity)
            .map(Inventory::is_full)
            .unwrap_or(true);
        if full {
            ctx.world.post(GameEvent::message(INVENTORY_FULL));
            break;
        }

        if let Some(inventory) = ctx.world.get_mut::<Inventory>(entity) {
            inventory.items.push(item);
        }
        ctx.world.detach::<Position>(item);

        let name = ctx.world.name_of(item);
        tracing::debug!("Entity {} picked up {}", entity, item);
        ctx.world.post(GameEvent::ItemPicked { entity, item });
        ctx.world.post(GameEvent::message(format!("Picked up {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;

    #[test]
    fn test_pickup_until_full() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 5, 1, 1);
        h.world.attach(a, Inventory::with_capacity(1)).unwrap();
        let potion = h.world.spawn_item("potion", Position::new(1, 1, 0));
        let scroll = h.world.spawn_item("scroll", Position::new(1, 1, 0));

        pick_up_items(&mut h.ctx(), a, Point::new(1, 1)).unwrap();

        assert_eq!(h.world.get::<Inventory>(a).unwrap().items, vec![potion]);
        assert!(h.world.get::<Position>(potion).is_none());
        assert!(h.world.get::<Position>(scroll).is_some());
        assert_eq!(
            h.world.drain_events(),
            vec![
                GameEvent::ItemPicked {
                    entity: a,
                    item: potion
                },
                GameEvent::message("Picked up potion"),
                GameEvent::message(INVENTORY_FULL),
            ]
        );
    }

    #[test]
    fn test_no_inventory_no_pickup() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 5, 1, 1);
        let potion = h.world.spawn_item("potion", Position::new(1, 1, 0));

        pick_up_items(&mut h.ctx(), a, Point::new(1, 1)).unwrap();
        assert!(h.world.get::<Position>(potion).is_some());
        assert!(h.world.drain_events().is_empty());
    }
}
