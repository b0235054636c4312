//! Field-of-view refresh.

use dungeon_rules::{Position, VisibleTiles, Vision};
use std::collections::BTreeSet;

use super::SystemContext;
use crate::fov::compute_fov;
use crate::world::ComponentKind;

/// Recompute the visible set of every living, vision-bearing entity on the
/// current level, and fold it into its seen set.
///
/// An observer that has not moved, on a map that has not changed, keeps its
/// cached set. Returns the number of entities recomputed.
pub fn refresh_fov(ctx: &mut SystemContext<'_>) -> usize {
    let mut recomputed = 0;

    for entity in ctx
        .world
        .entities_with(&[ComponentKind::Vision, ComponentKind::Position])
    {
        if !ctx.world.is_alive(entity) {
            continue;
        }
        let (Some(position), Some(vision)) = (
            ctx.world.get::<Position>(entity).copied(),
            ctx.world.get::<Vision>(entity).copied(),
        ) else {
            continue;
        };
        if !ctx.on_level(position) {
            continue;
        }

        let revision = ctx.map.revision();
        let fresh = ctx
            .world
            .get::<VisibleTiles>(entity)
            .map(|cache| {
                cache.origin == Some(position)
                    && cache.map_revision == revision
                    && cache.radius == vision.radius
            })
            .unwrap_or(false);
        if fresh {
            continue;
        }

        let visible: BTreeSet<Position> = compute_fov(ctx.map, position.point(), vision.radius)
            .into_iter()
            .map(|p| Position::at(p, position.z))
            .collect();

        let mut cache = ctx.world.detach::<VisibleTiles>(entity).unwrap_or_default();
        cache.seen.extend(visible.iter().copied());
        cache.visible = visible;
        cache.origin = Some(position);
        cache.map_revision = revision;
        cache.radius = vision.radius;
        if let Err(err) = ctx.world.attach(entity, cache) {
            tracing::warn!("Skipping FOV for {}: {}", entity, err);
            continue;
        }

        tracing::debug!("Entity {} recomputed FOV at {:?}", entity, position);
        recomputed += 1;
    }

    recomputed
}
