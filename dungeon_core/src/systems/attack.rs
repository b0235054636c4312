//! Attack resolution: to-hit, damage, mitigation, death.

use dungeon_rules::{
    apply_mitigation, roll_damage, roll_to_hit, Armor, DamageType, EntityId, Health, Position,
    Stats, Weapon,
};

use super::SystemContext;
use crate::error::SimError;
use crate::events::GameEvent;
use crate::world::ComponentKind;

/// Whether `target` stands on the attacker's level within its weapon's
/// reach. Unarmed attackers reach one cell.
pub fn in_reach(ctx: &SystemContext<'_>, attacker: EntityId, target: EntityId) -> bool {
    let reach = ctx.world.get::<Weapon>(attacker).map(|w| w.reach).unwrap_or(1) as i32;
    match (
        ctx.world.get::<Position>(attacker),
        ctx.world.get::<Position>(target),
    ) {
        (Some(from), Some(to)) => from.z == to.z && from.point().chebyshev(to.point()) <= reach,
        _ => false,
    }
}

/// Resolve `attacker` striking `target`.
///
/// The target is re-checked first: an attack on something that died or
/// left earlier in the same drain does nothing. Attackers without a weapon
/// use the configured unarmed damage.
///
/// Posts, in order: `DamageApplied` and a message on a hit (or only a
/// message on a miss), then `EntityDied` and a message if the hit killed.
pub fn resolve_attack(
    ctx: &mut SystemContext<'_>,
    attacker: EntityId,
    target: EntityId,
) -> Result<(), SimError> {
    ctx.active_position(attacker)?;
    if !ctx.world.is_alive(target) {
        tracing::debug!("Attack on {} dropped: target is gone", target);
        return Ok(());
    }
    if !ctx.world.has(target, ComponentKind::Health) {
        return Err(SimError::MissingComponent {
            entity: target,
            component: ComponentKind::Health,
        });
    }
    let stats = ctx
        .world
        .get::<Stats>(attacker)
        .cloned()
        .ok_or(SimError::MissingComponent {
            entity: attacker,
            component: ComponentKind::Stats,
        })?;

    let weapon = ctx
        .world
        .get::<Weapon>(attacker)
        .cloned()
        .unwrap_or_else(|| {
            Weapon::melee(ctx.config.combat.unarmed_damage.clone(), DamageType::Physical)
        });

    if !in_reach(ctx, attacker, target) {
        tracing::debug!("Entity {} cannot reach {}", attacker, target);
        return Ok(());
    }

    let evasion = ctx
        .world
        .get::<Stats>(target)
        .map(Stats::defense_bonus)
        .unwrap_or(0);
    let attacker_name = ctx.world.name_of(attacker);
    let target_name = ctx.world.name_of(target);

    let roll = roll_to_hit(stats.hit_bonus(), evasion, stats.crit_chance, &mut *ctx.rng);
    if !roll.outcome.landed() {
        tracing::debug!(
            "Entity {} missed {} (d20 {} vs {})",
            attacker,
            target,
            roll.die,
            roll.defense
        );
        ctx.world
            .post(GameEvent::message(format!("{attacker_name} misses {target_name}.")));
        return Ok(());
    }

    let modifier = weapon.damage.attribute_bonus(|attr| stats.modifier(attr));
    let raw = roll_damage(
        &weapon.damage,
        modifier,
        roll.outcome.is_crit(),
        stats.crit_multiplier,
        &mut *ctx.rng,
    );
    let armor: Option<Armor> = ctx.world.get::<Armor>(target).cloned();
    let amount = apply_mitigation(raw, weapon.damage_type, armor.as_ref(), false, &mut *ctx.rng);

    let killed = match ctx.world.get_mut::<Health>(target) {
        Some(health) => health.apply_damage(amount),
        None => false,
    };

    ctx.world.post(GameEvent::DamageApplied {
        target,
        amount,
        damage_type: weapon.damage_type,
        source: Some(attacker),
    });
    let crit = if roll.outcome.is_crit() {
        " (Critical Hit!)"
    } else {
        ""
    };
    ctx.world.post(GameEvent::message(format!(
        "{attacker_name} hits {target_name} for {amount} {} damage{crit}.",
        weapon.damage_type.label()
    )));

    if killed {
        tracing::info!("Entity {} killed {}", attacker, target);
        ctx.world.post(GameEvent::EntityDied {
            entity: target,
            killer: Some(attacker),
        });
        ctx.world
            .post(GameEvent::message(format!("{target_name} is defeated!")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use dungeon_rules::{DiceExpr, ScriptedRolls};
    use std::collections::BTreeMap;

    fn armed(h: &mut Harness, e: EntityId, dice: &str) {
        let weapon = Weapon::melee(DiceExpr::parse(dice).unwrap(), DamageType::Physical);
        h.world.attach(e, weapon).unwrap();
    }

    fn set_stats(h: &mut Harness, e: EntityId, accuracy: u32, evasion: u32) {
        let stats = h.world.get_mut::<Stats>(e).unwrap();
        stats.accuracy = accuracy;
        stats.evasion = evasion;
    }

    #[test]
    fn test_hit_applies_damage_then_message() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 10, 1, 1);
        let b = h.spawn("B", 10, 2, 1);
        set_stats(&mut h, a, 5, 0);
        set_stats(&mut h, b, 0, 2);
        armed(&mut h, a, "1d6+2");
        h.rng = ScriptedRolls::new([15, 99, 4]);

        resolve_attack(&mut h.ctx(), a, b).unwrap();

        assert_eq!(h.world.get::<Health>(b).unwrap().hp, 4);
        let events = h.world.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            GameEvent::DamageApplied {
                target: b,
                amount: 6,
                damage_type: DamageType::Physical,
                source: Some(a),
            }
        );
        assert_eq!(
            events[1],
            GameEvent::message("A hits B for 6 physical damage.")
        );
    }

    #[test]
    fn test_miss_posts_only_message() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 10, 1, 1);
        let b = h.spawn("B", 10, 2, 1);
        h.rng = ScriptedRolls::new([1]);

        resolve_attack(&mut h.ctx(), a, b).unwrap();
        assert_eq!(h.world.get::<Health>(b).unwrap().hp, 10);
        assert_eq!(
            h.world.drain_events(),
            vec![GameEvent::message("A misses B.")]
        );
    }

    #[test]
    fn test_killing_blow() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 10, 1, 1);
        let b = h.spawn("B", 3, 2, 1);
        armed(&mut h, a, "1d6+2");
        h.rng = ScriptedRolls::new([20, 99, 6]);

        resolve_attack(&mut h.ctx(), a, b).unwrap();

        let health = h.world.get::<Health>(b).unwrap();
        assert!(health.dead);
        assert_eq!(health.hp, 0);

        let events = h.world.drain_events();
        let kinds: Vec<_> = events.iter().map(GameEvent::kind).collect();
        assert_eq!(
            kinds,
            vec!["damage_applied", "message", "entity_died", "message"]
        );
        assert_eq!(
            events[2],
            GameEvent::EntityDied {
                entity: b,
                killer: Some(a)
            }
        );
    }

    #[test]
    fn test_crit_message_and_multiplier() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 10, 1, 1);
        let b = h.spawn("B", 30, 2, 1);
        armed(&mut h, a, "1d6");
        h.rng = ScriptedRolls::new([12, 0, 5]);

        resolve_attack(&mut h.ctx(), a, b).unwrap();
        assert_eq!(h.world.get::<Health>(b).unwrap().hp, 20);
        let events = h.world.drain_events();
        assert_eq!(
            events[1],
            GameEvent::message("A hits B for 10 physical damage (Critical Hit!).")
        );
    }

    #[test]
    fn test_unarmed_uses_strength() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 10, 1, 1);
        let b = h.spawn("B", 10, 2, 1);
        h.world.get_mut::<Stats>(a).unwrap().strength = 14;
        h.rng = ScriptedRolls::new([15, 99, 3]);

        resolve_attack(&mut h.ctx(), a, b).unwrap();
        // 1d4 rolled 3, STR 14 gives +2.
        assert_eq!(h.world.get::<Health>(b).unwrap().hp, 5);
    }

    #[test]
    fn test_armor_soaks_physical() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 10, 1, 1);
        let b = h.spawn("B", 10, 2, 1);
        armed(&mut h, a, "1d6+2");
        h.world
            .attach(
                b,
                Armor {
                    soak: Some(DiceExpr::parse("1d2").unwrap()),
                    resist: BTreeMap::new(),
                    spell_resist: BTreeMap::new(),
                },
            )
            .unwrap();
        h.rng = ScriptedRolls::new([15, 99, 4, 2]);

        resolve_attack(&mut h.ctx(), a, b).unwrap();
        assert_eq!(h.world.get::<Health>(b).unwrap().hp, 6);
    }

    #[test]
    fn test_stale_target_is_ignored() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 10, 1, 1);
        let b = h.spawn("B", 10, 2, 1);
        h.world.get_mut::<Health>(b).unwrap().apply_damage(10);

        resolve_attack(&mut h.ctx(), a, b).unwrap();
        assert!(h.world.drain_events().is_empty());

        h.world.destroy_entity(b).unwrap();
        resolve_attack(&mut h.ctx(), a, b).unwrap();
        assert!(h.world.drain_events().is_empty());
    }

    #[test]
    fn test_out_of_reach() {
        let mut h = Harness::open(5, 5);
        let a = h.spawn("A", 10, 0, 0);
        let b = h.spawn("B", 10, 3, 0);
        h.rng = ScriptedRolls::new([20, 99, 4]);

        resolve_attack(&mut h.ctx(), a, b).unwrap();
        assert_eq!(h.rng.remaining(), 3);
        assert!(h.world.drain_events().is_empty());
    }
}
