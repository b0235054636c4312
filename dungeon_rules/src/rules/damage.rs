//! Damage rolls and mitigation.

use crate::dice::DiceExpr;
use crate::entities::Armor;
use crate::mechanics::DamageType;
use crate::rng::RollSource;

/// Roll weapon or spell damage.
///
/// The dice are rolled and, on a crit, multiplied by `crit_multiplier`
/// (never below 1) and rounded down. The expression's flat constants and
/// `attribute_modifier` are added afterwards and are never multiplied.
/// Attribute terms inside `dice` are not resolved here; callers fold them
/// into `attribute_modifier`.
pub fn roll_damage<R: RollSource + ?Sized>(
    dice: &DiceExpr,
    attribute_modifier: i32,
    is_crit: bool,
    crit_multiplier: f32,
    rng: &mut R,
) -> i32 {
    let dice_total = dice.roll_dice(rng);
    let dice_part = if is_crit {
        (f64::from(dice_total) * f64::from(crit_multiplier.max(1.0))).floor() as i32
    } else {
        dice_total
    };
    (dice_part + dice.flat() + attribute_modifier).max(0)
}

/// Reduce `amount` by a resistance percentage, rounding down.
pub fn scale_by_resistance(amount: i32, percent: u8) -> i32 {
    let kept = 100 - i32::from(percent.min(100));
    amount.max(0) * kept / 100
}

/// Apply armor to incoming damage.
///
/// Physical, non-spell damage is first reduced by a soak roll, then by the
/// type's resistance. Spell damage skips soak and applies spell resistance,
/// then resistance. Other damage types only meet resistance. The result is
/// never negative.
pub fn apply_mitigation<R: RollSource + ?Sized>(
    raw_damage: i32,
    damage_type: DamageType,
    armor: Option<&Armor>,
    is_spell: bool,
    rng: &mut R,
) -> i32 {
    let raw = raw_damage.max(0);
    let Some(armor) = armor else {
        return raw;
    };

    if is_spell {
        let after_spell = scale_by_resistance(raw, armor.spell_resistance(damage_type));
        return scale_by_resistance(after_spell, armor.resistance(damage_type));
    }

    let after_soak = if damage_type.is_physical() {
        let soak = armor
            .soak
            .as_ref()
            .map(|expr| expr.roll(rng, |_| 0))
            .unwrap_or(0);
        (raw - soak).max(0)
    } else {
        raw
    };
    scale_by_resistance(after_soak, armor.resistance(damage_type))
}
