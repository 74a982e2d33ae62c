//! Spell Casting & Dispel Subsystem.
//!
//! Winds of magic fill the pools at the start of each turn; wizards spend
//! casting dice on spells, the opponent spends dispel dice against them,
//! and spells that survive become effects, damage or healing.
//!
//! ## Key Types
//!
//! - `MagicPools`: casting and dispel dice per player
//! - `PendingCast`: a successful cast awaiting a dispel attempt
//! - `ActiveSpellEffect`: rules granted to a unit until the effect expires

pub mod casting;
pub mod dispel;
pub mod effects;
pub mod pools;

pub use casting::{cast_spell, roll_miscast, validate_cast, CastOutcome, CastRequest, CastResult, Miscast, PendingCast};
pub use dispel::{attempt_dispel, DispelOutcome};
pub use effects::{
    expired_effects, resolve_spell, ActiveSpellEffect, ExpiryCheck, ExpiryReason, SpellResolution,
};
pub use pools::{roll_winds, MagicPools, WindsOfMagic};

#[cfg(test)]
pub(crate) mod tests_support {
    use glam::Vec2;

    use crate::army::{
        Character, DurationClass, Profile, Spell, SpellCategory, SpellEffectSpec, TroopType, Unit,
    };
    use crate::core::{CharacterId, GameState, PlayerId, UnitId};
    use crate::explain::Citation;
    use crate::rules::{RuleCatalog, RuleId, RuleScope, SpecialRule, TestCategory};
    use crate::tables::facts;

    pub fn catalog() -> RuleCatalog {
        let cite = |page| Citation::new("Lore of Fire", page);
        RuleCatalog::builder()
            .rule(
                SpecialRule::new("iron_skin", "Iron Skin", RuleScope::SpellEffect, cite(3))
                    .applies_to(TestCategory::ArmourSave)
                    .add(facts::ARMOUR, -1),
            )
            .rule(
                SpecialRule::new("curse", "Curse", RuleScope::SpellEffect, cite(4))
                    .applies_to(TestCategory::ToHitMelee)
                    .add(facts::TO_HIT_BONUS, -1),
            )
            .spell(Spell::new(
                "fireball",
                "Fireball",
                "Fire",
                7,
                SpellCategory::MagicMissile,
                24.0,
                SpellEffectSpec::DirectDamage {
                    hits: 2,
                    strength: 4,
                    armour_penetration: 0,
                },
                cite(2),
            ))
            .spell(
                Spell::new(
                    "iron_skin",
                    "Iron Skin",
                    "Fire",
                    6,
                    SpellCategory::Enchantment,
                    12.0,
                    SpellEffectSpec::Augment {
                        rules: vec![RuleId::new("iron_skin")],
                    },
                    cite(3),
                )
                .lasting(DurationClass::RemainsInPlay),
            )
            .spell(
                Spell::new(
                    "curse",
                    "Curse",
                    "Fire",
                    6,
                    SpellCategory::Hex,
                    24.0,
                    SpellEffectSpec::Hex {
                        rules: vec![RuleId::new("curse")],
                    },
                    cite(4),
                )
                .lasting(DurationClass::UntilCasterNextTurn),
            )
            .build()
            .unwrap()
    }

    fn guard(owner: PlayerId, x: f32, wizard: Character) -> Unit {
        let mut u = Unit::new(
            UnitId::new(0),
            "Guard",
            owner,
            TroopType::Infantry,
            Profile::line([4, 3, 3, 3, 3, 1, 3, 1, 7]),
            10,
            5,
        )
        .with_character(wizard);
        u.position = Vec2::new(x, 0.0);
        u.placed = true;
        u
    }

    /// Side A: a level 2 wizard at the origin with 5 casting dice.
    /// Side B: a level 1 wizard 10 inches away with 4 dispel dice.
    ///
    /// Returns (caster unit, wizard, target unit).
    pub fn setup() -> (GameState, UnitId, CharacterId, UnitId) {
        let profile = Profile::line([4, 3, 3, 3, 3, 2, 3, 1, 7]);
        let mut state = GameState::new(PlayerId::A);
        let a = state
            .add_unit(guard(
                PlayerId::A,
                0.0,
                Character::new(CharacterId::new(0), "Pyromancer", profile).wizard(2, ["fireball", "iron_skin", "curse"]),
            ))
            .unwrap();
        let b = state
            .add_unit(guard(
                PlayerId::B,
                10.0,
                Character::new(CharacterId::new(0), "Hedge Wizard", profile).wizard(1, ["fireball"]),
            ))
            .unwrap();
        state.pools_mut().casting[PlayerId::A] = 5;
        state.pools_mut().dispel[PlayerId::B] = 4;
        let wizard = state.unit(a).unwrap().characters[0].id;
        (state, a, wizard, b)
    }
}
