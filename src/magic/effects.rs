//! Spell effects in play.
//!
//! Spells that grant rules leave an [`ActiveSpellEffect`] on their target.
//! The modifier pipeline reads the granted rules from there. Effects end
//! according to their [`DurationClass`], when dispelled, or when their
//! caster or target is gone.

use serde::{Deserialize, Serialize};

use crate::army::{DurationClass, SpellEffectSpec, SpellId};
use crate::core::{CharacterId, EffectId, GameState, PlayerId, Result, UnitId};
use crate::explain::{Provenance, TraceEntry};
use crate::resolution::{resolve_attacks, AttackOutcome, AttackRequest, DiceSource};
use crate::rules::{RuleCatalog, RuleId};

use super::casting::PendingCast;

/// A spell effect on a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSpellEffect {
    pub id: EffectId,
    pub spell: SpellId,
    /// Unit the caster was in.
    pub caster_unit: UnitId,
    pub caster: CharacterId,
    pub owner: PlayerId,
    pub target: UnitId,
    pub duration: DurationClass,
    /// Casting total a later dispel must equal or beat.
    pub casting_total: i64,
    /// Round the spell was cast in.
    pub cast_round: u32,
}

impl ActiveSpellEffect {
    /// An effect from a resolved cast. The id is assigned when applied.
    #[must_use]
    pub fn from_cast(cast: &PendingCast, duration: DurationClass, round: u32) -> Self {
        Self {
            id: EffectId::new(0),
            spell: cast.spell.clone(),
            caster_unit: cast.unit,
            caster: cast.caster,
            owner: cast.owner,
            target: cast.target,
            duration,
            casting_total: cast.casting_total,
            cast_round: round,
        }
    }
}

/// Why an effect ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryReason {
    /// An instant effect's phase ended.
    PhaseEnded,
    /// The caster's next turn began.
    CasterTurnStarted,
    Dispelled,
    CasterGone,
    TargetGone,
}

impl std::fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExpiryReason::PhaseEnded => "phase ended",
            ExpiryReason::CasterTurnStarted => "caster's turn started",
            ExpiryReason::Dispelled => "dispelled",
            ExpiryReason::CasterGone => "caster gone",
            ExpiryReason::TargetGone => "target gone",
        };
        f.write_str(s)
    }
}

/// Points in the turn at which effects are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryCheck {
    /// A phase has ended.
    EndOfPhase,
    /// A player's turn is starting.
    TurnStart(PlayerId),
    /// Caster and target are re-checked; run at round start and after
    /// units are destroyed.
    Revalidate,
}

/// Effects that end at `check`, in effect id order.
#[must_use]
pub fn expired_effects(state: &GameState, check: ExpiryCheck) -> Vec<(EffectId, ExpiryReason)> {
    state
        .effects()
        .filter_map(|effect| expiry(state, effect, check).map(|reason| (effect.id, reason)))
        .collect()
}

fn expiry(state: &GameState, effect: &ActiveSpellEffect, check: ExpiryCheck) -> Option<ExpiryReason> {
    let target_gone = state.unit(effect.target).map_or(true, |u| !u.is_on_table());
    if target_gone {
        return Some(ExpiryReason::TargetGone);
    }
    match (check, effect.duration) {
        (ExpiryCheck::EndOfPhase, DurationClass::Instant) => Some(ExpiryReason::PhaseEnded),
        (ExpiryCheck::TurnStart(player), DurationClass::UntilCasterNextTurn) if player == effect.owner => {
            Some(ExpiryReason::CasterTurnStarted)
        }
        (ExpiryCheck::Revalidate, DurationClass::RemainsInPlay) => {
            let caster_alive = state
                .unit(effect.caster_unit)
                .ok()
                .filter(|u| u.is_on_table())
                .and_then(|u| u.character(effect.caster))
                .is_some_and(|c| c.is_alive());
            (!caster_alive).then_some(ExpiryReason::CasterGone)
        }
        _ => None,
    }
}

/// What a resolved spell did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellResolution {
    pub spell: SpellId,
    pub target: UnitId,
    /// Effect left on the target.
    pub effect: Option<EffectId>,
    /// Damage to be applied by the caller.
    pub damage: Option<AttackOutcome>,
    /// Wounds restored.
    pub healed: u32,
    /// Rules granted, for the trace.
    pub granted: Vec<RuleId>,
}

impl Provenance for SpellResolution {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.damage.provenance(out);
    }
}

/// Apply a cast that was not dispelled.
///
/// Rules-granting spells get an effect on the target, heals are applied
/// at once, and damage is rolled but left to the caller to apply.
pub fn resolve_spell(
    state: &mut GameState,
    catalog: &RuleCatalog,
    cast: &PendingCast,
    dice: &mut dyn DiceSource,
) -> Result<SpellResolution> {
    let spell = catalog.spell(&cast.spell)?;
    let mut resolution = SpellResolution {
        spell: spell.id.clone(),
        target: cast.target,
        effect: None,
        damage: None,
        healed: 0,
        granted: Vec::new(),
    };

    match &spell.effect {
        SpellEffectSpec::DirectDamage {
            hits,
            strength,
            armour_penetration,
        } => {
            let request = AttackRequest::hits(cast.unit, cast.target, u32::from(*hits), *strength, *armour_penetration)
                .by_character(cast.caster)
                .tagged(spell.id.0.clone());
            resolution.damage = Some(resolve_attacks(state, catalog, &request, dice)?);
        }
        SpellEffectSpec::Augment { rules } | SpellEffectSpec::Hex { rules } => {
            let effect = ActiveSpellEffect::from_cast(cast, spell.duration, state.round());
            resolution.effect = Some(state.apply_spell_effect(effect));
            resolution.granted = rules.clone();
        }
        SpellEffectSpec::Heal { wounds } => {
            resolution.healed = state.unit_mut(cast.target)?.heal(u32::from(*wounds));
        }
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic::tests_support::{catalog, setup};
    use crate::resolution::ScriptedDice;

    fn pending(state: &GameState, spell: &str, target: UnitId) -> PendingCast {
        let (unit, wizard) = state
            .live_units_of(PlayerId::A)
            .find_map(|u| u.living_characters().next().map(|c| (u.id, c.id)))
            .unwrap();
        PendingCast {
            unit,
            caster: wizard,
            owner: PlayerId::A,
            spell: SpellId::new(spell),
            target,
            casting_total: 9,
            irresistible: false,
        }
    }

    #[test]
    fn test_augment_creates_effect() {
        let (mut state, caster, _, _) = setup();
        let cast = pending(&state, "iron_skin", caster);
        let mut dice = ScriptedDice::new(Vec::new());
        let resolution = resolve_spell(&mut state, &catalog(), &cast, &mut dice).unwrap();
        let id = resolution.effect.unwrap();
        let effect = state.effect(id).unwrap();
        assert_eq!(effect.target, caster);
        assert_eq!(effect.duration, DurationClass::RemainsInPlay);
        assert_eq!(state.effects_on(caster).count(), 1);
    }

    #[test]
    fn test_direct_damage_is_not_applied() {
        let (mut state, _, _, target) = setup();
        let cast = pending(&state, "fireball", target);
        let before = state.unit(target).unwrap().models;
        // 2 hits at S4 vs T3: wound on 3+, no armour.
        let mut dice = ScriptedDice::new(vec![5, 4]);
        let resolution = resolve_spell(&mut state, &catalog(), &cast, &mut dice).unwrap();
        assert_eq!(resolution.damage.unwrap().wounds, 2);
        assert_eq!(state.unit(target).unwrap().models, before);
        assert_eq!(state.effects().count(), 0);
    }

    #[test]
    fn test_expiry_checks() {
        let (mut state, caster, _, target) = setup();
        let rip = pending(&state, "iron_skin", caster);
        let mut dice = ScriptedDice::new(Vec::new());
        let rip_id = resolve_spell(&mut state, &catalog(), &rip, &mut dice).unwrap().effect.unwrap();
        let hex = pending(&state, "curse", target);
        let hex_id = resolve_spell(&mut state, &catalog(), &hex, &mut dice).unwrap().effect.unwrap();

        assert!(expired_effects(&state, ExpiryCheck::Revalidate).is_empty());
        assert!(expired_effects(&state, ExpiryCheck::TurnStart(PlayerId::B)).is_empty());
        assert_eq!(
            expired_effects(&state, ExpiryCheck::TurnStart(PlayerId::A)),
            vec![(hex_id, ExpiryReason::CasterTurnStarted)]
        );

        let wizard = rip.caster;
        state
            .unit_mut(caster)
            .unwrap()
            .character_mut(wizard)
            .unwrap()
            .take_wounds(10);
        assert_eq!(
            expired_effects(&state, ExpiryCheck::Revalidate),
            vec![(rip_id, ExpiryReason::CasterGone)]
        );
    }
}
