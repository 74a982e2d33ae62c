//! Casting, dispelling and lasting effects.

use tracing::debug;

use crate::army::{CasualtyReport, DurationClass, SpellId};
use crate::core::{ActionKind, CharacterId, EffectId, PlayerId, Result, RulesError, UnitId};
use crate::lifecycle::{ActionScope, CaseManager, StatusTrigger};
use crate::magic::{attempt_dispel, cast_spell, resolve_spell, CastRequest, ExpiryCheck, ExpiryReason, PendingCast};

use super::casualty_panic;
use crate::sequencer::outcome::{OutcomeDetail, SpellEffectOutcome};

#[allow(clippy::too_many_arguments)]
pub(super) fn cast(
    manager: &CaseManager,
    scope: &mut ActionScope<'_>,
    player: PlayerId,
    caster: CharacterId,
    spell: &SpellId,
    target: UnitId,
    dice: u8,
) -> Result<OutcomeDetail> {
    let (unit, _) = scope.state.character(caster)?;
    if unit.owner != player {
        return Err(RulesError::InvalidAction(format!("{} belongs to {}", caster, unit.owner)));
    }
    let unit = unit.id;
    let phase = scope.state.phase();
    if scope.catalog.spell(spell)?.category.phase() != phase {
        return Err(RulesError::IllegalPhaseAction {
            action: ActionKind::CastSpell,
            phase,
        });
    }

    let request = CastRequest::new(unit, caster, spell.0.clone(), target, dice);
    let outcome = cast_spell(scope.state, scope.catalog, &request, scope.dice)?;
    let outcome = scope.observe(outcome);
    scope.state.pools_mut().spend_casting(player, dice)?;
    debug!(%caster, %spell, total = outcome.casting_total, result = ?outcome.result, "casting attempt");

    let mut miscast_casualties = None;
    if let Some(miscast) = &outcome.miscast {
        if miscast.caster_wounds > 0 {
            miscast_casualties = Some(wound_caster(manager, scope, unit, caster, miscast.caster_wounds)?);
        }
        if miscast.pool_lost {
            scope.state.pools_mut().drain_casting(player);
        }
    }

    let mut effect = None;
    if let Some(pending) = outcome.pending.clone() {
        let caster_standing = scope
            .state
            .character(caster)
            .is_ok_and(|(u, c)| u.is_on_table() && c.is_alive());
        if !caster_standing {
            debug!(%caster, %spell, "caster fell to the miscast; spell lost");
        } else if pending.irresistible || scope.state.pools().dispel[player.opponent()] == 0 {
            effect = Some(apply_cast(manager, scope, &pending)?);
        } else {
            scope.state.set_pending_cast(Some(pending));
        }
    }

    Ok(OutcomeDetail::Cast {
        cast: outcome,
        effect,
        miscast_casualties,
    })
}

/// Wounds a miscast deals to its caster.
fn wound_caster(
    manager: &CaseManager,
    scope: &mut ActionScope<'_>,
    unit: UnitId,
    caster: CharacterId,
    wounds: u32,
) -> Result<CasualtyReport> {
    let u = scope.state.unit_mut(unit)?;
    let character = u
        .character_mut(caster)
        .ok_or(RulesError::UnknownCharacter(caster))?;
    let absorbed = character.take_wounds(wounds);
    let slain = !character.is_alive();
    let wiped_out = u.is_wiped_out();

    if wiped_out {
        manager.apply_trigger(scope, unit, StatusTrigger::WoundsExhausted)?;
    }
    if slain {
        manager.expire_effects(scope, ExpiryCheck::Revalidate)?;
    }
    Ok(CasualtyReport {
        unit: Some(unit),
        wounds: absorbed,
        models_removed: 0,
        characters_slain: if slain { vec![caster] } else { Vec::new() },
    })
}

/// Put a cast that was not dispelled into effect.
fn apply_cast(manager: &CaseManager, scope: &mut ActionScope<'_>, cast: &PendingCast) -> Result<SpellEffectOutcome> {
    let resolution = resolve_spell(scope.state, scope.catalog, cast, scope.dice)?;
    let resolution = scope.observe(resolution);
    let mut casualties = None;
    let mut panic = None;
    if let Some(damage) = &resolution.damage {
        casualties = Some(manager.apply_casualties(scope, cast.target, damage.wounds)?);
        panic = casualty_panic(manager, scope, cast.target)?;
    }
    debug!(spell = %cast.spell, target = %cast.target, effect = ?resolution.effect, "spell resolved");
    Ok(SpellEffectOutcome {
        resolution,
        casualties,
        panic,
    })
}

pub(super) fn dispel(manager: &CaseManager, scope: &mut ActionScope<'_>, player: PlayerId, dice: u8) -> Result<OutcomeDetail> {
    let Some(pending) = scope.state.pending_cast().cloned() else {
        return Err(RulesError::InvalidAction("no spell is waiting to be dispelled".to_string()));
    };
    if pending.owner == player {
        return Err(RulesError::InvalidAction(format!("{} cannot dispel its own spell", player)));
    }
    let attempt = attempt_dispel(scope.state, scope.catalog, player, dice, pending.casting_total, scope.dice)?;
    let attempt = scope.observe(attempt);
    scope.state.pools_mut().spend_dispel(player, dice)?;
    scope.state.take_pending_cast();
    debug!(spell = %pending.spell, total = attempt.dispel_total, dispelled = attempt.dispelled, "dispel attempt");

    let effect = if attempt.dispelled {
        None
    } else {
        Some(apply_cast(manager, scope, &pending)?)
    };
    Ok(OutcomeDetail::Dispel { attempt, effect })
}

pub(super) fn allow(manager: &CaseManager, scope: &mut ActionScope<'_>) -> Result<OutcomeDetail> {
    let pending = scope
        .state
        .take_pending_cast()
        .ok_or_else(|| RulesError::InvalidAction("no spell is waiting to be dispelled".to_string()))?;
    Ok(OutcomeDetail::SpellAllowed(apply_cast(manager, scope, &pending)?))
}

pub(super) fn dispel_effect(
    manager: &CaseManager,
    scope: &mut ActionScope<'_>,
    player: PlayerId,
    effect: EffectId,
    dice: u8,
) -> Result<OutcomeDetail> {
    let active = scope.state.effect(effect)?;
    if active.owner == player {
        return Err(RulesError::InvalidAction(format!("{} cannot dispel its own {}", player, effect)));
    }
    if active.duration != DurationClass::RemainsInPlay {
        return Err(RulesError::InvalidAction(format!("{} does not remain in play", effect)));
    }
    let against = active.casting_total;
    let attempt = attempt_dispel(scope.state, scope.catalog, player, dice, against, scope.dice)?;
    let attempt = scope.observe(attempt);
    scope.state.pools_mut().spend_dispel(player, dice)?;
    if attempt.dispelled {
        manager.end_effect(scope, effect, ExpiryReason::Dispelled)?;
    }
    Ok(OutcomeDetail::EffectDispel { effect, attempt })
}
