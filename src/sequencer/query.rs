//! Read-only queries: legality, targets and modifier previews.
//!
//! Queries never touch the committed state. Legality is decided by
//! running the action on a throwaway copy with no dice: a request that
//! only fails for want of dice got past every rules check.

use serde::{Deserialize, Serialize};

use crate::army::SpellId;
use crate::core::{Action, ActionKind, ActionRequest, CharacterId, GameState, PlayerId, Reaction, Result, RulesError, UnitId};
use crate::explain::ExplanationRecorder;
use crate::lifecycle::UnitStatus;
use crate::modifiers::{resolve_modifiers, ModifierContext, ResolvedFacts};
use crate::resolution::{charge_distance, charge_range, validate_target, ScriptedDice};
use crate::rules::RuleCatalog;

use super::engine::{gate_violations, Sequencer};
use super::outcome::ActionError;

/// Whether a request would be accepted, and why not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCheck {
    pub allowed: bool,
    /// Reason codes; empty when allowed.
    pub reasons: Vec<ActionError>,
}

/// Check a request without committing anything.
pub fn check_action(sequencer: &Sequencer, state: &GameState, request: &ActionRequest) -> ActionCheck {
    let mut reasons: Vec<ActionError> = gate_violations(state, request).iter().map(ActionError::from).collect();
    if reasons.is_empty() {
        let mut dice = ScriptedDice::default();
        let mut recorder = ExplanationRecorder::disabled();
        match sequencer.resolve(state, request, &mut dice, &mut recorder) {
            Ok(_) | Err(RulesError::DiceExhausted { .. }) => {}
            Err(err) => reasons.push(ActionError::from(&err)),
        }
    }
    ActionCheck {
        allowed: reasons.is_empty(),
        reasons,
    }
}

/// Candidate requests for `player` in the current phase.
///
/// Free-form positions (deployment and moves) are not enumerated.
fn candidates(state: &GameState, player: PlayerId) -> Vec<Action> {
    let mut out = vec![Action::AdvancePhase];
    let own: Vec<UnitId> = state.live_units_of(player).map(|u| u.id).collect();
    let enemies: Vec<UnitId> = state.live_units_of(player.opponent()).map(|u| u.id).collect();

    for &unit in &own {
        out.push(Action::Rally { unit });
        out.push(Action::CancelCharge { unit });
        out.push(Action::ResolveCharge { unit });
        out.push(Action::WithdrawReaction { unit });
        for reaction in [Reaction::Hold, Reaction::Flee] {
            out.push(Action::DeclareReaction { unit, reaction });
        }
        for &target in &enemies {
            out.push(Action::DeclareCharge { unit, target });
            out.push(Action::Shoot {
                unit,
                target,
                weapon: None,
            });
        }
    }
    out.extend(state.combats().map(|c| Action::FightCombat { combat: c.id }));

    let casting = state.pools().casting[player];
    for unit in state.live_units_of(player) {
        for caster in unit.living_characters() {
            for spell in &caster.spells {
                for target in own.iter().chain(&enemies) {
                    for dice in 1..=casting {
                        out.push(Action::CastSpell {
                            caster: caster.id,
                            spell: spell.clone(),
                            target: *target,
                            dice,
                        });
                    }
                }
            }
        }
    }

    let dispel = state.pools().dispel[player];
    out.push(Action::AllowSpell);
    for dice in 1..=dispel {
        out.push(Action::Dispel { dice });
        for effect in state.effects() {
            out.push(Action::DispelEffect { effect: effect.id, dice });
        }
    }
    out
}

/// Every enumerable action `player` may take now.
pub fn legal_actions(sequencer: &Sequencer, state: &GameState, player: PlayerId) -> Vec<Action> {
    let phase = state.phase();
    candidates(state, player)
        .into_iter()
        .filter(|action| phase.allows(action.kind()))
        .filter(|action| check_action(sequencer, state, &ActionRequest::new(player, action.clone())).allowed)
        .collect()
}

/// Enemy units `unit` could declare a charge against.
pub fn charge_targets(state: &GameState, catalog: &RuleCatalog, unit: UnitId) -> Result<Vec<UnitId>> {
    let charger = state.unit(unit)?;
    let range = charge_range(state, catalog, unit)?;
    let mut targets = Vec::new();
    for enemy in state.live_units_of(charger.owner.opponent()) {
        if validate_target(state, charger, enemy.id).is_err() || enemy.status == UnitStatus::Deployed {
            continue;
        }
        if range.can_reach(charge_distance(state, catalog, unit, enemy.id)?) {
            targets.push(enemy.id);
        }
    }
    Ok(targets)
}

/// Enemy units in range of any of `unit`'s missile weapons.
pub fn shooting_targets(state: &GameState, unit: UnitId) -> Result<Vec<UnitId>> {
    let shooter = state.unit(unit)?;
    let Some(reach) = shooter.weapons.iter().filter_map(|w| w.range).reduce(f32::max) else {
        return Ok(Vec::new());
    };
    let mut targets = Vec::new();
    for enemy in state.live_units_of(shooter.owner.opponent()) {
        if enemy.combat.is_none() && state.distance(unit, enemy.id)? <= reach {
            targets.push(enemy.id);
        }
    }
    Ok(targets)
}

/// Units a wizard could target with `spell`.
pub fn spell_targets(state: &GameState, catalog: &RuleCatalog, caster: CharacterId, spell: &SpellId) -> Result<Vec<UnitId>> {
    let (unit, _) = state.character(caster)?;
    let spell = catalog.spell(spell)?;
    Ok(state
        .live_units()
        .filter(|u| (u.owner != unit.owner) == spell.effect.targets_enemy())
        .filter(|u| u.position.distance(unit.position) <= spell.range)
        .map(|u| u.id)
        .collect())
}

/// Valid targets of `unit` for an action kind.
///
/// Kinds without a unit target give an empty list.
pub fn available_targets(state: &GameState, catalog: &RuleCatalog, unit: UnitId, kind: ActionKind) -> Result<Vec<UnitId>> {
    match kind {
        ActionKind::DeclareCharge => charge_targets(state, catalog, unit),
        ActionKind::Shoot => shooting_targets(state, unit),
        _ => Ok(Vec::new()),
    }
}

/// Resolve the modifiers a test would see, without rolling.
pub fn preview_modifiers(state: &GameState, catalog: &RuleCatalog, ctx: &ModifierContext) -> Result<ResolvedFacts> {
    resolve_modifiers(state, catalog, ctx)
}
