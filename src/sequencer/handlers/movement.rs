//! Charges, charge reactions and ordinary moves.

use glam::Vec2;
use tracing::debug;

use crate::core::{PlayerId, Reaction, Result, RulesError, UnitId};
use crate::lifecycle::{ActionScope, CaseManager, DeclaredCharge, StatusTrigger, UnitStatus};
use crate::modifiers::{resolve_modifiers, ModifierContext};
use crate::resolution::{charge_distance, charge_range, roll_charge, roll_distance, validate_target};
use crate::rules::TestCategory;
use crate::tables::{facts, FactVector};

use super::{free_unit, own_unit};
use crate::sequencer::outcome::{ChargeResolution, OutcomeDetail};

pub(super) fn declare_charge(
    manager: &CaseManager,
    scope: &mut ActionScope<'_>,
    player: PlayerId,
    unit: UnitId,
    target: UnitId,
) -> Result<OutcomeDetail> {
    let charger = free_unit(scope.state, player, unit)?;
    if charger.flags.moved || charger.flags.charged {
        return Err(RulesError::InvalidAction(format!("{} has already moved this turn", unit)));
    }
    validate_target(scope.state, charger, target)?;
    if scope.state.unit(target)?.status == UnitStatus::Deployed {
        return Err(RulesError::InvalidTarget {
            target,
            reason: "unit has not entered the battle".to_string(),
        });
    }

    let range = charge_range(scope.state, scope.catalog, unit)?;
    let distance = charge_distance(scope.state, scope.catalog, unit, target)?;
    if !range.can_reach(distance) {
        return Err(RulesError::InvalidTarget {
            target,
            reason: format!("{:.1} inches away, beyond the longest possible charge of {}", distance, range.max),
        });
    }

    scope.state.charges_mut().push_back(DeclaredCharge::new(unit, target));
    manager.charge_declared(scope, unit, target)?;
    debug!(%unit, %target, distance, max = range.max, "charge declared");
    Ok(OutcomeDetail::ChargeDeclared {
        charger: unit,
        target,
        range,
    })
}

/// Indices of the charges declared against `unit`.
fn charges_against(scope: &ActionScope<'_>, unit: UnitId) -> Vec<usize> {
    scope
        .state
        .charges()
        .enumerate()
        .filter(|(_, c)| c.target == unit)
        .map(|(i, _)| i)
        .collect()
}

pub(super) fn declare_reaction(
    scope: &mut ActionScope<'_>,
    player: PlayerId,
    unit: UnitId,
    reaction: Reaction,
) -> Result<OutcomeDetail> {
    let target = own_unit(scope.state, player, unit)?;
    let engaged = target.combat.is_some();
    let fleeing = target.status == UnitStatus::Fleeing;

    let indices = charges_against(scope, unit);
    if indices.is_empty() {
        return Err(RulesError::InvalidAction(format!("{} has not been charged", unit)));
    }
    if reaction == Reaction::Flee && engaged {
        return Err(RulesError::InvalidAction(format!("{} is engaged and cannot flee", unit)));
    }
    if reaction == Reaction::Hold && fleeing {
        return Err(RulesError::InvalidAction(format!("{} is fleeing and cannot hold", unit)));
    }

    let charges = scope.state.charges_mut();
    if indices.iter().any(|&i| charges.get(i).is_some_and(|c| c.reaction.is_some())) {
        return Err(RulesError::InvalidAction(format!("{} has already declared a reaction", unit)));
    }
    for i in indices {
        if let Some(charge) = charges.get_mut(i) {
            charge.reaction = Some(reaction);
        }
    }
    debug!(%unit, ?reaction, "charge reaction");
    Ok(OutcomeDetail::ReactionDeclared { unit, reaction })
}

pub(super) fn withdraw_reaction(scope: &mut ActionScope<'_>, player: PlayerId, unit: UnitId) -> Result<OutcomeDetail> {
    own_unit(scope.state, player, unit)?;
    let indices = charges_against(scope, unit);
    let charges = scope.state.charges_mut();
    let mut withdrawn = false;
    for i in indices {
        if let Some(charge) = charges.get_mut(i) {
            withdrawn |= charge.reaction.take().is_some();
        }
    }
    if !withdrawn {
        return Err(RulesError::InvalidAction(format!("{} has no reaction to withdraw", unit)));
    }
    Ok(OutcomeDetail::ReactionWithdrawn { unit })
}

pub(super) fn cancel_charge(scope: &mut ActionScope<'_>, player: PlayerId, unit: UnitId) -> Result<OutcomeDetail> {
    own_unit(scope.state, player, unit)?;
    let Some(index) = scope.state.charges().position(|c| c.charger == unit) else {
        return Err(RulesError::InvalidAction(format!("{} has not declared a charge", unit)));
    };
    let charge = scope.state.charges_mut().remove(index);
    scope.state.unit_mut(unit)?.flags.charged = false;
    Ok(OutcomeDetail::ChargeCancelled {
        charger: unit,
        target: charge.target,
    })
}

pub(super) fn resolve_charge(
    manager: &CaseManager,
    scope: &mut ActionScope<'_>,
    player: PlayerId,
    unit: UnitId,
) -> Result<OutcomeDetail> {
    own_unit(scope.state, player, unit)?;
    let Some(index) = scope.state.charges().position(|c| c.charger == unit) else {
        return Err(RulesError::InvalidAction(format!("{} has not declared a charge", unit)));
    };
    let charge = scope.state.charges_mut().remove(index);
    let target = charge.target;
    let mut resolution = ChargeResolution {
        charger: unit,
        target,
        reaction: charge.effective_reaction(),
        flee: None,
        roll: None,
        caught: false,
        combat: None,
    };
    scope.state.unit_mut(unit)?.flags.moved = true;

    let defender = scope.state.unit(target)?;
    if !defender.is_on_table() {
        debug!(%unit, %target, "charge target is gone");
        return Ok(OutcomeDetail::ChargeResolved(resolution));
    }
    let already_fleeing = defender.status == UnitStatus::Fleeing;
    if already_fleeing {
        resolution.reaction = Reaction::Flee;
    }
    let origin = scope.state.unit(unit)?.position;

    if resolution.reaction == Reaction::Flee {
        if !already_fleeing {
            manager.apply_trigger(scope, target, StatusTrigger::FledAsReaction)?;
        }
        let flee = roll_distance(scope.catalog, target, scope.dice)?;
        let flee = scope.observe(flee);
        let from = scope.state.unit(target)?.position;
        let away = (from - origin).normalize_or_zero();
        scope.state.set_unit_position(target, from + away * flee.distance as f32)?;
        resolution.flee = Some(flee);
    }

    let roll = roll_charge(scope.state, scope.catalog, unit, target, scope.dice)?;
    let roll = scope.observe(roll);
    let destination = scope.state.unit(target)?.position;
    let toward = (destination - origin).normalize_or_zero();

    if roll.success {
        let contact = scope.catalog.config().contact_distance;
        scope.state.set_unit_position(unit, destination - toward * contact)?;
        if resolution.reaction == Reaction::Flee {
            manager.apply_trigger(scope, target, StatusTrigger::Caught)?;
            resolution.caught = true;
        } else {
            resolution.combat = Some(manager.engage(scope, unit, target)?);
        }
    } else {
        let moved = (roll.distance as f32).min(roll.required).max(0.0);
        scope.state.set_unit_position(unit, origin + toward * moved)?;
    }
    debug!(%unit, %target, distance = roll.distance, required = roll.required, success = roll.success, "charge rolled");
    resolution.roll = Some(roll);
    Ok(OutcomeDetail::ChargeResolved(resolution))
}

pub(super) fn move_unit(
    scope: &mut ActionScope<'_>,
    player: PlayerId,
    unit: UnitId,
    to: Vec2,
    march: bool,
) -> Result<OutcomeDetail> {
    let mover = free_unit(scope.state, player, unit)?;
    if mover.flags.moved || mover.flags.charged {
        return Err(RulesError::InvalidAction(format!("{} has already moved this turn", unit)));
    }
    let from = mover.position;
    let config = scope.catalog.config();

    if march {
        let blocked = scope
            .state
            .live_units()
            .any(|u| u.owner != player && u.position.distance(from) <= config.march_block_radius);
        if blocked {
            return Err(RulesError::InvalidAction(format!(
                "{} cannot march with enemies within {} inches",
                unit, config.march_block_radius
            )));
        }
    }

    let situation = FactVector::new().with_int(facts::MOVEMENT, i64::from(mover.lead_profile().movement));
    let ctx = ModifierContext::new(TestCategory::Movement, unit, situation).tagged(if march { "march" } else { "move" });
    let modifiers = resolve_modifiers(scope.state, scope.catalog, &ctx)?;
    let mut allowed = modifiers.int_or(facts::MOVEMENT, 0).max(0) as f32;
    if march {
        allowed *= config.march_multiplier;
    }

    let distance = from.distance(to);
    if distance > allowed + 1e-4 {
        return Err(RulesError::InvalidAction(format!(
            "{} may move {:.1} inches, not {:.1}",
            unit, allowed, distance
        )));
    }
    let modifiers = scope.observe(modifiers);
    debug!(%unit, distance, allowed, march, rules = modifiers.applied.len(), "moved");

    scope.state.set_unit_position(unit, to)?;
    let mover = scope.state.unit_mut(unit)?;
    mover.flags.moved = true;
    mover.flags.marched = march;
    Ok(OutcomeDetail::Moved { unit, from, to, distance })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::{Profile, TroopType, Unit};
    use crate::core::GameState;
    use crate::explain::ExplanationRecorder;
    use crate::resolution::ScriptedDice;
    use crate::rules::RuleCatalog;

    fn unit(owner: PlayerId, x: f32) -> Unit {
        let mut u = Unit::new(
            UnitId::new(0),
            "Swordsmen",
            owner,
            TroopType::Infantry,
            Profile::line([4, 4, 3, 3, 3, 1, 4, 1, 7]),
            10,
            5,
        );
        u.position = Vec2::new(x, 0.0);
        u.placed = true;
        u.status = UnitStatus::Active;
        u
    }

    /// A charger at the origin and an enemy `gap` inches away.
    fn pair(gap: f32) -> GameState {
        let mut state = GameState::new(PlayerId::A);
        state.add_unit(unit(PlayerId::A, 0.0)).unwrap();
        state.add_unit(unit(PlayerId::B, gap)).unwrap();
        state
    }

    fn run<T>(state: &mut GameState, draws: Vec<u8>, f: impl FnOnce(&CaseManager, &mut ActionScope<'_>) -> T) -> T {
        let catalog = RuleCatalog::standard().unwrap();
        let mut dice = ScriptedDice::new(draws);
        let mut recorder = ExplanationRecorder::disabled();
        let mut scope = ActionScope::new(state, &catalog, &mut dice, &mut recorder);
        let manager = CaseManager::with_standard_observers();
        f(&manager, &mut scope)
    }

    #[test]
    fn test_charge_out_of_reach() {
        // M4 + 2D6 reaches at most 16; contact needs 19.
        let mut state = pair(20.0);
        let err = run(&mut state, vec![], |m, s| {
            declare_charge(m, s, PlayerId::A, UnitId::new(1), UnitId::new(2))
        })
        .unwrap_err();
        assert!(matches!(err, RulesError::InvalidTarget { .. }));
        assert_eq!(state.charges().count(), 0);
    }

    #[test]
    fn test_successful_charge_engages() {
        let mut state = pair(10.0);
        run(&mut state, vec![3, 4], |m, s| {
            declare_charge(m, s, PlayerId::A, UnitId::new(1), UnitId::new(2)).unwrap();
            let OutcomeDetail::ChargeResolved(r) = resolve_charge(m, s, PlayerId::A, UnitId::new(1)).unwrap() else {
                panic!("expected a charge resolution");
            };
            assert!(r.roll.unwrap().success);
            assert!(r.combat.is_some());
        });
        let charger = state.unit(UnitId::new(1)).unwrap();
        assert!(charger.combat.is_some());
        assert!((charger.position.x - 9.0).abs() < 1e-4);
        assert_eq!(state.charges().count(), 0);
    }

    #[test]
    fn test_failed_charge_moves_rolled_distance() {
        let mut state = pair(15.0);
        run(&mut state, vec![1, 2], |m, s| {
            declare_charge(m, s, PlayerId::A, UnitId::new(1), UnitId::new(2)).unwrap();
            resolve_charge(m, s, PlayerId::A, UnitId::new(1)).unwrap();
        });
        let charger = state.unit(UnitId::new(1)).unwrap();
        assert_eq!(charger.combat, None);
        assert!((charger.position.x - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_flee_reaction_moves_target_away() {
        let mut state = pair(10.0);
        run(&mut state, vec![6, 6, 1, 1], |m, s| {
            declare_charge(m, s, PlayerId::A, UnitId::new(1), UnitId::new(2)).unwrap();
            declare_reaction(s, PlayerId::B, UnitId::new(2), Reaction::Flee).unwrap();
            assert!(declare_reaction(s, PlayerId::B, UnitId::new(2), Reaction::Hold).is_err());
            let OutcomeDetail::ChargeResolved(r) = resolve_charge(m, s, PlayerId::A, UnitId::new(1)).unwrap() else {
                panic!("expected a charge resolution");
            };
            assert_eq!(r.flee.unwrap().distance, 12);
            assert!(!r.roll.unwrap().success);
            assert!(!r.caught);
        });
        let target = state.unit(UnitId::new(2)).unwrap();
        assert_eq!(target.status, UnitStatus::Fleeing);
        assert!((target.position.x - 22.0).abs() < 1e-4);
    }

    #[test]
    fn test_march_blocked_by_nearby_enemy() {
        let mut state = pair(7.0);
        let err = run(&mut state, vec![], |_, s| {
            move_unit(s, PlayerId::A, UnitId::new(1), Vec2::new(-8.0, 0.0), true)
        })
        .unwrap_err();
        assert!(matches!(err, RulesError::InvalidAction(_)));

        let detail = run(&mut state, vec![], |_, s| {
            move_unit(s, PlayerId::A, UnitId::new(1), Vec2::new(-4.0, 0.0), false)
        })
        .unwrap();
        assert!(matches!(detail, OutcomeDetail::Moved { distance, .. } if (distance - 4.0).abs() < 1e-4));
        assert!(state.unit(UnitId::new(1)).unwrap().flags.moved);
    }

    #[test]
    fn test_move_beyond_movement_rejected() {
        let mut state = pair(30.0);
        let result = run(&mut state, vec![], |_, s| {
            move_unit(s, PlayerId::A, UnitId::new(1), Vec2::new(0.0, 5.0), false)
        });
        assert!(result.is_err());
        assert!(!state.unit(UnitId::new(1)).unwrap().flags.moved);
    }
}
