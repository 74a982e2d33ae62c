//! Deployment, phase changes and rally tests.

use glam::Vec2;
use tracing::{debug, info};

use crate::core::{GameState, PlayerId, Result, RulesError, UnitId};
use crate::lifecycle::{ActionScope, CaseManager, CombatState, StatusTrigger, UnitStatus};
use crate::magic::{roll_winds, ExpiryCheck};
use crate::resolution::{leadership_test, TestKind};

use super::own_unit;
use crate::sequencer::outcome::{OutcomeDetail, PhaseChange, TurnPosition};
use crate::sequencer::phase::Phase;

/// Mandatory steps that keep the current phase from ending, in the
/// order they should be taken.
#[must_use]
pub fn outstanding(state: &GameState) -> Vec<String> {
    let mut steps = Vec::new();
    if let Some(cast) = state.pending_cast() {
        steps.push(format!("{} awaits a dispel attempt", cast.spell));
    }
    steps.extend(state.rally_queue().map(|u| format!("{} must take a rally test", u)));
    steps.extend(
        state
            .charges()
            .map(|c| format!("charge of {} against {} has not been rolled", c.charger, c.target)),
    );
    if state.phase() == Phase::Combat {
        steps.extend(
            state
                .combats()
                .filter(|c| c.state == CombatState::Engaged)
                .map(|c| format!("{} has not been fought", c.id)),
        );
    }
    steps
}

pub(super) fn deploy(
    manager: &CaseManager,
    scope: &mut ActionScope<'_>,
    player: PlayerId,
    unit: UnitId,
    position: Vec2,
    facing: f32,
) -> Result<OutcomeDetail> {
    own_unit(scope.state, player, unit)?;
    manager.deploy(scope, unit, position, facing)?;
    debug!(%unit, x = position.x, y = position.y, "deployed");
    Ok(OutcomeDetail::Deployed { unit, position })
}

/// Where the sequence goes after the current phase.
fn next_position(state: &GameState) -> TurnPosition {
    let first = state.first_player();
    let player = state.active_player();
    match (state.phase(), state.phase().next_in_turn()) {
        (Phase::Deployment, _) => TurnPosition {
            round: 1,
            player: first,
            phase: Phase::Strategy,
        },
        (_, Some(phase)) => TurnPosition {
            round: state.round(),
            player,
            phase,
        },
        (_, None) if player == first => TurnPosition {
            round: state.round(),
            player: player.opponent(),
            phase: Phase::Strategy,
        },
        (_, None) => TurnPosition {
            round: state.round() + 1,
            player: first,
            phase: Phase::Strategy,
        },
    }
}

pub(super) fn advance(manager: &CaseManager, scope: &mut ActionScope<'_>) -> Result<OutcomeDetail> {
    let steps = outstanding(scope.state);
    if let Some(first) = steps.first() {
        return Err(RulesError::MandatoryTestsOutstanding {
            count: steps.len(),
            first: first.clone(),
        });
    }

    let from = TurnPosition::of(scope.state);
    let mut expired = manager.expire_effects(scope, ExpiryCheck::EndOfPhase)?;
    let to = next_position(scope.state);
    scope.state.set_turn(to.round, to.player, to.phase)?;

    for id in scope.state.unit_ids() {
        let unit = scope.state.unit_mut(id)?;
        unit.flags.panic_tested = false;
        unit.flags.models_at_phase_start = unit.model_count();
    }

    let mut change = PhaseChange {
        from,
        to,
        winds: None,
        expired: Vec::new(),
        rally_tests: Vec::new(),
    };
    match to.phase {
        Phase::Strategy => start_turn(manager, scope, &mut change)?,
        Phase::Combat => {
            let ids: Vec<_> = scope.state.combats().map(|c| c.id).collect();
            for id in ids {
                scope.state.combat_mut(id)?.engage();
            }
        }
        _ => {}
    }
    expired.append(&mut change.expired);
    change.expired = expired;

    info!(round = to.round, player = %to.player, phase = %to.phase, "phase started");
    Ok(OutcomeDetail::PhaseAdvanced(change))
}

/// Start of a player turn: flags reset, units become active, lasting
/// effects are checked, the winds are rolled and fleeing units queue up
/// to rally.
fn start_turn(manager: &CaseManager, scope: &mut ActionScope<'_>, change: &mut PhaseChange) -> Result<()> {
    let active = scope.state.active_player();
    let ids = scope.state.unit_ids();

    for &id in &ids {
        let unit = scope.state.unit_mut(id)?;
        if unit.owner == active {
            unit.flags.moved = false;
            unit.flags.marched = false;
            unit.flags.charged = false;
            unit.flags.shot = false;
        }
    }

    for &id in &ids {
        let unit = scope.state.unit(id)?;
        let trigger = match unit.status {
            UnitStatus::Deployed if unit.placed => Some(StatusTrigger::Activated),
            UnitStatus::Rallied if unit.owner == active => Some(StatusTrigger::Reformed),
            _ => None,
        };
        if let Some(trigger) = trigger {
            manager.apply_trigger(scope, id, trigger)?;
        }
    }

    change.expired = manager.expire_effects(scope, ExpiryCheck::TurnStart(active))?;
    change
        .expired
        .extend(manager.expire_effects(scope, ExpiryCheck::Revalidate)?);

    let winds = roll_winds(scope.state, scope.catalog.config(), scope.dice)?;
    let winds = scope.observe(winds);
    *scope.state.pools_mut() = winds.pools();
    debug!(casting = winds.casting, dispel = winds.dispel, "winds of magic");
    change.winds = Some(winds);

    let fleeing: Vec<UnitId> = scope
        .state
        .live_units_of(active)
        .filter(|u| u.status == UnitStatus::Fleeing)
        .map(|u| u.id)
        .collect();
    for &id in &fleeing {
        scope.state.rally_queue_mut().push_back(id);
    }
    change.rally_tests = fleeing;
    Ok(())
}

pub(super) fn rally(manager: &CaseManager, scope: &mut ActionScope<'_>, player: PlayerId, unit: UnitId) -> Result<OutcomeDetail> {
    own_unit(scope.state, player, unit)?;
    let Some(index) = scope.state.rally_queue().position(|q| *q == unit) else {
        return Err(RulesError::InvalidAction(format!("{} has no rally test to take", unit)));
    };

    let result = leadership_test(scope.state, scope.catalog, unit, TestKind::Rally, scope.dice)?;
    let result = scope.observe(result);
    scope.state.rally_queue_mut().remove(index);
    if result.passed {
        manager.apply_trigger(scope, unit, StatusTrigger::RallyTestPassed)?;
    }
    debug!(%unit, roll = result.roll, passed = result.passed, "rally test");
    Ok(OutcomeDetail::Rally(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::{Profile, TroopType, Unit};
    use crate::explain::ExplanationRecorder;
    use crate::lifecycle::DeclaredCharge;
    use crate::resolution::ScriptedDice;
    use crate::rules::RuleCatalog;

    fn state() -> GameState {
        let mut state = GameState::new(PlayerId::A);
        for (owner, x) in [(PlayerId::A, 0.0), (PlayerId::B, 20.0)] {
            let mut u = Unit::new(
                UnitId::new(0),
                "Halberdiers",
                owner,
                TroopType::Infantry,
                Profile::line([4, 3, 3, 3, 3, 1, 3, 1, 7]),
                10,
                5,
            );
            u.position = Vec2::new(x, 0.0);
            u.placed = true;
            state.add_unit(u).unwrap();
        }
        state
    }

    #[test]
    fn test_next_position_wraps_rounds() {
        let mut state = state();
        assert_eq!(next_position(&state).phase, Phase::Strategy);
        state.set_turn(1, PlayerId::A, Phase::Combat).unwrap();
        assert_eq!(next_position(&state).player, PlayerId::B);
        state.set_turn(1, PlayerId::B, Phase::Combat).unwrap();
        let next = next_position(&state);
        assert_eq!((next.round, next.player, next.phase), (2, PlayerId::A, Phase::Strategy));
    }

    #[test]
    fn test_advance_blocked_by_declared_charge() {
        let catalog = RuleCatalog::standard().unwrap();
        let mut state = state();
        state.set_turn(1, PlayerId::A, Phase::Movement).unwrap();
        state
            .charges_mut()
            .push_back(DeclaredCharge::new(UnitId::new(1), UnitId::new(2)));
        let mut dice = ScriptedDice::default();
        let mut recorder = ExplanationRecorder::disabled();
        let mut scope = ActionScope::new(&mut state, &catalog, &mut dice, &mut recorder);

        let err = advance(&CaseManager::new(), &mut scope).unwrap_err();
        assert!(matches!(err, RulesError::MandatoryTestsOutstanding { count: 1, .. }));
        assert_eq!(scope.state.phase(), Phase::Movement);
    }

    #[test]
    fn test_turn_start_activates_and_rolls_winds() {
        let catalog = RuleCatalog::standard().unwrap();
        let mut state = state();
        let mut dice = ScriptedDice::new(vec![3, 4]);
        let mut recorder = ExplanationRecorder::disabled();
        let mut scope = ActionScope::new(&mut state, &catalog, &mut dice, &mut recorder);

        let detail = advance(&CaseManager::new(), &mut scope).unwrap();
        let OutcomeDetail::PhaseAdvanced(change) = detail else {
            panic!("expected a phase change");
        };
        assert_eq!(change.to.phase, Phase::Strategy);
        assert_eq!(change.winds.unwrap().draws.as_slice(), &[3, 4]);
        for id in [UnitId::new(1), UnitId::new(2)] {
            assert_eq!(scope.state.unit(id).unwrap().status, UnitStatus::Active);
        }
    }

    #[test]
    fn test_rally_requires_queue_entry() {
        let catalog = RuleCatalog::standard().unwrap();
        let mut state = state();
        state.set_turn(1, PlayerId::A, Phase::Strategy).unwrap();
        state.set_status(UnitId::new(1), UnitStatus::Active).unwrap();
        state.set_status(UnitId::new(1), UnitStatus::Fleeing).unwrap();
        let mut dice = ScriptedDice::new(vec![2, 3]);
        let mut recorder = ExplanationRecorder::disabled();
        let mut scope = ActionScope::new(&mut state, &catalog, &mut dice, &mut recorder);
        let manager = CaseManager::new();

        assert!(rally(&manager, &mut scope, PlayerId::A, UnitId::new(1)).is_err());
        scope.state.rally_queue_mut().push_back(UnitId::new(1));
        let detail = rally(&manager, &mut scope, PlayerId::A, UnitId::new(1)).unwrap();
        assert!(matches!(detail, OutcomeDetail::Rally(ref r) if r.passed));
        assert_eq!(scope.state.unit(UnitId::new(1)).unwrap().status, UnitStatus::Rallied);
        assert_eq!(scope.state.rally_queue().count(), 0);
    }
}
