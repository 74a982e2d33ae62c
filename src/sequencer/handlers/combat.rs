//! Fighting a round of close combat.

use tracing::debug;

use crate::core::{CombatId, PlayerMap, Result, RulesError, UnitId};
use crate::lifecycle::{ActionScope, CaseManager, Combat, CombatState, StatusTrigger, UnitStatus};
use crate::modifiers::WeaponRef;
use crate::resolution::{
    block_attacks, combat_result, combat_situation, is_steadfast, leadership_test, resolve_attacks, resolve_pursuit,
    strike_order, AttackOutcome, AttackRequest, Strike, TestKind,
};
use crate::tables::facts;

use crate::sequencer::outcome::{CombatRound, OutcomeDetail};

pub(super) fn fight(manager: &CaseManager, scope: &mut ActionScope<'_>, id: CombatId) -> Result<OutcomeDetail> {
    let combat = scope.state.combat(id)?.clone();
    if combat.state != CombatState::Engaged {
        return Err(RulesError::InvalidAction(format!("{} has already been fought this phase", id)));
    }

    let mut round = CombatRound {
        combat: id,
        strikes: Vec::new(),
        score: None,
        break_tests: Vec::new(),
        pursuits: Vec::new(),
        ended: false,
    };
    let mut wounds: PlayerMap<u32> = PlayerMap::default();

    // Strikes sharing an initiative step are simultaneous: casualties
    // land once the whole step has struck.
    let strikes = strike_order(scope.state, scope.catalog, &combat)?;
    let mut start = 0;
    while start < strikes.len() {
        let key = (strikes[start].strikes_first, strikes[start].initiative);
        let end = strikes[start..]
            .iter()
            .position(|s| (s.strikes_first, s.initiative) != key)
            .map_or(strikes.len(), |n| start + n);
        let mut casualties: Vec<(UnitId, u32)> = Vec::new();
        for strike in &strikes[start..end] {
            let Some(outcome) = make_strike(scope, &combat, strike)? else {
                continue;
            };
            if let Some(side) = combat.side_of(strike.unit) {
                wounds[side] += outcome.wounds;
            }
            if let Some(target) = outcome.target {
                casualties.push((target, outcome.wounds));
            }
            round.strikes.push(outcome);
        }
        for (target, count) in casualties {
            if count > 0 && scope.state.unit(target)?.is_on_table() {
                manager.apply_casualties(scope, target, count)?;
            }
        }
        start = end;
    }
    manager.dispatch(scope)?;

    let Ok(current) = scope.state.combat(id).cloned() else {
        round.ended = true;
        debug!(%id, "combat ended during the strikes");
        return Ok(OutcomeDetail::Combat(round));
    };
    let score = combat_result(scope.state, scope.catalog, &current, &wounds)?;
    let score = scope.observe(score);
    scope.state.combat_mut(id)?.finish_round(score.totals());

    if let Some(loser) = score.loser() {
        let winners: Vec<UnitId> = current.sides[loser.opponent()]
            .iter()
            .copied()
            .filter(|u| scope.state.unit(*u).is_ok_and(|u| u.is_on_table()))
            .collect();
        for &unit in &current.sides[loser] {
            let u = scope.state.unit(unit)?;
            if !u.is_on_table() || !matches!(u.status, UnitStatus::Active | UnitStatus::Rallied) {
                continue;
            }
            let steadfast = is_steadfast(scope.state, &current, unit)?;
            let kind = TestKind::Break {
                lost_by: score.margin,
                steadfast,
            };
            let test = leadership_test(scope.state, scope.catalog, unit, kind, scope.dice)?;
            let test = scope.observe(test);
            debug!(%unit, roll = test.roll, leadership = test.leadership, passed = test.passed, "break test");
            if !test.passed {
                manager.apply_trigger(scope, unit, StatusTrigger::BreakTestFailed)?;
                let pursuit = resolve_pursuit(scope.catalog, unit, &winners, scope.dice)?;
                let pursuit = scope.observe(pursuit);
                if pursuit.caught {
                    manager.apply_trigger(scope, unit, StatusTrigger::Caught)?;
                } else if let Some(&chaser) = winners.first() {
                    let from = scope.state.unit(unit)?.position;
                    let away = (from - scope.state.unit(chaser)?.position).normalize_or_zero();
                    scope
                        .state
                        .set_unit_position(unit, from + away * pursuit.flee.distance as f32)?;
                }
                round.pursuits.push((unit, pursuit));
            }
            round.break_tests.push(test);
        }
    }
    manager.dispatch(scope)?;

    round.ended = scope.state.combat(id).is_err();
    debug!(%id, winner = ?score.winner, margin = score.margin, ended = round.ended, "combat round");
    round.score = Some(score);
    Ok(OutcomeDetail::Combat(round))
}

/// Make one strike with the attackers left standing.
///
/// Attacks of the rank and file are recounted from the models still
/// alive, and a strike whose target has gone switches to another enemy
/// in the combat. Returns `None` when nothing is left to strike with or
/// at.
fn make_strike(scope: &mut ActionScope<'_>, combat: &Combat, strike: &Strike) -> Result<Option<AttackOutcome>> {
    let unit = scope.state.unit(strike.unit)?;
    if !unit.is_on_table() {
        return Ok(None);
    }
    let (attacks, weapon) = match strike.character {
        None => {
            if unit.models == 0 {
                return Ok(None);
            }
            let per_model = strike.modifiers.int_or(facts::ATTACKS, 0).max(0) as u32;
            let supporting = scope.catalog.config().supporting_ranks;
            let weapon = unit
                .weapons
                .iter()
                .position(|w| !w.is_ranged())
                .map(|i| WeaponRef::unit(unit.id, i));
            (block_attacks(unit.models, unit.files, per_model, supporting), weapon)
        }
        Some(cid) => {
            let Some(character) = unit.character(cid).filter(|c| c.is_alive()) else {
                return Ok(None);
            };
            let weapon = character
                .weapons
                .iter()
                .position(|w| !w.is_ranged())
                .map(|i| WeaponRef::character(unit.id, cid, i));
            (strike.attacks, weapon)
        }
    };

    let Some(side) = combat.side_of(strike.unit) else {
        return Ok(None);
    };
    let target_standing = |id: &UnitId| scope.state.unit(*id).is_ok_and(|u| u.is_on_table());
    let target = if target_standing(&strike.target) {
        strike.target
    } else {
        match combat.sides[side.opponent()].iter().find(|id| target_standing(*id)) {
            Some(&id) => id,
            None => return Ok(None),
        }
    };

    let mut request = AttackRequest::melee(strike.unit, target, attacks).with_situation(combat_situation(combat, strike.unit));
    if let Some(cid) = strike.character {
        request = request.by_character(cid);
    }
    if let Some(weapon) = weapon {
        request = request.with_weapon(weapon);
    }
    let outcome = resolve_attacks(scope.state, scope.catalog, &request, scope.dice)?;
    Ok(Some(scope.observe(outcome)))
}
