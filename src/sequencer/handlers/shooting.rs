//! Shooting.

use tracing::debug;

use crate::core::{PlayerId, Result, RulesError, UnitId};
use crate::lifecycle::{ActionScope, CaseManager};
use crate::resolution::{resolve_attacks, validate_target, AttackRequest};
use crate::tables::facts;

use super::{casualty_panic, free_unit};
use crate::sequencer::outcome::{OutcomeDetail, ShootingResult};

/// A weapon about to fire: index, range and shots per model.
struct Volley {
    index: usize,
    range: f32,
    shots: u32,
}

pub(super) fn shoot(
    manager: &CaseManager,
    scope: &mut ActionScope<'_>,
    player: PlayerId,
    unit: UnitId,
    target: UnitId,
    weapon: Option<usize>,
) -> Result<OutcomeDetail> {
    let shooter = free_unit(scope.state, player, unit)?;
    if shooter.flags.shot {
        return Err(RulesError::InvalidAction(format!("{} has already shot this turn", unit)));
    }
    if shooter.flags.marched || shooter.flags.charged {
        return Err(RulesError::InvalidAction(format!("{} marched or charged and cannot shoot", unit)));
    }
    validate_target(scope.state, shooter, target)?;
    if scope.state.unit(target)?.combat.is_some() {
        return Err(RulesError::InvalidTarget {
            target,
            reason: "unit is engaged in combat".to_string(),
        });
    }

    let volleys: Vec<Volley> = match weapon {
        Some(index) => {
            let w = shooter
                .weapons
                .get(index)
                .ok_or_else(|| RulesError::InvalidAction(format!("{} has no weapon {}", unit, index)))?;
            let range = w
                .range
                .ok_or_else(|| RulesError::InvalidAction(format!("{} is not a missile weapon", w.name)))?;
            vec![Volley {
                index,
                range,
                shots: u32::from(w.shots.max(1)),
            }]
        }
        None => shooter
            .weapons
            .iter()
            .enumerate()
            .filter_map(|(index, w)| {
                w.range.map(|range| Volley {
                    index,
                    range,
                    shots: u32::from(w.shots.max(1)),
                })
            })
            .collect(),
    };
    if volleys.is_empty() {
        return Err(RulesError::InvalidAction(format!("{} has no missile weapons", unit)));
    }
    let models = shooter.models;

    let distance = scope.state.distance(unit, target)?;
    let volleys: Vec<Volley> = volleys.into_iter().filter(|v| distance <= v.range).collect();
    if volleys.is_empty() {
        return Err(RulesError::InvalidTarget {
            target,
            reason: format!("{:.1} inches away, out of range", distance),
        });
    }

    let mut outcomes = Vec::with_capacity(volleys.len());
    let mut wounds = 0;
    for volley in volleys {
        let request = AttackRequest::ranged(unit, volley.index, target, models * volley.shots)
            .with_fact(facts::LONG_RANGE, distance > volley.range / 2.0);
        let outcome = resolve_attacks(scope.state, scope.catalog, &request, scope.dice)?;
        let outcome = scope.observe(outcome);
        wounds += outcome.wounds;
        outcomes.push(outcome);
    }
    scope.state.unit_mut(unit)?.flags.shot = true;

    let casualties = manager.apply_casualties(scope, target, wounds)?;
    let panic = casualty_panic(manager, scope, target)?;
    debug!(%unit, %target, wounds, removed = casualties.models_removed, "shooting");
    Ok(OutcomeDetail::Shooting(ShootingResult {
        unit,
        target,
        volleys: outcomes,
        casualties,
        panic,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use crate::army::{Profile, TroopType, Unit, Weapon};
    use crate::core::GameState;
    use crate::explain::ExplanationRecorder;
    use crate::lifecycle::UnitStatus;
    use crate::resolution::ScriptedDice;
    use crate::rules::RuleCatalog;

    fn unit(owner: PlayerId, x: f32, models: u32) -> Unit {
        let mut u = Unit::new(
            UnitId::new(0),
            "Archers",
            owner,
            TroopType::Infantry,
            Profile::line([4, 3, 3, 3, 3, 1, 3, 1, 7]),
            models,
            5,
        )
        .with_weapon(Weapon::ranged("Bow", 24.0));
        u.position = Vec2::new(x, 0.0);
        u.placed = true;
        u.status = UnitStatus::Active;
        u
    }

    fn fire(state: &mut GameState, draws: Vec<u8>, weapon: Option<usize>) -> Result<OutcomeDetail> {
        let catalog = RuleCatalog::standard().unwrap();
        let mut dice = ScriptedDice::new(draws);
        let mut recorder = ExplanationRecorder::disabled();
        let mut scope = ActionScope::new(state, &catalog, &mut dice, &mut recorder);
        shoot(&CaseManager::new(), &mut scope, PlayerId::A, UnitId::new(1), UnitId::new(2), weapon)
    }

    #[test]
    fn test_out_of_range() {
        let mut state = GameState::new(PlayerId::A);
        state.add_unit(unit(PlayerId::A, 0.0, 2)).unwrap();
        state.add_unit(unit(PlayerId::B, 30.0, 10)).unwrap();
        let err = fire(&mut state, vec![], None).unwrap_err();
        assert!(matches!(err, RulesError::InvalidTarget { .. }));
        assert!(!state.unit(UnitId::new(1)).unwrap().flags.shot);
    }

    #[test]
    fn test_not_a_missile_weapon() {
        let mut state = GameState::new(PlayerId::A);
        let mut archers = unit(PlayerId::A, 0.0, 2);
        archers.weapons.insert(0, Weapon::melee("Dagger"));
        state.add_unit(archers).unwrap();
        state.add_unit(unit(PlayerId::B, 10.0, 10)).unwrap();
        assert!(fire(&mut state, vec![], Some(0)).is_err());
    }

    #[test]
    fn test_volley_removes_models() {
        let mut state = GameState::new(PlayerId::A);
        state.add_unit(unit(PlayerId::A, 0.0, 2)).unwrap();
        state.add_unit(unit(PlayerId::B, 10.0, 10)).unwrap();
        // BS3 at short range hits on 4+, S3 vs T3 wounds on 4+, no armour.
        let detail = fire(&mut state, vec![6, 5, 4, 6], None).unwrap();
        let OutcomeDetail::Shooting(result) = detail else {
            panic!("expected shooting");
        };
        assert_eq!(result.volleys.len(), 1);
        assert_eq!(result.volleys[0].attacks, 2);
        assert_eq!(result.casualties.models_removed, 2);
        assert_eq!(result.panic, None);
        assert_eq!(state.unit(UnitId::new(2)).unwrap().models, 8);
        assert!(state.unit(UnitId::new(1)).unwrap().flags.shot);
    }
}
