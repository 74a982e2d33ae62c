//! Built-in milestone observers.
//!
//! - [`CombatCleanupObserver`] takes broken, fled and destroyed units out
//!   of their combats.
//! - [`SpellLifecycleObserver`] ends effects whose caster or target is gone.
//! - [`PanicObserver`] makes nearby friends test for panic.

use std::sync::Arc;

use tracing::debug;

use crate::core::{Result, UnitId};
use crate::magic::ExpiryCheck;
use crate::resolution::{leadership_test, LeadershipResult, TestKind};

use super::manager::CaseManager;
use super::milestone::{Milestone, MilestoneFilter, MilestoneKind};
use super::observer::MilestoneObserver;
use super::scope::ActionScope;
use super::status::{StatusTrigger, UnitStatus};

/// Priority of [`CombatCleanupObserver`] in the standard set.
pub const CLEANUP_PRIORITY: i32 = 10;
/// Priority of [`SpellLifecycleObserver`] in the standard set.
pub const SPELL_LIFECYCLE_PRIORITY: i32 = 5;
/// Priority of [`PanicObserver`] in the standard set.
pub const PANIC_PRIORITY: i32 = 0;

/// Register the built-in observers on `manager`.
pub fn register_standard(manager: &mut CaseManager) {
    let routs = || MilestoneFilter::kinds([MilestoneKind::Broken, MilestoneKind::Fled, MilestoneKind::Destroyed]);
    manager.observe(routs(), CLEANUP_PRIORITY, Arc::new(CombatCleanupObserver));
    manager.observe(
        MilestoneFilter::Kind(MilestoneKind::Destroyed),
        SPELL_LIFECYCLE_PRIORITY,
        Arc::new(SpellLifecycleObserver),
    );
    manager.observe(routs(), PANIC_PRIORITY, Arc::new(PanicObserver));
}

/// Take one panic test for `unit`, breaking it on a failure.
///
/// A unit tests for panic at most once per phase; returns `None` when it
/// has already tested or cannot test.
pub fn take_panic_test(
    manager: &CaseManager,
    scope: &mut ActionScope<'_>,
    unit: UnitId,
) -> Result<Option<LeadershipResult>> {
    let u = scope.state.unit(unit)?;
    let can_test = u.is_on_table()
        && matches!(u.status, UnitStatus::Active | UnitStatus::Rallied)
        && !u.flags.panic_tested;
    if !can_test {
        return Ok(None);
    }

    let result = leadership_test(scope.state, scope.catalog, unit, TestKind::Panic, scope.dice)?;
    scope.state.unit_mut(unit)?.flags.panic_tested = true;
    let passed = result.passed;
    debug!(%unit, roll = result.roll, leadership = result.leadership, passed, "panic test");
    scope.push_test(result.clone());

    if !passed {
        manager.apply_trigger(scope, unit, StatusTrigger::PanicTestFailed)?;
    }
    Ok(Some(result))
}

/// Friendly units near a routing or destroyed unit test for panic.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanicObserver;

impl MilestoneObserver for PanicObserver {
    fn name(&self) -> &str {
        "panic"
    }

    fn on_milestone(&self, milestone: &Milestone, manager: &CaseManager, scope: &mut ActionScope<'_>) -> Result<()> {
        let Some(source) = milestone.unit() else {
            return Ok(());
        };
        let origin = scope.state.unit(source)?;
        let owner = origin.owner;
        let position = origin.position;
        let radius = scope.catalog.config().panic_radius;

        let nearby: Vec<UnitId> = scope
            .state
            .live_units_of(owner)
            .filter(|u| u.id != source && u.combat.is_none())
            .filter(|u| u.position.distance(position) <= radius)
            .map(|u| u.id)
            .collect();

        for unit in nearby {
            take_panic_test(manager, scope, unit)?;
        }
        Ok(())
    }
}

/// Broken, fled and destroyed units leave their combat.
#[derive(Clone, Copy, Debug, Default)]
pub struct CombatCleanupObserver;

impl MilestoneObserver for CombatCleanupObserver {
    fn name(&self) -> &str {
        "combat cleanup"
    }

    fn on_milestone(&self, milestone: &Milestone, manager: &CaseManager, scope: &mut ActionScope<'_>) -> Result<()> {
        match milestone.unit() {
            Some(unit) => manager.disengage(scope, unit),
            None => Ok(()),
        }
    }
}

/// Lasting effects end when their caster or target is destroyed.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpellLifecycleObserver;

impl MilestoneObserver for SpellLifecycleObserver {
    fn name(&self) -> &str {
        "spell lifecycle"
    }

    fn on_milestone(&self, _: &Milestone, manager: &CaseManager, scope: &mut ActionScope<'_>) -> Result<()> {
        manager.expire_effects(scope, ExpiryCheck::Revalidate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use crate::army::{Profile, SpellId, TroopType, Unit};
    use crate::core::{GameState, PlayerId};
    use crate::explain::ExplanationRecorder;
    use crate::magic::{resolve_spell, tests_support, PendingCast};
    use crate::resolution::ScriptedDice;
    use crate::rules::RuleCatalog;

    fn spearmen(owner: PlayerId, x: f32) -> Unit {
        let mut u = Unit::new(
            UnitId::new(0),
            "Spearmen",
            owner,
            TroopType::Infantry,
            Profile::line([4, 3, 3, 3, 3, 1, 3, 1, 7]),
            10,
            5,
        );
        u.position = Vec2::new(x, 0.0);
        u.placed = true;
        u.status = UnitStatus::Active;
        u
    }

    /// Units 1, 2 and 3 of side A in a line 5" apart; unit 4 of side B.
    fn line() -> GameState {
        let mut state = GameState::new(PlayerId::A);
        for x in [0.0, 5.0, 10.0] {
            state.add_unit(spearmen(PlayerId::A, x)).unwrap();
        }
        state.add_unit(spearmen(PlayerId::B, 3.0)).unwrap();
        state
    }

    #[test]
    fn test_panic_cascade_in_one_dispatch() {
        let catalog = RuleCatalog::standard().unwrap();
        let mut state = line();
        // Unit 2 fails (6+6 vs Ld 7), then unit 3 fails (5+5).
        let mut dice = ScriptedDice::new(vec![6, 6, 5, 5]);
        let mut recorder = ExplanationRecorder::new();
        let mut scope = ActionScope::new(&mut state, &catalog, &mut dice, &mut recorder);
        let manager = CaseManager::with_standard_observers();

        manager
            .apply_trigger(&mut scope, UnitId::new(1), StatusTrigger::BreakTestFailed)
            .unwrap();
        manager.dispatch(&mut scope).unwrap();

        assert_eq!(scope.state.unit(UnitId::new(2)).unwrap().status, UnitStatus::Fleeing);
        assert_eq!(scope.state.unit(UnitId::new(3)).unwrap().status, UnitStatus::Fleeing);
        assert_eq!(scope.state.unit(UnitId::new(4)).unwrap().status, UnitStatus::Active);
        let tested: Vec<UnitId> = scope.tests().iter().map(|t| t.unit).collect();
        assert_eq!(tested, vec![UnitId::new(2), UnitId::new(3)]);
        assert!(!scope.has_pending());
    }

    #[test]
    fn test_panic_once_per_phase() {
        let catalog = RuleCatalog::standard().unwrap();
        let mut state = line();
        let mut dice = ScriptedDice::new(vec![1, 2]);
        let mut recorder = ExplanationRecorder::disabled();
        let mut scope = ActionScope::new(&mut state, &catalog, &mut dice, &mut recorder);
        let manager = CaseManager::new();

        assert!(take_panic_test(&manager, &mut scope, UnitId::new(2)).unwrap().unwrap().passed);
        assert!(take_panic_test(&manager, &mut scope, UnitId::new(2)).unwrap().is_none());
    }

    #[test]
    fn test_destroyed_unit_leaves_combat() {
        let catalog = RuleCatalog::standard().unwrap();
        let mut state = line();
        // Unit 2 is within 6" of the destroyed unit 1 and passes.
        let mut dice = ScriptedDice::new(vec![2, 2]);
        let mut recorder = ExplanationRecorder::disabled();
        let mut scope = ActionScope::new(&mut state, &catalog, &mut dice, &mut recorder);
        let manager = CaseManager::with_standard_observers();

        let combat = manager.engage(&mut scope, UnitId::new(4), UnitId::new(1)).unwrap();
        manager.apply_casualties(&mut scope, UnitId::new(1), 10).unwrap();
        manager.dispatch(&mut scope).unwrap();

        assert!(scope.state.combat(combat).is_err());
        assert_eq!(scope.state.unit(UnitId::new(4)).unwrap().combat, None);
        assert!(scope
            .delivered()
            .contains(&Milestone::CombatEnded { combat }));
        assert_eq!(scope.tests().len(), 1);
    }

    #[test]
    fn test_destroyed_caster_ends_effects() {
        let catalog = tests_support::catalog();
        let (mut state, caster, wizard, target) = tests_support::setup();
        state.set_status(caster, UnitStatus::Active).unwrap();
        let cast = PendingCast {
            unit: caster,
            caster: wizard,
            owner: PlayerId::A,
            spell: SpellId::new("iron_skin"),
            target: caster,
            casting_total: 8,
            irresistible: false,
        };
        let mut dice = ScriptedDice::default();
        let effect = resolve_spell(&mut state, &catalog, &cast, &mut dice)
            .unwrap()
            .effect
            .unwrap();

        let mut recorder = ExplanationRecorder::disabled();
        let mut scope = ActionScope::new(&mut state, &catalog, &mut dice, &mut recorder);
        let manager = CaseManager::with_standard_observers();
        manager.apply_casualties(&mut scope, caster, 100).unwrap();
        manager.dispatch(&mut scope).unwrap();

        assert!(scope.state.effect(effect).is_err());
        assert!(scope.delivered().iter().any(|m| m.kind() == MilestoneKind::SpellEffectExpired));
        assert!(scope.state.unit(target).unwrap().is_on_table());
    }
}
