//! Unit & Combat Case Manager.
//!
//! Applies status changes caused by test outcomes, creates and dissolves
//! combats, ends spell effects, and delivers the resulting milestones to
//! observers. It never rolls dice: every change it makes was decided by
//! the resolution engine or the sequencer.

use std::sync::Arc;

use glam::Vec2;
use smallvec::SmallVec;
use tracing::debug;

use crate::army::CasualtyReport;
use crate::core::{CombatId, EffectId, Result, RulesError, UnitId};
use crate::magic::{expired_effects, ExpiryCheck, ExpiryReason};

use super::combat::Combat;
use super::milestone::{Milestone, MilestoneFilter};
use super::observer::{MilestoneObserver, ObserverId, ObserverRegistry};
use super::scope::ActionScope;
use super::status::{StatusTrigger, UnitStatus};

/// Upper bound on milestones delivered by one action.
const MAX_CASCADE: usize = 4096;

/// Applies lifecycle changes and dispatches milestones.
#[derive(Clone, Debug, Default)]
pub struct CaseManager {
    registry: ObserverRegistry,
}

impl CaseManager {
    /// A manager with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager with the built-in observers registered.
    #[must_use]
    pub fn with_standard_observers() -> Self {
        let mut manager = Self::new();
        super::reactions::register_standard(&mut manager);
        manager
    }

    /// Subscribe an observer.
    pub fn observe(
        &mut self,
        filter: MilestoneFilter,
        priority: i32,
        observer: Arc<dyn MilestoneObserver>,
    ) -> ObserverId {
        self.registry.register(filter, priority, observer)
    }

    /// The observer registry.
    #[must_use]
    pub fn registry(&self) -> &ObserverRegistry {
        &self.registry
    }

    /// The observer registry, mutably.
    pub fn registry_mut(&mut self) -> &mut ObserverRegistry {
        &mut self.registry
    }

    /// Move a unit to the status `trigger` leads to and queue the
    /// matching milestone.
    ///
    /// Fails with `IllegalStateTransition` and leaves the unit untouched
    /// when the lifecycle table forbids the change.
    pub fn apply_trigger(&self, scope: &mut ActionScope<'_>, unit: UnitId, trigger: StatusTrigger) -> Result<UnitStatus> {
        let to = trigger.target();
        let from = scope.state.set_status(unit, to)?;
        debug!(%unit, %from, %to, %trigger, "status change");

        match trigger {
            StatusTrigger::BreakTestFailed | StatusTrigger::PanicTestFailed => {
                scope.emit(Milestone::Broken { unit });
            }
            StatusTrigger::FledAsReaction => scope.emit(Milestone::Fled { unit }),
            StatusTrigger::RallyTestPassed => scope.emit(Milestone::Rallied { unit }),
            StatusTrigger::WoundsExhausted | StatusTrigger::Caught => {
                scope.emit(Milestone::Destroyed { unit });
            }
            StatusTrigger::Activated | StatusTrigger::Reformed => {}
        }
        Ok(from)
    }

    /// Set a unit up on the table.
    pub fn deploy(&self, scope: &mut ActionScope<'_>, unit: UnitId, position: Vec2, facing: f32) -> Result<()> {
        let u = scope.state.unit_mut(unit)?;
        if u.placed {
            return Err(RulesError::InvalidAction(format!("{} is already deployed", unit)));
        }
        if u.status != UnitStatus::Deployed {
            return Err(RulesError::InvalidAction(format!("{} cannot be deployed while {}", unit, u.status)));
        }
        u.placed = true;
        u.position = position;
        u.facing = facing;
        scope.emit(Milestone::UnitDeployed { unit });
        Ok(())
    }

    /// Queue `FirstCharge` the first time a unit declares a charge.
    pub fn charge_declared(&self, scope: &mut ActionScope<'_>, unit: UnitId, target: UnitId) -> Result<()> {
        let u = scope.state.unit_mut(unit)?;
        u.flags.charged = true;
        if !u.has_charged {
            u.has_charged = true;
            scope.emit(Milestone::FirstCharge { unit, target });
        }
        Ok(())
    }

    /// Lock a charger in combat with its target.
    ///
    /// Joins the target's combat when it is already engaged, otherwise
    /// opens a new one.
    pub fn engage(&self, scope: &mut ActionScope<'_>, charger: UnitId, target: UnitId) -> Result<CombatId> {
        let charger_owner = scope.state.unit(charger)?.owner;
        let target_unit = scope.state.unit(target)?;
        if target_unit.owner == charger_owner {
            return Err(RulesError::InvalidTarget {
                target,
                reason: "cannot engage a friendly unit".to_string(),
            });
        }

        let id = match target_unit.combat {
            Some(id) => {
                let combat = scope.state.combat_mut(id)?;
                combat.join(charger, charger_owner, true);
                combat.engage();
                id
            }
            None => scope.state.insert_combat(Combat::new(charger, charger_owner, target)),
        };
        scope.state.unit_mut(charger)?.combat = Some(id);
        scope.state.unit_mut(target)?.combat = Some(id);

        let units: SmallVec<[UnitId; 4]> = scope.state.combat(id)?.units().collect();
        scope.emit(Milestone::EngagedInCombat { combat: id, units });
        Ok(id)
    }

    /// Take a unit out of its combat, ending the combat when one side is
    /// left empty.
    pub fn disengage(&self, scope: &mut ActionScope<'_>, unit: UnitId) -> Result<()> {
        let Some(id) = scope.state.unit(unit)?.combat else {
            return Ok(());
        };
        scope.state.unit_mut(unit)?.combat = None;
        let combat = scope.state.combat_mut(id)?;
        combat.remove(unit);
        if combat.is_over() {
            self.end_combat(scope, id)?;
        }
        Ok(())
    }

    /// Dissolve a combat and free the units still in it.
    pub fn end_combat(&self, scope: &mut ActionScope<'_>, id: CombatId) -> Result<()> {
        let combat = scope.state.remove_combat(id)?;
        for unit in combat.units() {
            scope.state.unit_mut(unit)?.combat = None;
        }
        debug!(%id, "combat ended");
        scope.emit(Milestone::CombatEnded { combat: id });
        Ok(())
    }

    /// Remove wounds from a unit; destroys it when nothing is left.
    pub fn apply_casualties(&self, scope: &mut ActionScope<'_>, unit: UnitId, wounds: u32) -> Result<CasualtyReport> {
        let report = scope.state.add_casualties(unit, wounds)?;
        if scope.state.unit(unit)?.is_wiped_out() {
            self.apply_trigger(scope, unit, StatusTrigger::WoundsExhausted)?;
        }
        Ok(report)
    }

    /// End every spell effect that expires at `check`.
    pub fn expire_effects(&self, scope: &mut ActionScope<'_>, check: ExpiryCheck) -> Result<Vec<(EffectId, ExpiryReason)>> {
        let expired = expired_effects(scope.state, check);
        for (id, reason) in &expired {
            self.end_effect(scope, *id, *reason)?;
        }
        Ok(expired)
    }

    /// End one spell effect.
    pub fn end_effect(&self, scope: &mut ActionScope<'_>, id: EffectId, reason: ExpiryReason) -> Result<()> {
        let effect = scope.state.remove_spell_effect(id)?;
        debug!(%id, spell = %effect.spell, %reason, "spell effect ended");
        scope.emit(Milestone::SpellEffectExpired {
            effect: id,
            spell: effect.spell,
            target: effect.target,
        });
        Ok(())
    }

    /// Deliver every queued milestone, including the ones raised while
    /// delivering, oldest first.
    pub fn dispatch(&self, scope: &mut ActionScope<'_>) -> Result<()> {
        let mut delivered = 0;
        while let Some(milestone) = scope.next_pending() {
            delivered += 1;
            if delivered > MAX_CASCADE {
                return Err(RulesError::InvalidAction(format!(
                    "milestone cascade exceeded {} deliveries",
                    MAX_CASCADE
                )));
            }
            let observers = self.registry.matching(&milestone);
            debug!(%milestone, observers = observers.len(), "dispatching milestone");
            for registration in observers {
                registration.observer.on_milestone(&milestone, self, scope)?;
            }
            scope.mark_delivered(milestone);
        }
        Ok(())
    }
}
