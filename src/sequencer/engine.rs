//! Action gating and resolution.
//!
//! The sequencer checks a request against the turn position, then runs
//! its handler on a copy of the state. The copy is returned on success
//! and dropped on failure, so a rejected action never leaves a trace.

use std::sync::Arc;

use tracing::trace;

use crate::core::{ActionKind, ActionRequest, GameState, Result, RulesError};
use crate::explain::ExplanationRecorder;
use crate::lifecycle::{ActionScope, CaseManager, Milestone};
use crate::resolution::{DiceSource, LeadershipResult};
use crate::rules::RuleCatalog;

use super::handlers;
use super::outcome::OutcomeDetail;

/// A resolved action, not yet committed.
#[derive(Clone, Debug)]
pub struct Resolved {
    /// Proposed state after the action.
    pub state: GameState,
    pub detail: OutcomeDetail,
    pub milestones: Vec<Milestone>,
    pub tests: Vec<LeadershipResult>,
}

/// Every reason the turn position forbids `request`, in check order.
///
/// Empty when the request may go on to its handler.
#[must_use]
pub fn gate_violations(state: &GameState, request: &ActionRequest) -> Vec<RulesError> {
    let kind = request.action.kind();
    let phase = state.phase();
    let player = request.player;
    let active = state.active_player();
    let mut violations = Vec::new();

    if !phase.allows(kind) {
        violations.push(RulesError::IllegalPhaseAction { action: kind, phase });
    }

    let pending = state.pending_cast();
    match kind {
        ActionKind::Dispel | ActionKind::AllowSpell => match pending {
            None => violations.push(RulesError::InvalidAction("no spell is waiting to be dispelled".to_string())),
            Some(cast) if cast.owner == player => violations.push(RulesError::NotActivePlayer {
                player,
                reason: "only the opponent of the caster answers a spell".to_string(),
            }),
            Some(_) => {}
        },
        _ => {
            if let Some(cast) = pending {
                violations.push(RulesError::InvalidAction(format!(
                    "{} must be dispelled or allowed first",
                    cast.spell
                )));
            }
        }
    }

    match kind {
        // Ownership of the unit or effect is checked by the handler.
        ActionKind::DeployUnit | ActionKind::DispelEffect | ActionKind::Dispel | ActionKind::AllowSpell => {}
        k if k.is_reactive() => {
            if player == active {
                violations.push(RulesError::NotActivePlayer {
                    player,
                    reason: format!("{} is for the opponent of the active player", kind),
                });
            }
        }
        _ => {
            if player != active {
                violations.push(RulesError::NotActivePlayer {
                    player,
                    reason: format!("it is {}'s turn", active),
                });
            }
        }
    }
    violations
}

/// Resolves action requests against a rule catalog.
#[derive(Clone, Debug)]
pub struct Sequencer {
    catalog: Arc<RuleCatalog>,
    manager: CaseManager,
}

impl Sequencer {
    /// A sequencer with the built-in milestone observers.
    #[must_use]
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self::with_manager(catalog, CaseManager::with_standard_observers())
    }

    /// A sequencer with a custom case manager.
    #[must_use]
    pub fn with_manager(catalog: Arc<RuleCatalog>, manager: CaseManager) -> Self {
        Self { catalog, manager }
    }

    #[must_use]
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn manager(&self) -> &CaseManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut CaseManager {
        &mut self.manager
    }

    /// Check the phase, the acting player and any pending interaction.
    pub fn check(&self, state: &GameState, request: &ActionRequest) -> Result<()> {
        match gate_violations(state, request).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolve `request` on a copy of `state`.
    ///
    /// Milestones raised by the action are delivered before this returns.
    pub fn resolve(
        &self,
        state: &GameState,
        request: &ActionRequest,
        dice: &mut dyn DiceSource,
        recorder: &mut ExplanationRecorder,
    ) -> Result<Resolved> {
        self.check(state, request)?;
        trace!(player = %request.player, action = %request.action.kind(), "resolving");

        let mut proposed = state.clone();
        let (detail, milestones, tests) = {
            let mut scope = ActionScope::new(&mut proposed, &self.catalog, dice, recorder);
            let detail = handlers::handle(&self.manager, &mut scope, request)?;
            self.manager.dispatch(&mut scope)?;
            let (milestones, tests) = scope.into_parts();
            (detail, milestones, tests)
        };
        Ok(Resolved {
            state: proposed,
            detail,
            milestones,
            tests,
        })
    }
}
