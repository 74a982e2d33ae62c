//! Per-action handlers.
//!
//! Each handler validates its action against the proposed state, rolls
//! what it needs, and applies the result through the case manager. Errors
//! abandon the proposed state, so a handler may fail after mutating it.

mod combat;
mod magic;
mod movement;
mod shooting;
mod turn;

pub use turn::outstanding;

use crate::army::Unit;
use crate::core::{Action, ActionRequest, GameState, PlayerId, Result, RulesError, UnitId};
use crate::lifecycle::{take_panic_test, ActionScope, CaseManager, UnitStatus};
use crate::resolution::LeadershipResult;

use super::outcome::OutcomeDetail;

/// Run the handler for `request`.
pub(crate) fn handle(manager: &CaseManager, scope: &mut ActionScope<'_>, request: &ActionRequest) -> Result<OutcomeDetail> {
    let player = request.player;
    match &request.action {
        Action::DeployUnit { unit, position, facing } => turn::deploy(manager, scope, player, *unit, *position, *facing),
        Action::AdvancePhase => turn::advance(manager, scope),
        Action::Rally { unit } => turn::rally(manager, scope, player, *unit),
        Action::DeclareCharge { unit, target } => movement::declare_charge(manager, scope, player, *unit, *target),
        Action::DeclareReaction { unit, reaction } => movement::declare_reaction(scope, player, *unit, *reaction),
        Action::WithdrawReaction { unit } => movement::withdraw_reaction(scope, player, *unit),
        Action::CancelCharge { unit } => movement::cancel_charge(scope, player, *unit),
        Action::ResolveCharge { unit } => movement::resolve_charge(manager, scope, player, *unit),
        Action::Move { unit, to, march } => movement::move_unit(scope, player, *unit, *to, *march),
        Action::Shoot { unit, target, weapon } => shooting::shoot(manager, scope, player, *unit, *target, *weapon),
        Action::FightCombat { combat } => combat::fight(manager, scope, *combat),
        Action::CastSpell {
            caster,
            spell,
            target,
            dice,
        } => magic::cast(manager, scope, player, *caster, spell, *target, *dice),
        Action::Dispel { dice } => magic::dispel(manager, scope, player, *dice),
        Action::AllowSpell => magic::allow(manager, scope),
        Action::DispelEffect { effect, dice } => magic::dispel_effect(manager, scope, player, *effect, *dice),
    }
}

/// A unit `player` owns.
fn own_unit(state: &GameState, player: PlayerId, unit: UnitId) -> Result<&Unit> {
    let u = state.unit(unit)?;
    if u.owner != player {
        return Err(RulesError::InvalidAction(format!("{} belongs to {}", unit, u.owner)));
    }
    Ok(u)
}

/// A unit that can act on its own this turn: active, on the table and
/// not locked in combat.
fn free_unit(state: &GameState, player: PlayerId, unit: UnitId) -> Result<&Unit> {
    let u = own_unit(state, player, unit)?;
    if u.status != UnitStatus::Active || !u.is_on_table() {
        return Err(RulesError::InvalidAction(format!("{} cannot act while {}", unit, u.status)));
    }
    if u.combat.is_some() {
        return Err(RulesError::InvalidAction(format!("{} is engaged in combat", unit)));
    }
    Ok(u)
}

/// Panic test for a unit that lost a large share of its models this
/// phase.
fn casualty_panic(manager: &CaseManager, scope: &mut ActionScope<'_>, unit: UnitId) -> Result<Option<LeadershipResult>> {
    let u = scope.state.unit(unit)?;
    let start = u.flags.models_at_phase_start;
    if start == 0 || !u.is_on_table() {
        return Ok(None);
    }
    let lost = start.saturating_sub(u.model_count());
    if (lost as f32) < start as f32 * scope.catalog.config().panic_casualty_fraction || lost == 0 {
        return Ok(None);
    }
    take_panic_test(manager, scope, unit)
}
