//! Action outcomes and responses.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::army::CasualtyReport;
use crate::core::{ActionKind, CombatId, EffectId, ErrorKind, GameState, OutcomeId, PlayerId, Reaction, RulesError, UnitId};
use crate::lifecycle::Milestone;
use crate::magic::{CastOutcome, DispelOutcome, ExpiryReason, SpellResolution, WindsOfMagic};
use crate::resolution::{AttackOutcome, ChargeRange, ChargeRoll, CombatScore, DistanceRoll, LeadershipResult, PursuitResult};

use super::phase::Phase;

/// A point in the turn sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPosition {
    pub round: u32,
    pub player: PlayerId,
    pub phase: Phase,
}

impl TurnPosition {
    /// Position of a state.
    #[must_use]
    pub fn of(state: &GameState) -> Self {
        Self {
            round: state.round(),
            player: state.active_player(),
            phase: state.phase(),
        }
    }
}

/// What advancing the phase did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub from: TurnPosition,
    pub to: TurnPosition,
    /// Winds rolled when a player turn began.
    pub winds: Option<WindsOfMagic>,
    /// Effects that ended on the way.
    pub expired: Vec<(EffectId, ExpiryReason)>,
    /// Units that must take a rally test before the phase can end.
    pub rally_tests: Vec<UnitId>,
}

/// A charge roll and what followed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChargeResolution {
    pub charger: UnitId,
    pub target: UnitId,
    pub reaction: Reaction,
    /// Flee roll of a fleeing target.
    pub flee: Option<DistanceRoll>,
    /// `None` when the target was gone before the charge was rolled.
    pub roll: Option<ChargeRoll>,
    /// Whether a fleeing target was caught and destroyed.
    pub caught: bool,
    pub combat: Option<CombatId>,
}

/// A unit's shooting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShootingResult {
    pub unit: UnitId,
    pub target: UnitId,
    /// One batch per weapon fired.
    pub volleys: Vec<AttackOutcome>,
    pub casualties: CasualtyReport,
    /// Panic test forced by heavy casualties.
    pub panic: Option<LeadershipResult>,
}

/// A fought round of combat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRound {
    pub combat: CombatId,
    /// Strikes in the order they were made.
    pub strikes: Vec<AttackOutcome>,
    /// `None` when the combat ended before the result was worked out.
    pub score: Option<CombatScore>,
    pub break_tests: Vec<LeadershipResult>,
    /// Flight and pursuit of each broken unit.
    pub pursuits: Vec<(UnitId, PursuitResult)>,
    /// Whether the combat is over.
    pub ended: bool,
}

/// A resolved spell and the damage it did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellEffectOutcome {
    pub resolution: SpellResolution,
    pub casualties: Option<CasualtyReport>,
    pub panic: Option<LeadershipResult>,
}

/// Action-specific part of an outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OutcomeDetail {
    Deployed {
        unit: UnitId,
        position: Vec2,
    },
    PhaseAdvanced(PhaseChange),
    Rally(LeadershipResult),
    ChargeDeclared {
        charger: UnitId,
        target: UnitId,
        range: ChargeRange,
    },
    ReactionDeclared {
        unit: UnitId,
        reaction: Reaction,
    },
    ReactionWithdrawn {
        unit: UnitId,
    },
    ChargeCancelled {
        charger: UnitId,
        target: UnitId,
    },
    ChargeResolved(ChargeResolution),
    Moved {
        unit: UnitId,
        from: Vec2,
        to: Vec2,
        distance: f32,
    },
    Shooting(ShootingResult),
    Combat(CombatRound),
    Cast {
        cast: CastOutcome,
        /// Set when the spell resolved at once (irresistible, or no dispel dice).
        effect: Option<SpellEffectOutcome>,
        /// Wounds the caster suffered from a miscast.
        miscast_casualties: Option<CasualtyReport>,
    },
    Dispel {
        attempt: DispelOutcome,
        /// Set when the dispel failed and the spell went off.
        effect: Option<SpellEffectOutcome>,
    },
    SpellAllowed(SpellEffectOutcome),
    EffectDispel {
        effect: EffectId,
        attempt: DispelOutcome,
    },
}

/// The result of one committed action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: OutcomeId,
    pub player: PlayerId,
    pub action: ActionKind,
    pub detail: OutcomeDetail,
    /// Milestones delivered while the action resolved, in order.
    pub milestones: Vec<Milestone>,
    /// Leadership tests taken as a consequence (panic cascades).
    pub tests: Vec<LeadershipResult>,
    /// Raw dice consumed, in order.
    pub draws: Vec<u8>,
}

/// Error part of a failed response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionError {
    pub code: ErrorKind,
    pub message: String,
}

impl From<&RulesError> for ActionError {
    fn from(err: &RulesError) -> Self {
        Self {
            code: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Response to an action request.
///
/// `state` is the committed state after the action: the new one on
/// success, the untouched previous one on failure.
#[derive(Clone, Debug)]
pub struct ActionResponse {
    pub success: bool,
    pub state: Arc<GameState>,
    pub outcome: Option<Outcome>,
    pub error: Option<ActionError>,
}

impl ActionResponse {
    pub(crate) fn committed(state: Arc<GameState>, outcome: Outcome) -> Self {
        Self {
            success: true,
            state,
            outcome: Some(outcome),
            error: None,
        }
    }

    pub(crate) fn rejected(state: Arc<GameState>, err: &RulesError) -> Self {
        Self {
            success: false,
            state,
            outcome: None,
            error: Some(err.into()),
        }
    }

    /// The outcome, or the error as a `RulesError`-style message.
    pub fn into_result(self) -> std::result::Result<Outcome, ActionError> {
        match (self.outcome, self.error) {
            (Some(outcome), _) => Ok(outcome),
            (None, Some(error)) => Err(error),
            (None, None) => Err(ActionError {
                code: ErrorKind::InvalidAction,
                message: "no outcome".to_string(),
            }),
        }
    }
}
