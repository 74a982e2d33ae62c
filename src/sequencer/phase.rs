//! Turn phases and the actions each allows.

use serde::{Deserialize, Serialize};

use crate::core::ActionKind;

/// A phase of a player turn, or the deployment before round 1.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Deployment,
    Strategy,
    Movement,
    Shooting,
    Combat,
}

const DEPLOYMENT: &[ActionKind] = &[ActionKind::DeployUnit, ActionKind::AdvancePhase];

const STRATEGY: &[ActionKind] = &[
    ActionKind::AdvancePhase,
    ActionKind::Rally,
    ActionKind::CastSpell,
    ActionKind::Dispel,
    ActionKind::AllowSpell,
    ActionKind::DispelEffect,
];

const MOVEMENT: &[ActionKind] = &[
    ActionKind::AdvancePhase,
    ActionKind::DeclareCharge,
    ActionKind::DeclareReaction,
    ActionKind::WithdrawReaction,
    ActionKind::CancelCharge,
    ActionKind::ResolveCharge,
    ActionKind::Move,
    ActionKind::CastSpell,
    ActionKind::Dispel,
    ActionKind::AllowSpell,
    ActionKind::DispelEffect,
];

const SHOOTING: &[ActionKind] = &[
    ActionKind::AdvancePhase,
    ActionKind::Shoot,
    ActionKind::CastSpell,
    ActionKind::Dispel,
    ActionKind::AllowSpell,
    ActionKind::DispelEffect,
];

const COMBAT: &[ActionKind] = &[
    ActionKind::AdvancePhase,
    ActionKind::FightCombat,
    ActionKind::CastSpell,
    ActionKind::Dispel,
    ActionKind::AllowSpell,
    ActionKind::DispelEffect,
];

impl Phase {
    /// Position within a turn; deployment comes before everything.
    #[must_use]
    pub const fn order(self) -> u8 {
        match self {
            Phase::Deployment => 0,
            Phase::Strategy => 1,
            Phase::Movement => 2,
            Phase::Shooting => 3,
            Phase::Combat => 4,
        }
    }

    /// The next phase of the same turn. `None` after combat.
    #[must_use]
    pub const fn next_in_turn(self) -> Option<Phase> {
        match self {
            Phase::Deployment => None,
            Phase::Strategy => Some(Phase::Movement),
            Phase::Movement => Some(Phase::Shooting),
            Phase::Shooting => Some(Phase::Combat),
            Phase::Combat => None,
        }
    }

    /// Action kinds legal in this phase.
    #[must_use]
    pub fn legal_actions(self) -> &'static [ActionKind] {
        match self {
            Phase::Deployment => DEPLOYMENT,
            Phase::Strategy => STRATEGY,
            Phase::Movement => MOVEMENT,
            Phase::Shooting => SHOOTING,
            Phase::Combat => COMBAT,
        }
    }

    /// Whether `kind` may be requested in this phase.
    #[must_use]
    pub fn allows(self, kind: ActionKind) -> bool {
        self.legal_actions().contains(&kind)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Deployment => "deployment",
            Phase::Strategy => "strategy",
            Phase::Movement => "movement",
            Phase::Shooting => "shooting",
            Phase::Combat => "combat",
        };
        f.write_str(s)
    }
}
