//! Action requests.
//!
//! An action is a typed verb plus the entities it names. The sequencer
//! checks the verb against the current phase before anything else, so
//! every variant maps to an [`ActionKind`] that phases declare legal.
//!
//! ```
//! use rust_wargame::core::{Action, ActionKind, ActionRequest, PlayerId, UnitId};
//!
//! let request = ActionRequest::new(
//!     PlayerId::A,
//!     Action::DeclareCharge { unit: UnitId::new(1), target: UnitId::new(4) },
//! );
//! assert_eq!(request.action.kind(), ActionKind::DeclareCharge);
//! assert_eq!(request.action.kind().to_string(), "declare charge");
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::entity::{CharacterId, CombatId, EffectId, UnitId};
use super::player::PlayerId;
use crate::army::SpellId;

/// Response of a charged unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    /// Stand and receive the charge.
    #[default]
    Hold,
    /// Flee from the charger.
    Flee,
}

/// A game action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Set a unit up on the table.
    DeployUnit {
        unit: UnitId,
        position: Vec2,
        facing: f32,
    },

    /// End the current phase.
    AdvancePhase,

    /// Take a queued rally test.
    Rally { unit: UnitId },

    /// Declare a charge against an enemy unit.
    DeclareCharge { unit: UnitId, target: UnitId },

    /// Respond to a declared charge.
    DeclareReaction { unit: UnitId, reaction: Reaction },

    /// Withdraw a declared reaction before the charge is rolled.
    WithdrawReaction { unit: UnitId },

    /// Abandon a declared charge before it is rolled.
    CancelCharge { unit: UnitId },

    /// Roll a declared charge.
    ResolveCharge { unit: UnitId },

    /// Move a unit.
    Move { unit: UnitId, to: Vec2, march: bool },

    /// Shoot with one weapon, or every ranged weapon when `weapon` is `None`.
    Shoot {
        unit: UnitId,
        target: UnitId,
        weapon: Option<usize>,
    },

    /// Fight a round of an engaged combat.
    FightCombat { combat: CombatId },

    /// Attempt to cast a spell with dice from the casting pool.
    CastSpell {
        caster: CharacterId,
        spell: SpellId,
        target: UnitId,
        dice: u8,
    },

    /// Attempt to dispel the pending cast with dice from the dispel pool.
    Dispel { dice: u8 },

    /// Let the pending cast through.
    AllowSpell,

    /// Attempt to dispel a spell that remains in play.
    DispelEffect { effect: EffectId, dice: u8 },
}

/// The verb of an action, without its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    DeployUnit,
    AdvancePhase,
    Rally,
    DeclareCharge,
    DeclareReaction,
    WithdrawReaction,
    CancelCharge,
    ResolveCharge,
    Move,
    Shoot,
    FightCombat,
    CastSpell,
    Dispel,
    AllowSpell,
    DispelEffect,
}

impl ActionKind {
    /// Whether the side not taking its turn issues this action.
    #[must_use]
    pub fn is_reactive(self) -> bool {
        matches!(
            self,
            ActionKind::DeclareReaction
                | ActionKind::WithdrawReaction
                | ActionKind::Dispel
                | ActionKind::AllowSpell
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionKind::DeployUnit => "deploy unit",
            ActionKind::AdvancePhase => "advance phase",
            ActionKind::Rally => "rally",
            ActionKind::DeclareCharge => "declare charge",
            ActionKind::DeclareReaction => "declare reaction",
            ActionKind::WithdrawReaction => "withdraw reaction",
            ActionKind::CancelCharge => "cancel charge",
            ActionKind::ResolveCharge => "resolve charge",
            ActionKind::Move => "move",
            ActionKind::Shoot => "shoot",
            ActionKind::FightCombat => "fight combat",
            ActionKind::CastSpell => "cast spell",
            ActionKind::Dispel => "dispel",
            ActionKind::AllowSpell => "allow spell",
            ActionKind::DispelEffect => "dispel effect",
        };
        f.write_str(s)
    }
}

impl Action {
    /// The verb of this action.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::DeployUnit { .. } => ActionKind::DeployUnit,
            Action::AdvancePhase => ActionKind::AdvancePhase,
            Action::Rally { .. } => ActionKind::Rally,
            Action::DeclareCharge { .. } => ActionKind::DeclareCharge,
            Action::DeclareReaction { .. } => ActionKind::DeclareReaction,
            Action::WithdrawReaction { .. } => ActionKind::WithdrawReaction,
            Action::CancelCharge { .. } => ActionKind::CancelCharge,
            Action::ResolveCharge { .. } => ActionKind::ResolveCharge,
            Action::Move { .. } => ActionKind::Move,
            Action::Shoot { .. } => ActionKind::Shoot,
            Action::FightCombat { .. } => ActionKind::FightCombat,
            Action::CastSpell { .. } => ActionKind::CastSpell,
            Action::Dispel { .. } => ActionKind::Dispel,
            Action::AllowSpell => ActionKind::AllowSpell,
            Action::DispelEffect { .. } => ActionKind::DispelEffect,
        }
    }

    /// Units named by the action.
    ///
    /// SmallVec keeps the common one- or two-unit case off the heap.
    #[must_use]
    pub fn units(&self) -> SmallVec<[UnitId; 2]> {
        let mut out = SmallVec::new();
        match self {
            Action::DeployUnit { unit, .. }
            | Action::Rally { unit }
            | Action::DeclareReaction { unit, .. }
            | Action::WithdrawReaction { unit }
            | Action::CancelCharge { unit }
            | Action::ResolveCharge { unit }
            | Action::Move { unit, .. } => out.push(*unit),
            Action::DeclareCharge { unit, target } | Action::Shoot { unit, target, .. } => {
                out.push(*unit);
                out.push(*target);
            }
            Action::CastSpell { target, .. } => out.push(*target),
            Action::AdvancePhase
            | Action::FightCombat { .. }
            | Action::Dispel { .. }
            | Action::AllowSpell
            | Action::DispelEffect { .. } => {}
        }
        out
    }
}

/// An action requested by one side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub player: PlayerId,
    pub action: Action,
}

impl ActionRequest {
    /// Create a request.
    #[must_use]
    pub fn new(player: PlayerId, action: Action) -> Self {
        Self { player, action }
    }
}
