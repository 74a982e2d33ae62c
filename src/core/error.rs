//! Engine error taxonomy.
//!
//! Load-time defects (`AmbiguousTable`) are fatal and stop a catalog from
//! being built. Everything else is local to one action: the sequencer
//! discards the proposed state, so an error never leaves a partially
//! applied action behind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::army::SpellId;
use crate::core::action::ActionKind;
use crate::core::entity::{CharacterId, CombatId, EffectId, UnitId};
use crate::core::player::PlayerId;
use crate::lifecycle::UnitStatus;
use crate::rules::RuleId;
use crate::sequencer::Phase;
use crate::tables::{FactVector, TableId};

/// Errors raised by the rules engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RulesError {
    /// Malformed input to a decision table.
    #[error("invalid fact `{fact}` for table {table}: {reason}")]
    InvalidFact {
        table: TableId,
        fact: String,
        reason: String,
    },

    /// Two rows of a UNIQUE table overlap (authoring defect).
    #[error("table {table} is ambiguous: rows {first} and {second} overlap")]
    AmbiguousTable {
        table: TableId,
        first: usize,
        second: usize,
    },

    /// A rule catalog failed load-time checks (duplicate or dangling ids).
    #[error("invalid rule catalog: {0}")]
    InvalidCatalog(String),

    /// No row of a table matched; the caller may apply a default.
    #[error("no rule in table {table} covers {facts}")]
    NoMatchingRule { table: TableId, facts: FactVector },

    /// The target of an attack, charge or spell is not valid.
    #[error("invalid target {target}: {reason}")]
    InvalidTarget { target: UnitId, reason: String },

    /// The action is not legal in the current phase.
    #[error("{action} is not legal in the {phase} phase")]
    IllegalPhaseAction { action: ActionKind, phase: Phase },

    /// The case manager rejected a status transition.
    #[error("{unit} cannot go from {from} to {to}")]
    IllegalStateTransition {
        unit: UnitId,
        from: UnitStatus,
        to: UnitStatus,
    },

    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    #[error("unknown character {0}")]
    UnknownCharacter(CharacterId),

    #[error("unknown table {0}")]
    UnknownTable(TableId),

    #[error("unknown special rule {0}")]
    UnknownRule(RuleId),

    #[error("unknown spell {0}")]
    UnknownSpell(SpellId),

    #[error("unknown combat {0}")]
    UnknownCombat(CombatId),

    #[error("unknown spell effect {0}")]
    UnknownEffect(EffectId),

    /// The requesting side may not act right now.
    #[error("{player} may not act: {reason}")]
    NotActivePlayer { player: PlayerId, reason: String },

    /// Phase advancement is blocked by outstanding mandatory interactions.
    #[error("{count} mandatory interaction(s) outstanding, first: {first}")]
    MandatoryTestsOutstanding { count: usize, first: String },

    /// Not enough dice in a casting or dispel pool.
    #[error("{player} requested {requested} dice but only {available} remain")]
    InsufficientPool {
        player: PlayerId,
        requested: u8,
        available: u8,
    },

    /// A scripted dice source ran out of recorded draws.
    #[error("dice source exhausted after {drawn} draws")]
    DiceExhausted { drawn: usize },

    /// The request is malformed or violates a precondition.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// State snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Stable error code reported to callers (`errorCode`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidFact,
    AmbiguousTable,
    InvalidCatalog,
    NoMatchingRule,
    InvalidTarget,
    IllegalPhaseAction,
    IllegalStateTransition,
    UnknownEntity,
    NotActivePlayer,
    MandatoryTestsOutstanding,
    InsufficientPool,
    DiceExhausted,
    InvalidAction,
    Snapshot,
}

impl RulesError {
    /// The error code for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RulesError::InvalidFact { .. } => ErrorKind::InvalidFact,
            RulesError::AmbiguousTable { .. } => ErrorKind::AmbiguousTable,
            RulesError::InvalidCatalog(_) => ErrorKind::InvalidCatalog,
            RulesError::NoMatchingRule { .. } => ErrorKind::NoMatchingRule,
            RulesError::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            RulesError::IllegalPhaseAction { .. } => ErrorKind::IllegalPhaseAction,
            RulesError::IllegalStateTransition { .. } => ErrorKind::IllegalStateTransition,
            RulesError::UnknownUnit(_)
            | RulesError::UnknownCharacter(_)
            | RulesError::UnknownTable(_)
            | RulesError::UnknownRule(_)
            | RulesError::UnknownSpell(_)
            | RulesError::UnknownCombat(_)
            | RulesError::UnknownEffect(_) => ErrorKind::UnknownEntity,
            RulesError::NotActivePlayer { .. } => ErrorKind::NotActivePlayer,
            RulesError::MandatoryTestsOutstanding { .. } => ErrorKind::MandatoryTestsOutstanding,
            RulesError::InsufficientPool { .. } => ErrorKind::InsufficientPool,
            RulesError::DiceExhausted { .. } => ErrorKind::DiceExhausted,
            RulesError::InvalidAction(_) => ErrorKind::InvalidAction,
            RulesError::Snapshot(_) => ErrorKind::Snapshot,
        }
    }

    /// Whether a game in progress can continue after this error.
    ///
    /// Only rule authoring defects are fatal; they are raised while a
    /// catalog is built and never during play.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            RulesError::AmbiguousTable { .. } | RulesError::InvalidCatalog(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RulesError>;
