//! # rust-wargame
//!
//! A rules evaluation and game-progression engine for turn-based tabletop
//! miniatures wargames.
//!
//! ## Design Principles
//!
//! 1. **Rules Are Data**: To-hit, to-wound and leadership lookups are
//!    decision tables; special rules are catalog entries with citations.
//!    No rules content is hardcoded in the resolution code.
//!
//! 2. **Deterministic**: The engine never generates randomness. Every die
//!    comes from a `DiceSource`, and every committed outcome records its
//!    draws, so a game replays exactly.
//!
//! 3. **Copy On Write**: Actions resolve against a private copy of the
//!    state. A rejected action never leaves a trace.
//!
//! ## Architecture
//!
//! - **Persistent Data Structures**: O(1) state snapshots via `im-rs`;
//!   readers hold an `Arc<GameState>` while actions run.
//!
//! - **Milestones**: State changes raise milestones that drive cascades
//!   (panic tests, combat cleanup, spell expiry) through registered
//!   observers.
//!
//! - **Explanations**: Every ruling carries its rule id and citation, so
//!   any outcome can be explained after the fact.
//!
//! ## Modules
//!
//! - `core`: Entity ids, players, state, actions, RNG, configuration, errors
//! - `army`: Units, characters, weapons, spells and terrain
//! - `tables`: Decision tables and their fact schemas
//! - `rules`: Special rules and the rule catalog
//! - `modifiers`: Modifier resolution and precedence
//! - `resolution`: Dice, attacks, leadership tests, charges and combat results
//! - `lifecycle`: Unit status, combats and milestone observers
//! - `magic`: Casting, dispelling and lasting spell effects
//! - `sequencer`: Turn sequence, action gating, queries and game sessions
//! - `explain`: Rule citations and outcome traces

pub mod core;
pub mod army;
pub mod tables;
pub mod rules;
pub mod modifiers;
pub mod resolution;
pub mod lifecycle;
pub mod magic;
pub mod sequencer;
pub mod explain;

// Re-export commonly used types
pub use crate::core::{
    Action, ActionKind, ActionRequest, CharacterId, CombatId, EffectId, EngineConfig, ErrorKind, GameRng,
    GameRngState, GameState, OutcomeId, PlayerId, PlayerMap, Reaction, Result, RulesError, UnitId,
};

pub use crate::army::{Character, Profile, Spell, SpellId, TroopType, Unit, Weapon};

pub use crate::tables::{DecisionTable, FactValue, FactVector, HitPolicy};

pub use crate::rules::{RuleCatalog, RuleCatalogBuilder, RuleId, SpecialRule};

pub use crate::modifiers::{resolve_modifiers, ModifierContext, ResolvedFacts};

pub use crate::resolution::{DiceSource, RecordingDice, ScriptedDice, SeededDice};

pub use crate::lifecycle::{CaseManager, Milestone, MilestoneObserver, UnitStatus};

pub use crate::sequencer::{ActionResponse, GameSession, Outcome, OutcomeDetail, Phase, Sequencer};

pub use crate::explain::{Citation, ExplanationLog, Trace};
