//! Phase/Turn Sequencer.
//!
//! ## Overview
//!
//! The sequencer drives a game through deployment and then rounds of
//! player turns, each split into Strategy, Movement, Shooting and Combat
//! phases. It is the only way state changes:
//!
//! - **Gating**: every request is checked against the phase, the acting
//!   player and any spell waiting for a dispel
//! - **Copy on write**: handlers run on a private copy; a failed action
//!   leaves the committed state untouched
//! - **Outcomes**: a committed action reports what it did, the milestones
//!   it raised and every die it drew
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use rust_wargame::core::{Action, ActionRequest, GameState, PlayerId};
//! use rust_wargame::rules::RuleCatalog;
//! use rust_wargame::sequencer::GameSession;
//!
//! let catalog = Arc::new(RuleCatalog::standard().unwrap());
//! let session = GameSession::seeded(GameState::new(PlayerId::A), catalog, 42);
//! assert!(session.legal_actions(PlayerId::A).contains(&Action::AdvancePhase));
//! let response = session.apply(ActionRequest::new(PlayerId::A, Action::AdvancePhase));
//! assert_eq!(response.state.round(), 1);
//! ```

pub mod engine;
mod handlers;
pub mod outcome;
pub mod phase;
pub mod query;
pub mod session;

pub use engine::{gate_violations, Resolved, Sequencer};
pub use handlers::outstanding;
pub use outcome::{
    ActionError, ActionResponse, ChargeResolution, CombatRound, Outcome, OutcomeDetail, PhaseChange, ShootingResult,
    SpellEffectOutcome, TurnPosition,
};
pub use phase::Phase;
pub use query::{
    available_targets, charge_targets, check_action, legal_actions, preview_modifiers, shooting_targets, spell_targets,
    ActionCheck,
};
pub use session::GameSession;
