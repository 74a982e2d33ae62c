//! A running game.
//!
//! `GameSession` owns the committed state and serializes actions. Readers
//! take a snapshot (`Arc<GameState>`) and never block an action for
//! longer than the pointer swap; actions run one at a time on a private
//! copy and commit by replacing the snapshot.
//!
//! ```
//! use std::sync::Arc;
//! use rust_wargame::core::{Action, ActionRequest, GameState, PlayerId};
//! use rust_wargame::rules::RuleCatalog;
//! use rust_wargame::sequencer::{GameSession, Phase};
//!
//! let catalog = Arc::new(RuleCatalog::standard().unwrap());
//! let session = GameSession::seeded(GameState::new(PlayerId::A), catalog, 7);
//!
//! let response = session.apply(ActionRequest::new(PlayerId::A, Action::AdvancePhase));
//! assert!(response.success);
//! assert_eq!(session.snapshot().phase(), Phase::Strategy);
//!
//! // B may not end A's phase; the committed state is unchanged.
//! let response = session.apply(ActionRequest::new(PlayerId::B, Action::AdvancePhase));
//! assert!(!response.success);
//! assert_eq!(response.state.phase(), Phase::Strategy);
//! ```

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::core::{Action, ActionKind, ActionRequest, GameState, OutcomeId, PlayerId, Result, UnitId};
use crate::explain::{Citation, ExplanationLog, ExplanationRecorder, Trace};
use crate::modifiers::{ModifierContext, ResolvedFacts};
use crate::resolution::{ChargeRange, DiceSource, RecordingDice, SeededDice};
use crate::rules::RuleCatalog;

use super::engine::Sequencer;
use super::outcome::{ActionResponse, Outcome};
use super::query::{self, ActionCheck};

/// Dice and outcome numbering, held under the action lock.
struct Turnstile {
    dice: Box<dyn DiceSource + Send>,
    last_outcome: OutcomeId,
}

/// A game in progress.
pub struct GameSession {
    sequencer: Sequencer,
    committed: RwLock<Arc<GameState>>,
    turnstile: Mutex<Turnstile>,
    log: RwLock<ExplanationLog>,
    explain: bool,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("sequencer", &self.sequencer)
            .field("explain", &self.explain)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Start a session on `state`, drawing from `dice`.
    pub fn new(state: GameState, catalog: Arc<RuleCatalog>, dice: impl DiceSource + Send + 'static) -> Self {
        Self::with_sequencer(state, Sequencer::new(catalog), dice)
    }

    /// Start a session with seeded dice.
    #[must_use]
    pub fn seeded(state: GameState, catalog: Arc<RuleCatalog>, seed: u64) -> Self {
        Self::new(state, catalog, SeededDice::new(seed))
    }

    /// Start a session with a configured sequencer.
    pub fn with_sequencer(state: GameState, sequencer: Sequencer, dice: impl DiceSource + Send + 'static) -> Self {
        Self {
            sequencer,
            committed: RwLock::new(Arc::new(state)),
            turnstile: Mutex::new(Turnstile {
                dice: Box::new(dice),
                last_outcome: OutcomeId::new(0),
            }),
            log: RwLock::new(ExplanationLog::new()),
            explain: true,
        }
    }

    /// Stop recording explanations (builder pattern).
    #[must_use]
    pub fn without_explanations(mut self) -> Self {
        self.explain = false;
        self
    }

    #[must_use]
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// The committed state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<GameState> {
        Arc::clone(&self.committed.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply an action with the session's dice.
    pub fn apply(&self, request: ActionRequest) -> ActionResponse {
        let mut turnstile = self.turnstile.lock().unwrap_or_else(PoisonError::into_inner);
        let Turnstile { dice, last_outcome } = &mut *turnstile;
        self.run(&request, &mut **dice, last_outcome)
    }

    /// Apply an action drawing from `dice` instead of the session's
    /// dice. Replays feed an outcome's recorded draws back through here.
    pub fn apply_with_dice(&self, request: ActionRequest, dice: &mut dyn DiceSource) -> ActionResponse {
        let mut turnstile = self.turnstile.lock().unwrap_or_else(PoisonError::into_inner);
        self.run(&request, dice, &mut turnstile.last_outcome)
    }

    fn run(&self, request: &ActionRequest, dice: &mut dyn DiceSource, last_outcome: &mut OutcomeId) -> ActionResponse {
        let current = self.snapshot();
        let mut dice = RecordingDice::new(dice);
        let mut recorder = if self.explain {
            ExplanationRecorder::new()
        } else {
            ExplanationRecorder::disabled()
        };
        let kind = request.action.kind();

        match self.sequencer.resolve(&current, request, &mut dice, &mut recorder) {
            Ok(resolved) => {
                let id = last_outcome.next();
                *last_outcome = id;
                let state = Arc::new(resolved.state);
                let outcome = Outcome {
                    id,
                    player: request.player,
                    action: kind,
                    detail: resolved.detail,
                    milestones: resolved.milestones,
                    tests: resolved.tests,
                    draws: dice.take_recorded(),
                };

                *self.committed.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&state);
                if self.explain {
                    let trace = recorder.finish();
                    self.log
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(id, trace);
                }
                info!(
                    outcome = %id,
                    player = %request.player,
                    action = %kind,
                    draws = outcome.draws.len(),
                    milestones = outcome.milestones.len(),
                    "action committed"
                );
                ActionResponse::committed(state, outcome)
            }
            Err(err) => {
                if err.is_recoverable() {
                    debug!(player = %request.player, action = %kind, error = %err, "action rejected");
                } else {
                    warn!(player = %request.player, action = %kind, error = %err, "action failed on a catalog fault");
                }
                ActionResponse::rejected(current, &err)
            }
        }
    }

    /// Citations behind a committed outcome.
    #[must_use]
    pub fn explain(&self, outcome: OutcomeId) -> Option<Vec<Citation>> {
        self.log.read().unwrap_or_else(PoisonError::into_inner).explain(outcome)
    }

    /// Full trace of a committed outcome.
    #[must_use]
    pub fn trace(&self, outcome: OutcomeId) -> Option<Trace> {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .trace(outcome)
            .cloned()
    }

    /// Whether `request` would be accepted now.
    #[must_use]
    pub fn check_action(&self, request: &ActionRequest) -> ActionCheck {
        query::check_action(&self.sequencer, &self.snapshot(), request)
    }

    /// Enumerable legal actions of `player` now.
    #[must_use]
    pub fn legal_actions(&self, player: PlayerId) -> Vec<Action> {
        query::legal_actions(&self.sequencer, &self.snapshot(), player)
    }

    /// Charge range of a unit.
    pub fn charge_range(&self, unit: UnitId) -> Result<ChargeRange> {
        crate::resolution::charge_range(&self.snapshot(), self.sequencer.catalog(), unit)
    }

    /// Valid targets of `unit` for an action kind.
    pub fn available_targets(&self, unit: UnitId, kind: ActionKind) -> Result<Vec<UnitId>> {
        query::available_targets(&self.snapshot(), self.sequencer.catalog(), unit, kind)
    }

    /// Modifiers a test would see now.
    pub fn preview_modifiers(&self, ctx: &ModifierContext) -> Result<ResolvedFacts> {
        query::preview_modifiers(&self.snapshot(), self.sequencer.catalog(), ctx)
    }
}
