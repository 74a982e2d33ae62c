//! Core engine types: entities, players, state, actions, RNG, configuration.
//!
//! This module holds the building blocks every subsystem shares. Rules
//! content never lives here; it is data in the
//! [`RuleCatalog`](crate::rules::RuleCatalog).

pub mod entity;
pub mod player;
pub mod rng;
pub mod config;
pub mod error;
pub mod action;
pub mod state;

pub use entity::{CharacterId, CombatId, EffectId, IdAllocator, OutcomeId, TerrainId, UnitId};
pub use player::{PlayerId, PlayerMap, PLAYER_COUNT};
pub use rng::{GameRng, GameRngState};
pub use config::EngineConfig;
pub use error::{ErrorKind, Result, RulesError};
pub use action::{Action, ActionKind, ActionRequest, Reaction};
pub use state::GameState;
