//! Combat/Test Resolution Engine.
//!
//! Executes the dice-based procedures: the attack sequence, leadership
//! tests, charge rolls and combat results. Every procedure consumes dice
//! from a [`DiceSource`] and returns an outcome carrying its rulings, so
//! results are deterministic given the same state, catalog and draws.
//!
//! ## Key Types
//!
//! - `DiceSource`: the only source of randomness
//! - `StepResult`: one table lookup plus its roll
//! - `AttackOutcome`: hits, wounds and unsaved wounds of an attack batch
//! - `LeadershipResult`, `ChargeRoll`, `CombatScore`

pub mod attack;
pub mod charge;
pub mod combat;
pub mod dice;
pub mod psychology;
pub mod step;

pub use attack::{resolve_attacks, validate_target, AttackKind, AttackOutcome, AttackRequest};
pub use charge::{
    charge_distance, charge_range, resolve_pursuit, roll_charge, roll_distance, ChargeRange, ChargeRoll,
    DistanceRoll, PursuitResult,
};
pub use combat::{
    block_attacks, combat_result, combat_situation, is_steadfast, strike_order, CombatScore, SideScore, Strike,
};
pub use dice::{total, DiceSource, Draws, RecordingDice, ScriptedDice, SeededDice};
pub use psychology::{leadership_test, LeadershipResult, TestKind};
pub use step::{lookup, passes, Step, StepResult};
