//! Modifier resolution pipeline.
//!
//! Turns the special rules in scope of a pending test into one normalized
//! fact vector for the decision tables.

pub mod condition;
pub mod pipeline;
pub mod policy;

pub use condition::{ConditionContext, ConditionEvaluator, RuleCondition};
pub use pipeline::{
    resolve_modifiers, AppliedModifier, ConflictFlag, ModifierContext, ResolvedFacts, WeaponRef,
};
pub use policy::{Candidate, PrecedencePolicy, PrecedenceStage, Preference, TieBreak};
