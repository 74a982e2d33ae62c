//! Rule conditions.
//!
//! A rule's condition decides whether it contributes to a particular test.
//! Conditions only read the test context; they never roll dice and never
//! change state. Every condition is phrased from the acting side's point
//! of view: `Charging` means the actor charged, `OpponentHasRule` looks at
//! the other side.

use serde::{Deserialize, Serialize};

use crate::army::{TerrainKind, TroopType, Unit};
use crate::core::GameState;
use crate::rules::{RuleId, TestCategory};
use crate::tables::{facts, FactVector};

/// A condition that must hold for a rule to apply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleCondition {
    // === Situation flags ===

    /// The actor charged this turn.
    Charging,

    /// The actor was charged this turn.
    Charged,

    /// First round of a combat.
    FirstRoundOfCombat,

    /// Shooting beyond half range.
    LongRange,

    // === Unit filters ===

    /// The actor is of this troop type.
    ActorTroopType(TroopType),

    /// The opponent is of this troop type.
    OpponentTroopType(TroopType),

    /// The actor carries a rule (unit, army or character level).
    ActorHasRule(RuleId),

    /// The opponent carries a rule.
    OpponentHasRule(RuleId),

    /// The actor stands in terrain of this kind.
    ActorInTerrain(TerrainKind),

    /// The opponent stands in terrain of this kind.
    OpponentInTerrain(TerrainKind),

    // === Fact filters ===

    /// Integer fact is at least `min`. Missing facts fail.
    FactAtLeast { fact: String, min: i64 },

    /// Integer fact is at most `max`. Missing facts fail.
    FactAtMost { fact: String, max: i64 },

    /// The caller tagged the test (e.g. `"stomp"`, `"impact_hits"`).
    Tag(String),

    // === Combinators ===

    /// All conditions must be true.
    All(Vec<RuleCondition>),

    /// At least one condition must be true.
    Any(Vec<RuleCondition>),

    /// Condition must be false.
    Not(Box<RuleCondition>),

    // === Special ===

    /// Always matches.
    Always,

    /// Never matches (rule switched off by errata).
    Never,
}

impl RuleCondition {
    /// Create an AND condition.
    pub fn all(conditions: impl IntoIterator<Item = RuleCondition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    /// Create an OR condition.
    pub fn any(conditions: impl IntoIterator<Item = RuleCondition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    /// Negate this condition.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Add another condition with AND.
    #[must_use]
    pub fn and(self, other: RuleCondition) -> Self {
        match self {
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            Self::Always => other,
            _ => Self::All(vec![self, other]),
        }
    }

    /// Add another condition with OR.
    #[must_use]
    pub fn or(self, other: RuleCondition) -> Self {
        match self {
            Self::Any(mut conditions) => {
                conditions.push(other);
                Self::Any(conditions)
            }
            _ => Self::Any(vec![self, other]),
        }
    }

    /// Create a minimum fact condition.
    pub fn fact_at_least(fact: impl Into<String>, min: i64) -> Self {
        Self::FactAtLeast {
            fact: fact.into(),
            min,
        }
    }

    /// Create a maximum fact condition.
    pub fn fact_at_most(fact: impl Into<String>, max: i64) -> Self {
        Self::FactAtMost {
            fact: fact.into(),
            max,
        }
    }
}

/// What a condition is checked against.
pub struct ConditionContext<'a> {
    /// Test being modified.
    pub category: TestCategory,
    /// The side making the test.
    pub actor: &'a Unit,
    /// The other side, if the test has one.
    pub opponent: Option<&'a Unit>,
    /// Situation facts supplied by the caller.
    pub facts: &'a FactVector,
    /// Game state.
    pub state: &'a GameState,
    /// Caller tags.
    pub tags: &'a [String],
}

impl<'a> ConditionContext<'a> {
    /// Create a context with no opponent and no tags.
    pub fn new(
        category: TestCategory,
        actor: &'a Unit,
        facts: &'a FactVector,
        state: &'a GameState,
    ) -> Self {
        Self {
            category,
            actor,
            opponent: None,
            facts,
            state,
            tags: &[],
        }
    }

    /// Set the opponent.
    #[must_use]
    pub fn against(mut self, opponent: &'a Unit) -> Self {
        self.opponent = Some(opponent);
        self
    }

    /// Set the caller tags.
    #[must_use]
    pub fn tagged(mut self, tags: &'a [String]) -> Self {
        self.tags = tags;
        self
    }
}

/// Evaluator for rule conditions.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Check if a condition is satisfied.
    pub fn evaluate(condition: &RuleCondition, ctx: &ConditionContext) -> bool {
        match condition {
            RuleCondition::Charging => ctx.facts.bool(facts::CHARGING) == Some(true),

            RuleCondition::Charged => ctx.facts.bool(facts::CHARGED) == Some(true),

            RuleCondition::FirstRoundOfCombat => ctx.facts.bool(facts::FIRST_ROUND) == Some(true),

            RuleCondition::LongRange => ctx.facts.bool(facts::LONG_RANGE) == Some(true),

            RuleCondition::ActorTroopType(t) => ctx.actor.troop_type == *t,

            RuleCondition::OpponentTroopType(t) => {
                ctx.opponent.is_some_and(|o| o.troop_type == *t)
            }

            RuleCondition::ActorHasRule(rule) => carries(ctx.state, ctx.actor, rule),

            RuleCondition::OpponentHasRule(rule) => {
                ctx.opponent.is_some_and(|o| carries(ctx.state, o, rule))
            }

            RuleCondition::ActorInTerrain(kind) => in_terrain(ctx.state, ctx.actor, *kind),

            RuleCondition::OpponentInTerrain(kind) => {
                ctx.opponent.is_some_and(|o| in_terrain(ctx.state, o, *kind))
            }

            RuleCondition::FactAtLeast { fact, min } => {
                ctx.facts.int(fact).is_some_and(|v| v >= *min)
            }

            RuleCondition::FactAtMost { fact, max } => {
                ctx.facts.int(fact).is_some_and(|v| v <= *max)
            }

            RuleCondition::Tag(tag) => ctx.tags.iter().any(|t| t == tag),

            RuleCondition::All(conditions) => conditions.iter().all(|c| Self::evaluate(c, ctx)),

            RuleCondition::Any(conditions) => conditions.iter().any(|c| Self::evaluate(c, ctx)),

            RuleCondition::Not(inner) => !Self::evaluate(inner, ctx),

            RuleCondition::Always => true,

            RuleCondition::Never => false,
        }
    }
}

fn carries(state: &GameState, unit: &Unit, rule: &RuleId) -> bool {
    unit.rules.contains(rule)
        || state.army_rules(unit.owner).contains(rule)
        || unit
            .living_characters()
            .any(|c| c.carried_rules().any(|r| r == rule))
}

fn in_terrain(state: &GameState, unit: &Unit, kind: TerrainKind) -> bool {
    state.terrain_at(unit.position).any(|t| t.kind == kind)
}
