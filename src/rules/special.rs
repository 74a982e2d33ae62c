//! Special rules as structured modifier contributions.
//!
//! A special rule never runs code. It declares which tests it touches, a
//! condition over the test's context, and the fact changes it makes. The
//! modifier pipeline turns matching rules into modifiers.
//!
//! ```
//! use rust_wargame::explain::Citation;
//! use rust_wargame::modifiers::RuleCondition;
//! use rust_wargame::rules::{Bearer, RuleScope, SpecialRule, TestCategory};
//! use rust_wargame::tables::facts;
//!
//! let lance = SpecialRule::new("lance", "Lance", RuleScope::Weapon, Citation::new("Core Rules", 94))
//!     .applies_to(TestCategory::ToWound)
//!     .when(RuleCondition::Charging)
//!     .add(facts::STRENGTH, 2);
//!
//! assert_eq!(lance.bearer, Bearer::Actor);
//! assert!(lance.applies_in(TestCategory::ToWound));
//! ```

use serde::{Deserialize, Serialize};

use crate::explain::Citation;
use crate::modifiers::RuleCondition;
use crate::tables::FactValue;

/// Identifier of a special rule.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl RuleId {
    /// Create a new rule id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a rule is attached. Also its specificity class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RuleScope {
    /// Army-wide or core rules.
    Global,
    /// Carried by a terrain feature.
    Terrain,
    /// Granted by an active spell effect.
    SpellEffect,
    /// Carried by a unit.
    Unit,
    /// Carried by a weapon.
    Weapon,
    /// Carried by a character or one of its magic items.
    Character,
}

impl std::fmt::Display for RuleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuleScope::Global => "global",
            RuleScope::Terrain => "terrain",
            RuleScope::SpellEffect => "spell effect",
            RuleScope::Unit => "unit",
            RuleScope::Weapon => "weapon",
            RuleScope::Character => "character",
        };
        f.write_str(s)
    }
}

/// Which side must carry a rule for it to apply to a test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bearer {
    /// The side making the test (attacker, tester, caster, charger).
    #[default]
    Actor,
    /// The other side (target of an attack or spell).
    Opponent,
    /// Either side.
    Either,
}

/// Kind of test a rule contributes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TestCategory {
    /// Close combat to-hit.
    ToHitMelee,
    /// Shooting to-hit.
    ToHitRanged,
    ToWound,
    ArmourSave,
    WardSave,
    /// Attacks and initiative for a round of combat.
    Strikes,
    ChargeRange,
    Movement,
    Psychology,
    CombatResult,
    Casting,
    Dispel,
}

impl std::fmt::Display for TestCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestCategory::ToHitMelee => "to-hit (melee)",
            TestCategory::ToHitRanged => "to-hit (ranged)",
            TestCategory::ToWound => "to-wound",
            TestCategory::ArmourSave => "armour save",
            TestCategory::WardSave => "ward save",
            TestCategory::Strikes => "strikes",
            TestCategory::ChargeRange => "charge range",
            TestCategory::Movement => "movement",
            TestCategory::Psychology => "psychology",
            TestCategory::CombatResult => "combat result",
            TestCategory::Casting => "casting",
            TestCategory::Dispel => "dispel",
        };
        f.write_str(s)
    }
}

/// How a modifier changes a fact.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModifierOp {
    /// Add a signed delta to an integer fact. Adds stack.
    Add(i64),
    /// Replace the fact. Sets on the same fact are mutually exclusive.
    Set(FactValue),
}

/// One fact change declared by a rule.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModifierEffect {
    /// Fact changed.
    pub fact: String,
    /// Change.
    pub op: ModifierOp,
}

/// A special rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialRule {
    /// Unique identifier.
    pub id: RuleId,

    /// Display name.
    pub name: String,

    /// Attachment and specificity class.
    pub scope: RuleScope,

    /// Which side must carry the rule.
    pub bearer: Bearer,

    /// Tests the rule contributes to.
    pub categories: Vec<TestCategory>,

    /// When the rule applies, from the acting side's point of view.
    pub condition: RuleCondition,

    /// Fact changes.
    pub effects: Vec<ModifierEffect>,

    /// Where the rule is written.
    pub citation: Citation,
}

impl SpecialRule {
    /// Create a rule with no effects that always applies.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        scope: RuleScope,
        citation: Citation,
    ) -> Self {
        Self {
            id: RuleId::new(id),
            name: name.into(),
            scope,
            bearer: Bearer::default(),
            categories: Vec::new(),
            condition: RuleCondition::Always,
            effects: Vec::new(),
            citation,
        }
    }

    /// Add a test category (builder pattern).
    #[must_use]
    pub fn applies_to(mut self, category: TestCategory) -> Self {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
        self
    }

    /// Set the bearer (builder pattern).
    #[must_use]
    pub fn borne_by(mut self, bearer: Bearer) -> Self {
        self.bearer = bearer;
        self
    }

    /// Set the condition (builder pattern).
    #[must_use]
    pub fn when(mut self, condition: RuleCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Add a delta to an integer fact (builder pattern).
    #[must_use]
    pub fn add(mut self, fact: impl Into<String>, delta: i64) -> Self {
        self.effects.push(ModifierEffect {
            fact: fact.into(),
            op: ModifierOp::Add(delta),
        });
        self
    }

    /// Set a fact to an absolute value (builder pattern).
    #[must_use]
    pub fn set(mut self, fact: impl Into<String>, value: impl Into<FactValue>) -> Self {
        self.effects.push(ModifierEffect {
            fact: fact.into(),
            op: ModifierOp::Set(value.into()),
        });
        self
    }

    /// Whether the rule contributes to a test category.
    #[must_use]
    pub fn applies_in(&self, category: TestCategory) -> bool {
        self.categories.contains(&category)
    }

    /// Whether the rule applies when carried by the actor (`true`) or by
    /// the opponent (`false`).
    #[must_use]
    pub fn applies_for(&self, carried_by_actor: bool) -> bool {
        match self.bearer {
            Bearer::Either => true,
            Bearer::Actor => carried_by_actor,
            Bearer::Opponent => !carried_by_actor,
        }
    }
}
