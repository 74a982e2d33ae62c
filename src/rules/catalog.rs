//! Rule catalog.
//!
//! The `RuleCatalog` holds everything the engine treats as rules data:
//! decision tables, special rules, spells, the precedence policy and the
//! engine constants. It is built once through [`RuleCatalogBuilder`],
//! checked for dangling and duplicate ids, and shared read-only for the
//! rest of the game.
//!
//! ## Example
//!
//! ```
//! use rust_wargame::explain::Citation;
//! use rust_wargame::rules::{RuleCatalog, RuleId, RuleScope, SpecialRule, TestCategory};
//! use rust_wargame::tables::facts;
//!
//! let catalog = RuleCatalog::builder()
//!     .rule(
//!         SpecialRule::new("hatred", "Hatred", RuleScope::Unit, Citation::new("Core Rules", 90))
//!             .applies_to(TestCategory::ToHitMelee)
//!             .add(facts::TO_HIT_BONUS, 1),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(catalog.rule(&RuleId::new("hatred")).is_ok());
//! assert!(catalog.table(&"to_wound".into()).is_ok());
//! ```

use rustc_hash::FxHashMap;
use tracing::info;

use crate::army::{Spell, SpellId};
use crate::core::{EngineConfig, Result, RulesError};
use crate::explain::Citation;
use crate::modifiers::{PrecedencePolicy, RuleCondition};
use crate::tables::{facts, standard, standard_tables, validate, DecisionTable, Evaluation, FactVector, TableId};

use super::special::{RuleId, RuleScope, SpecialRule, TestCategory};

/// Tables every catalog must provide.
const REQUIRED_TABLES: [&str; 9] = [
    standard::TO_HIT_MELEE,
    standard::TO_HIT_RANGED,
    standard::TO_WOUND,
    standard::ARMOUR_SAVE,
    standard::WARD_SAVE,
    standard::LEADERSHIP_TEST,
    standard::CASTING_ROLL,
    standard::MISCAST,
    standard::DISPEL_ROLL,
];

/// Id of the core long range rule.
pub const LONG_RANGE: &str = "long_range";

/// Validated rules data.
#[derive(Clone, Debug)]
pub struct RuleCatalog {
    tables: FxHashMap<TableId, DecisionTable>,
    rules: FxHashMap<RuleId, SpecialRule>,
    spells: FxHashMap<SpellId, Spell>,
    /// Rules applied to every test, carried by the acting side.
    core_rules: Vec<RuleId>,
    policy: PrecedencePolicy,
    config: EngineConfig,
}

impl RuleCatalog {
    /// Start a catalog with the core tables and core rules.
    #[must_use]
    pub fn builder() -> RuleCatalogBuilder {
        RuleCatalogBuilder::new()
    }

    /// The standard catalog: core tables and rules, default policy.
    pub fn standard() -> Result<Self> {
        Self::builder().build()
    }

    /// Look up a table.
    pub fn table(&self, id: &TableId) -> Result<&DecisionTable> {
        self.tables
            .get(id)
            .ok_or_else(|| RulesError::UnknownTable(id.clone()))
    }

    /// Evaluate a table by id.
    pub fn evaluate(&self, id: &str, facts: &FactVector) -> Result<Evaluation> {
        self.table(&TableId::new(id))?.evaluate(facts)
    }

    /// Look up a special rule.
    pub fn rule(&self, id: &RuleId) -> Result<&SpecialRule> {
        self.rules
            .get(id)
            .ok_or_else(|| RulesError::UnknownRule(id.clone()))
    }

    /// Look up a spell.
    pub fn spell(&self, id: &SpellId) -> Result<&Spell> {
        self.spells
            .get(id)
            .ok_or_else(|| RulesError::UnknownSpell(id.clone()))
    }

    /// Rules in scope for every test.
    #[must_use]
    pub fn core_rules(&self) -> &[RuleId] {
        &self.core_rules
    }

    /// Stacking precedence policy.
    #[must_use]
    pub fn policy(&self) -> &PrecedencePolicy {
        &self.policy
    }

    /// Engine constants.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Iterate over every table.
    pub fn tables(&self) -> impl Iterator<Item = &DecisionTable> {
        self.tables.values()
    }

    /// Iterate over every special rule.
    pub fn rules(&self) -> impl Iterator<Item = &SpecialRule> {
        self.rules.values()
    }

    /// Iterate over every spell.
    pub fn spells(&self) -> impl Iterator<Item = &Spell> {
        self.spells.values()
    }
}

/// Builder for [`RuleCatalog`].
#[derive(Clone, Debug)]
pub struct RuleCatalogBuilder {
    tables: Vec<DecisionTable>,
    replacements: Vec<DecisionTable>,
    rules: Vec<SpecialRule>,
    spells: Vec<Spell>,
    core_rules: Vec<RuleId>,
    policy: PrecedencePolicy,
    config: EngineConfig,
    include_standard: bool,
}

impl Default for RuleCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleCatalogBuilder {
    /// Builder with the core tables and core rules included.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            replacements: Vec::new(),
            rules: Vec::new(),
            spells: Vec::new(),
            core_rules: Vec::new(),
            policy: PrecedencePolicy::default(),
            config: EngineConfig::default(),
            include_standard: true,
        }
    }

    /// Builder with nothing included. Every required table must then be
    /// supplied by hand.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            include_standard: false,
            ..Self::new()
        }
    }

    /// Add a table (builder pattern). Duplicate ids fail at build time.
    #[must_use]
    pub fn table(mut self, table: DecisionTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Replace a table with the same id, e.g. with an FAQ-revised version
    /// (builder pattern).
    #[must_use]
    pub fn replace_table(mut self, table: DecisionTable) -> Self {
        self.replacements.push(table);
        self
    }

    /// Add a special rule (builder pattern).
    #[must_use]
    pub fn rule(mut self, rule: SpecialRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a rule applied to every test (builder pattern).
    #[must_use]
    pub fn core_rule(mut self, rule: SpecialRule) -> Self {
        self.core_rules.push(rule.id.clone());
        self.rules.push(rule);
        self
    }

    /// Add a spell (builder pattern).
    #[must_use]
    pub fn spell(mut self, spell: Spell) -> Self {
        self.spells.push(spell);
        self
    }

    /// Set the precedence policy (builder pattern).
    #[must_use]
    pub fn policy(mut self, policy: PrecedencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the engine constants (builder pattern).
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate and build the catalog.
    ///
    /// Every table is checked again here, however it was obtained. Fails
    /// with `AmbiguousTable` or `InvalidFact` when a table is malformed and with
    /// `InvalidCatalog` for duplicate ids, missing required tables and
    /// references to undefined rules.
    pub fn build(self) -> Result<RuleCatalog> {
        let mut tables: FxHashMap<TableId, DecisionTable> = FxHashMap::default();
        let mut rules: FxHashMap<RuleId, SpecialRule> = FxHashMap::default();
        let mut spells: FxHashMap<SpellId, Spell> = FxHashMap::default();
        let mut core_rules = Vec::new();

        if self.include_standard {
            for table in standard_tables()? {
                tables.insert(table.id().clone(), table);
            }
            let long_range = long_range_rule();
            core_rules.push(long_range.id.clone());
            rules.insert(long_range.id.clone(), long_range);
        }

        for table in self.tables {
            validate::validate(&table)?;
            if tables.contains_key(table.id()) {
                return Err(duplicate("table", table.id()));
            }
            tables.insert(table.id().clone(), table);
        }
        for table in self.replacements {
            validate::validate(&table)?;
            tables.insert(table.id().clone(), table);
        }
        for rule in self.rules {
            if rules.contains_key(&rule.id) {
                return Err(duplicate("rule", &rule.id));
            }
            rules.insert(rule.id.clone(), rule);
        }
        for spell in self.spells {
            if spells.contains_key(&spell.id) {
                return Err(duplicate("spell", &spell.id));
            }
            spells.insert(spell.id.clone(), spell);
        }
        core_rules.extend(self.core_rules);

        for id in REQUIRED_TABLES {
            if !tables.contains_key(&TableId::new(id)) {
                return Err(RulesError::InvalidCatalog(format!("missing required table {}", id)));
            }
        }
        for spell in spells.values() {
            for rule in spell.effect.granted_rules() {
                if !rules.contains_key(rule) {
                    return Err(RulesError::InvalidCatalog(format!(
                        "spell {} grants undefined rule {}",
                        spell.id, rule
                    )));
                }
            }
        }
        for (winner, loser) in self.policy.explicit_pairs() {
            for id in [winner, loser] {
                if !rules.contains_key(id) {
                    return Err(RulesError::InvalidCatalog(format!(
                        "precedence policy names undefined rule {}",
                        id
                    )));
                }
            }
        }

        info!(
            tables = tables.len(),
            rules = rules.len(),
            spells = spells.len(),
            "rule catalog loaded"
        );

        Ok(RuleCatalog {
            tables,
            rules,
            spells,
            core_rules,
            policy: self.policy,
            config: self.config,
        })
    }
}

fn duplicate(kind: &str, id: &dyn std::fmt::Display) -> RulesError {
    RulesError::InvalidCatalog(format!("duplicate {} {}", kind, id))
}

/// Shooting beyond half range: -1 to hit.
fn long_range_rule() -> SpecialRule {
    SpecialRule::new(
        LONG_RANGE,
        "Long Range",
        RuleScope::Global,
        Citation::new("Core Rules", 61).with_section("Long Range"),
    )
    .applies_to(TestCategory::ToHitRanged)
    .when(RuleCondition::LongRange)
    .add(facts::BALLISTIC_SKILL, -1)
}
