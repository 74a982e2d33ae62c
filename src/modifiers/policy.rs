//! Precedence policy for mutually exclusive modifiers.
//!
//! Adds always stack. When two rules both `Set` the same fact, only one
//! can win, and the policy decides which. It is plain data so errata can
//! change it without touching code, and it is serialized with the catalog
//! so a ruling can be audited against the policy that produced it.
//!
//! Resolution order:
//!
//! 1. explicit `(winner, loser)` pairs, FAQ style
//! 2. specificity of the source the rule was found on
//! 3. the value most favourable to the acting side (if the tie-break
//!    allows it)
//! 4. rule id order
//!
//! Decisions reached at step 3 or 4 between different values are reported
//! as conflicts for rules-committee review.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::rules::{RuleId, RuleScope};
use crate::tables::{facts, FactValue};

/// Which direction of a fact favours the acting side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Preference {
    /// Larger values favour the actor.
    #[default]
    Higher,
    /// Smaller values favour the actor (target numbers, save values).
    Lower,
}

/// Last resort when explicit pairs and specificity do not decide.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TieBreak {
    /// Most favourable value to the actor, then rule id order.
    #[default]
    MostFavourable,
    /// Rule id order only.
    RuleOrder,
}

/// The step that decided between two competing modifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrecedenceStage {
    Explicit,
    Specificity,
    Favourability,
    RuleOrder,
}

impl std::fmt::Display for PrecedenceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrecedenceStage::Explicit => "explicit precedence",
            PrecedenceStage::Specificity => "specificity",
            PrecedenceStage::Favourability => "favourability",
            PrecedenceStage::RuleOrder => "rule order",
        };
        f.write_str(s)
    }
}

/// A competing `Set` modifier as seen by the policy.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub rule: &'a RuleId,
    pub scope: RuleScope,
    pub value: &'a FactValue,
}

/// Configurable precedence policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrecedencePolicy {
    /// Source scopes, most specific first. Unlisted scopes rank last.
    pub specificity: Vec<RuleScope>,

    /// `(winner, loser)` pairs consulted before anything else.
    pub explicit: Vec<(RuleId, RuleId)>,

    /// Favourable direction per fact. Unlisted facts prefer `Higher`.
    pub preferences: FxHashMap<String, Preference>,

    /// Final tie-break.
    pub tie_break: TieBreak,
}

impl Default for PrecedencePolicy {
    fn default() -> Self {
        let preferences = [
            facts::FIXED_TO_HIT,
            facts::ARMOUR,
            facts::WARD,
            facts::SAVE_VALUE,
            facts::WARD_VALUE,
        ]
        .into_iter()
        .map(|f| (f.to_string(), Preference::Lower))
        .collect();

        Self {
            specificity: vec![
                RuleScope::Character,
                RuleScope::Weapon,
                RuleScope::Unit,
                RuleScope::SpellEffect,
                RuleScope::Terrain,
                RuleScope::Global,
            ],
            explicit: Vec::new(),
            preferences,
            tie_break: TieBreak::default(),
        }
    }
}

impl PrecedencePolicy {
    /// Declare that `winner` beats `loser` (builder pattern).
    #[must_use]
    pub fn with_explicit(mut self, winner: impl Into<String>, loser: impl Into<String>) -> Self {
        self.explicit.push((RuleId::new(winner), RuleId::new(loser)));
        self
    }

    /// Set the favourable direction of a fact (builder pattern).
    #[must_use]
    pub fn with_preference(mut self, fact: impl Into<String>, preference: Preference) -> Self {
        self.preferences.insert(fact.into(), preference);
        self
    }

    /// Replace the specificity order (builder pattern).
    #[must_use]
    pub fn with_specificity(mut self, order: Vec<RuleScope>) -> Self {
        self.specificity = order;
        self
    }

    /// Set the tie-break (builder pattern).
    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Iterate over explicit `(winner, loser)` pairs.
    pub fn explicit_pairs(&self) -> impl Iterator<Item = (&RuleId, &RuleId)> {
        self.explicit.iter().map(|(w, l)| (w, l))
    }

    /// Favourable direction of a fact.
    #[must_use]
    pub fn preference(&self, fact: &str) -> Preference {
        self.preferences.get(fact).copied().unwrap_or_default()
    }

    /// Rank of a scope; lower is more specific.
    #[must_use]
    pub fn specificity_rank(&self, scope: RuleScope) -> usize {
        self.specificity
            .iter()
            .position(|s| *s == scope)
            .unwrap_or(self.specificity.len())
    }

    /// Compare two candidates. `Less` means `a` wins.
    pub fn compare(&self, fact: &str, a: &Candidate, b: &Candidate) -> (Ordering, PrecedenceStage) {
        if self.explicit.iter().any(|(w, l)| w == a.rule && l == b.rule) {
            return (Ordering::Less, PrecedenceStage::Explicit);
        }
        if self.explicit.iter().any(|(w, l)| w == b.rule && l == a.rule) {
            return (Ordering::Greater, PrecedenceStage::Explicit);
        }

        let spec = self
            .specificity_rank(a.scope)
            .cmp(&self.specificity_rank(b.scope));
        if spec != Ordering::Equal {
            return (spec, PrecedenceStage::Specificity);
        }

        if self.tie_break == TieBreak::MostFavourable {
            let fav = match self.preference(fact) {
                Preference::Higher => b.value.cmp(a.value),
                Preference::Lower => a.value.cmp(b.value),
            };
            if fav != Ordering::Equal {
                return (fav, PrecedenceStage::Favourability);
            }
        }

        (a.rule.cmp(b.rule), PrecedenceStage::RuleOrder)
    }

    /// Pick the winner among competing candidates.
    ///
    /// Returns the index of the winner and, for every candidate it beat,
    /// the stage that decided it. Candidates are assumed to be in a
    /// canonical order so the result does not depend on how the caller
    /// collected them.
    pub fn choose(&self, fact: &str, candidates: &[Candidate]) -> Option<(usize, Vec<(usize, PrecedenceStage)>)> {
        let mut best = 0;
        for i in 1..candidates.len() {
            let (ord, _) = self.compare(fact, &candidates[i], &candidates[best]);
            if ord == Ordering::Less {
                best = i;
            }
        }
        if candidates.is_empty() {
            return None;
        }
        let beaten = (0..candidates.len())
            .filter(|&i| i != best)
            .map(|i| {
                let (_, stage) = self.compare(fact, &candidates[best], &candidates[i]);
                (i, stage)
            })
            .collect();
        Some((best, beaten))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate<'a>(rule: &'a RuleId, scope: RuleScope, value: &'a FactValue) -> Candidate<'a> {
        Candidate { rule, scope, value }
    }

    #[test]
    fn test_specificity_beats_favourability() {
        let policy = PrecedencePolicy::default();
        let (unit_rule, army_rule) = (RuleId::new("a_unit"), RuleId::new("b_army"));
        let (three, two) = (FactValue::Int(3), FactValue::Int(2));

        let a = candidate(&unit_rule, RuleScope::Unit, &three);
        let b = candidate(&army_rule, RuleScope::Global, &two);
        assert_eq!(
            policy.compare(facts::FIXED_TO_HIT, &a, &b),
            (Ordering::Less, PrecedenceStage::Specificity)
        );
    }

    #[test]
    fn test_favourability_uses_fact_direction() {
        let policy = PrecedencePolicy::default();
        let (r1, r2) = (RuleId::new("r1"), RuleId::new("r2"));
        let (three, two) = (FactValue::Int(3), FactValue::Int(2));

        // Lower target numbers favour the attacker.
        let a = candidate(&r1, RuleScope::Unit, &three);
        let b = candidate(&r2, RuleScope::Unit, &two);
        let (ord, stage) = policy.compare(facts::FIXED_TO_HIT, &a, &b);
        assert_eq!(ord, Ordering::Greater);
        assert_eq!(stage, PrecedenceStage::Favourability);

        // Strength prefers higher.
        let (ord, _) = policy.compare(facts::STRENGTH, &a, &b);
        assert_eq!(ord, Ordering::Less);
    }

    #[test]
    fn test_explicit_pairs_win() {
        let policy = PrecedencePolicy::default().with_explicit("errata_rule", "old_rule");
        let (new, old) = (RuleId::new("errata_rule"), RuleId::new("old_rule"));
        let (three, two) = (FactValue::Int(3), FactValue::Int(2));

        let a = candidate(&new, RuleScope::Global, &three);
        let b = candidate(&old, RuleScope::Character, &two);
        assert_eq!(
            policy.compare(facts::FIXED_TO_HIT, &a, &b),
            (Ordering::Less, PrecedenceStage::Explicit)
        );
        assert_eq!(policy.explicit_pairs().count(), 1);
    }

    #[test]
    fn test_rule_order_tie_break() {
        let policy = PrecedencePolicy::default().with_tie_break(TieBreak::RuleOrder);
        let (r1, r2) = (RuleId::new("alpha"), RuleId::new("beta"));
        let (three, two) = (FactValue::Int(3), FactValue::Int(2));

        let a = candidate(&r2, RuleScope::Unit, &two);
        let b = candidate(&r1, RuleScope::Unit, &three);
        let (winner, beaten) = policy.choose(facts::FIXED_TO_HIT, &[a, b]).unwrap();
        assert_eq!(winner, 1);
        assert_eq!(beaten, vec![(0, PrecedenceStage::RuleOrder)]);
    }

    #[test]
    fn test_choose_empty() {
        assert!(PrecedencePolicy::default().choose("x", &[]).is_none());
    }

    #[test]
    fn test_serialization() {
        let policy = PrecedencePolicy::default().with_preference("charge_bonus", Preference::Higher);
        let json = serde_json::to_string(&policy).unwrap();
        let back: PrecedencePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }
}
