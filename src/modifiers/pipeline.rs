//! Modifier resolution.
//!
//! `resolve_modifiers` turns the special rules in scope of a pending test
//! into a single fact vector:
//!
//! 1. enumerate rule sources for both sides (core rules, army rules, unit
//!    rules, the acting character and its items, the weapon in use,
//!    terrain, spell effects)
//! 2. keep rules that apply to the test category, to the side carrying
//!    them, and whose condition holds
//! 3. expand each rule into modifiers and sort them canonically
//! 4. per fact, pick one `Set` through the [`PrecedencePolicy`] and add
//!    every `Add` on top
//!
//! The canonical sort makes the result independent of the order rules
//! were attached, and the function reads nothing but its arguments, so
//! calling it twice gives the same vector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{CharacterId, GameState, Result, RulesError, UnitId};
use crate::explain::{Citation, Provenance, TraceEntry};
use crate::rules::{ModifierOp, RuleCatalog, RuleId, RuleScope, TestCategory};
use crate::tables::{FactValue, FactVector};

use super::condition::{ConditionContext, ConditionEvaluator};
use super::policy::{Candidate, PrecedenceStage};

/// A weapon held by a unit or one of its characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponRef {
    pub unit: UnitId,
    pub character: Option<CharacterId>,
    pub index: usize,
}

impl WeaponRef {
    /// A rank-and-file weapon.
    #[must_use]
    pub fn unit(unit: UnitId, index: usize) -> Self {
        Self {
            unit,
            character: None,
            index,
        }
    }

    /// A character's weapon.
    #[must_use]
    pub fn character(unit: UnitId, character: CharacterId, index: usize) -> Self {
        Self {
            unit,
            character: Some(character),
            index,
        }
    }
}

/// Everything the pipeline needs to know about a pending test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifierContext {
    /// Test being resolved.
    pub category: TestCategory,
    /// The side making the test.
    pub actor: UnitId,
    /// Character acting on behalf of the actor (a caster, a hero fighting).
    pub actor_character: Option<CharacterId>,
    /// The other side of the test.
    pub opponent: Option<UnitId>,
    /// Weapon in use, held by either side.
    pub weapon: Option<WeaponRef>,
    /// Base facts before modifiers.
    pub situation: FactVector,
    /// Free-form tags rules may test for.
    pub tags: Vec<String>,
}

impl ModifierContext {
    /// A context with no opponent, weapon or tags.
    #[must_use]
    pub fn new(category: TestCategory, actor: UnitId, situation: FactVector) -> Self {
        Self {
            category,
            actor,
            actor_character: None,
            opponent: None,
            weapon: None,
            situation,
            tags: Vec::new(),
        }
    }

    /// Set the opponent (builder pattern).
    #[must_use]
    pub fn against(mut self, opponent: UnitId) -> Self {
        self.opponent = Some(opponent);
        self
    }

    /// Set the acting character (builder pattern).
    #[must_use]
    pub fn by_character(mut self, character: CharacterId) -> Self {
        self.actor_character = Some(character);
        self
    }

    /// Set the weapon in use (builder pattern).
    #[must_use]
    pub fn with_weapon(mut self, weapon: WeaponRef) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Add a tag (builder pattern).
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A modifier that changed the fact vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedModifier {
    pub fact: String,
    pub op: ModifierOp,
    pub rule: RuleId,
    /// Source the rule was found on.
    pub scope: RuleScope,
    pub citation: Citation,
}

/// Two `Set` modifiers with different values decided by favourability or
/// rule order rather than by explicit precedence or specificity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictFlag {
    pub fact: String,
    pub winner: RuleId,
    pub loser: RuleId,
    pub decided_by: PrecedenceStage,
}

impl std::fmt::Display for ConflictFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} over {} on `{}` by {}",
            self.winner, self.loser, self.fact, self.decided_by
        )
    }
}

/// Result of modifier resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFacts {
    /// Situation facts with every modifier applied.
    pub facts: FactVector,
    /// Modifiers that took effect, in canonical order.
    pub applied: Vec<AppliedModifier>,
    /// Precedence decisions flagged for review.
    pub conflicts: Vec<ConflictFlag>,
}

impl ResolvedFacts {
    /// Integer fact, or `default` when absent.
    #[must_use]
    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        self.facts.int(name).unwrap_or(default)
    }

    /// Boolean fact, `false` when absent.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.facts.bool(name).unwrap_or(false)
    }
}

impl Provenance for ResolvedFacts {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        for m in &self.applied {
            let op = match &m.op {
                ModifierOp::Add(d) => format!("{:+}", d),
                ModifierOp::Set(v) => format!("= {}", v),
            };
            out.push(TraceEntry::new(
                format!("modifier {} {} ({})", m.fact, op, m.scope),
                m.rule.clone(),
                m.citation.clone(),
            ));
        }
    }
}

/// One rule attachment found while enumerating sources.
struct Source {
    rule: RuleId,
    scope: RuleScope,
    carried_by_actor: bool,
}

fn push_sources<'a>(
    out: &mut Vec<Source>,
    rules: impl IntoIterator<Item = &'a RuleId>,
    scope: RuleScope,
    carried_by_actor: bool,
) {
    out.extend(rules.into_iter().map(|rule| Source {
        rule: rule.clone(),
        scope,
        carried_by_actor,
    }));
}

fn collect_sources(state: &GameState, catalog: &RuleCatalog, ctx: &ModifierContext) -> Result<Vec<Source>> {
    let mut sources = Vec::new();
    push_sources(&mut sources, catalog.core_rules(), RuleScope::Global, true);

    let sides = std::iter::once((ctx.actor, true)).chain(ctx.opponent.map(|o| (o, false)));
    for (id, is_actor) in sides {
        let unit = state.unit(id)?;
        push_sources(&mut sources, state.army_rules(unit.owner), RuleScope::Global, is_actor);
        push_sources(&mut sources, unit.carried_rules(), RuleScope::Unit, is_actor);

        for feature in state.terrain_at(unit.position) {
            push_sources(&mut sources, &feature.rules, RuleScope::Terrain, is_actor);
        }
        for effect in state.effects_on(id) {
            let spell = catalog.spell(&effect.spell)?;
            push_sources(&mut sources, spell.effect.granted_rules(), RuleScope::SpellEffect, is_actor);
        }

        if is_actor {
            if let Some(cid) = ctx.actor_character {
                let character = unit
                    .character(cid)
                    .ok_or(RulesError::UnknownCharacter(cid))?;
                push_sources(&mut sources, character.carried_rules(), RuleScope::Character, true);
            }
        }

        if let Some(weapon) = ctx.weapon.filter(|w| w.unit == id) {
            let weapons = match weapon.character {
                Some(cid) => {
                    &unit
                        .character(cid)
                        .ok_or(RulesError::UnknownCharacter(cid))?
                        .weapons
                }
                None => &unit.weapons,
            };
            let w = weapons.get(weapon.index).ok_or_else(|| {
                RulesError::InvalidAction(format!("{} has no weapon {}", unit.id, weapon.index))
            })?;
            push_sources(&mut sources, &w.rules, RuleScope::Weapon, is_actor);
        }
    }
    Ok(sources)
}

/// Resolve every modifier applicable to a pending test.
///
/// Fails with `UnknownUnit`, `UnknownRule` or `UnknownSpell` when the
/// context or the state names something the catalog does not know.
pub fn resolve_modifiers(
    state: &GameState,
    catalog: &RuleCatalog,
    ctx: &ModifierContext,
) -> Result<ResolvedFacts> {
    let actor = state.unit(ctx.actor)?;
    let opponent = ctx.opponent.map(|o| state.unit(o)).transpose()?;
    let sources = collect_sources(state, catalog, ctx)?;

    // (fact, rule, op) -> most specific scope the rule was found on.
    // A rule never stacks with itself.
    let policy = catalog.policy();
    let mut found: BTreeMap<(String, RuleId, ModifierOp), RuleScope> = BTreeMap::new();

    for source in sources {
        let rule = catalog.rule(&source.rule)?;
        if !rule.applies_in(ctx.category) || !rule.applies_for(source.carried_by_actor) {
            continue;
        }
        let cond_ctx = ConditionContext {
            category: ctx.category,
            actor,
            opponent,
            facts: &ctx.situation,
            state,
            tags: &ctx.tags,
        };
        if !ConditionEvaluator::evaluate(&rule.condition, &cond_ctx) {
            continue;
        }
        for effect in &rule.effects {
            let key = (effect.fact.clone(), rule.id.clone(), effect.op.clone());
            found
                .entry(key)
                .and_modify(|scope| {
                    if policy.specificity_rank(source.scope) < policy.specificity_rank(*scope) {
                        *scope = source.scope;
                    }
                })
                .or_insert(source.scope);
        }
    }

    let mut by_fact: BTreeMap<String, Vec<(RuleId, ModifierOp, RuleScope)>> = BTreeMap::new();
    for ((fact, rule, op), scope) in found {
        by_fact.entry(fact).or_default().push((rule, op, scope));
    }

    let mut out = ResolvedFacts {
        facts: ctx.situation.clone(),
        ..ResolvedFacts::default()
    };

    for (fact, modifiers) in by_fact {
        let sets: Vec<_> = modifiers
            .iter()
            .filter_map(|(rule, op, scope)| match op {
                ModifierOp::Set(v) => Some((rule, v, *scope)),
                ModifierOp::Add(_) => None,
            })
            .collect();

        let mut value = ctx.situation.get(&fact).cloned();

        if !sets.is_empty() {
            let candidates: Vec<Candidate> = sets
                .iter()
                .map(|(rule, v, scope)| Candidate {
                    rule,
                    scope: *scope,
                    value: v,
                })
                .collect();
            if let Some((winner, beaten)) = policy.choose(&fact, &candidates) {
                let (rule, v, scope) = sets[winner];
                for (loser, stage) in beaten {
                    let contested = matches!(
                        stage,
                        PrecedenceStage::Favourability | PrecedenceStage::RuleOrder
                    );
                    if contested && sets[loser].1 != v {
                        out.conflicts.push(ConflictFlag {
                            fact: fact.clone(),
                            winner: rule.clone(),
                            loser: sets[loser].0.clone(),
                            decided_by: stage,
                        });
                    }
                }
                value = Some(v.clone());
                out.applied.push(AppliedModifier {
                    fact: fact.clone(),
                    op: ModifierOp::Set(v.clone()),
                    rule: rule.clone(),
                    scope,
                    citation: catalog.rule(rule)?.citation.clone(),
                });
            }
        }

        let mut total = 0_i64;
        let mut any_add = false;
        for (rule, op, scope) in &modifiers {
            if let ModifierOp::Add(delta) = op {
                total += delta;
                any_add = true;
                out.applied.push(AppliedModifier {
                    fact: fact.clone(),
                    op: op.clone(),
                    rule: rule.clone(),
                    scope: *scope,
                    citation: catalog.rule(rule)?.citation.clone(),
                });
            }
        }
        if any_add {
            value = match value {
                None => Some(FactValue::Int(total)),
                Some(FactValue::Int(v)) => Some(FactValue::Int(v + total)),
                Some(other) => {
                    return Err(RulesError::InvalidAction(format!(
                        "cannot add to {} fact `{}` in {} test",
                        other.type_name(),
                        fact,
                        ctx.category
                    )))
                }
            };
        }

        if let Some(v) = value {
            out.facts.set(fact, v);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::{Character, Profile, TroopType, Unit, Weapon};
    use crate::core::PlayerId;
    use crate::explain::Citation;
    use crate::modifiers::RuleCondition;
    use crate::rules::{Bearer, SpecialRule};
    use crate::tables::facts;

    fn cite() -> Citation {
        Citation::new("Test Rules", 9)
    }

    fn catalog() -> RuleCatalog {
        RuleCatalog::builder()
            .rule(
                SpecialRule::new("hatred", "Hatred", RuleScope::Unit, cite())
                    .applies_to(TestCategory::ToHitMelee)
                    .when(RuleCondition::FirstRoundOfCombat)
                    .add(facts::TO_HIT_BONUS, 1),
            )
            .rule(
                SpecialRule::new("drilled", "Drilled", RuleScope::Unit, cite())
                    .applies_to(TestCategory::ToHitMelee)
                    .add(facts::TO_HIT_BONUS, 1),
            )
            .rule(
                SpecialRule::new("always_3", "Always Hits on 3+", RuleScope::Unit, cite())
                    .applies_to(TestCategory::ToHitMelee)
                    .set(facts::FIXED_TO_HIT, 3),
            )
            .rule(
                SpecialRule::new("always_4", "Always Hits on 4+", RuleScope::Unit, cite())
                    .applies_to(TestCategory::ToHitMelee)
                    .set(facts::FIXED_TO_HIT, 4),
            )
            .rule(
                SpecialRule::new("blessed_blade", "Blessed Blade", RuleScope::Character, cite())
                    .applies_to(TestCategory::ToHitMelee)
                    .set(facts::FIXED_TO_HIT, 5),
            )
            .rule(
                SpecialRule::new("scaly_skin", "Scaly Skin", RuleScope::Unit, cite())
                    .applies_to(TestCategory::ToHitMelee)
                    .borne_by(Bearer::Opponent)
                    .add(facts::TO_HIT_BONUS, -1),
            )
            .rule(
                SpecialRule::new("great_weapon", "Great Weapon", RuleScope::Weapon, cite())
                    .applies_to(TestCategory::ToWound)
                    .add(facts::STRENGTH, 2),
            )
            .build()
            .unwrap()
    }

    fn unit(owner: PlayerId, rules: &[&str]) -> Unit {
        let mut u = Unit::new(
            UnitId::new(0),
            "Warriors",
            owner,
            TroopType::Infantry,
            Profile::line([4, 4, 3, 3, 3, 1, 3, 1, 7]),
            10,
            5,
        );
        for r in rules {
            u = u.with_rule(*r);
        }
        u
    }

    fn situation() -> FactVector {
        FactVector::new()
            .with_int(facts::ATTACKER_WS, 4)
            .with_int(facts::DEFENDER_WS, 3)
            .with_int(facts::FIXED_TO_HIT, 0)
            .with_int(facts::TO_HIT_BONUS, 0)
            .with_bool(facts::FIRST_ROUND, true)
    }

    fn resolve(state: &GameState, actor: UnitId, opponent: UnitId) -> ResolvedFacts {
        let ctx = ModifierContext::new(TestCategory::ToHitMelee, actor, situation()).against(opponent);
        resolve_modifiers(state, &catalog(), &ctx).unwrap()
    }

    #[test]
    fn test_adds_stack() {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(unit(PlayerId::A, &["hatred", "drilled"])).unwrap();
        let b = state.add_unit(unit(PlayerId::B, &[])).unwrap();

        let resolved = resolve(&state, a, b);
        assert_eq!(resolved.facts.int(facts::TO_HIT_BONUS), Some(2));
        assert_eq!(resolved.applied.len(), 2);
        assert!(resolved.conflicts.is_empty());
    }

    #[test]
    fn test_rule_does_not_stack_with_itself() {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(unit(PlayerId::A, &["drilled"])).unwrap();
        let b = state.add_unit(unit(PlayerId::B, &[])).unwrap();
        state.set_army_rules(PlayerId::A, vec![RuleId::new("drilled")]);

        let resolved = resolve(&state, a, b);
        assert_eq!(resolved.facts.int(facts::TO_HIT_BONUS), Some(1));
        assert_eq!(resolved.applied[0].scope, RuleScope::Unit);
    }

    #[test]
    fn test_opponent_borne_rule() {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(unit(PlayerId::A, &["scaly_skin"])).unwrap();
        let b = state.add_unit(unit(PlayerId::B, &["scaly_skin"])).unwrap();

        // Only the opponent's copy applies.
        let resolved = resolve(&state, a, b);
        assert_eq!(resolved.facts.int(facts::TO_HIT_BONUS), Some(-1));
    }

    #[test]
    fn test_equal_specificity_sets_are_flagged() {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(unit(PlayerId::A, &["always_4", "always_3"])).unwrap();
        let b = state.add_unit(unit(PlayerId::B, &[])).unwrap();

        let resolved = resolve(&state, a, b);
        assert_eq!(resolved.facts.int(facts::FIXED_TO_HIT), Some(3));
        assert_eq!(resolved.conflicts.len(), 1);
        assert_eq!(resolved.conflicts[0].winner, RuleId::new("always_3"));
        assert_eq!(resolved.conflicts[0].decided_by, PrecedenceStage::Favourability);
    }

    #[test]
    fn test_character_beats_unit() {
        let mut state = GameState::new(PlayerId::A);
        let hero = Character::new(CharacterId::new(0), "Captain", Profile::line([4, 5, 5, 4, 4, 2, 5, 3, 8]))
            .with_rule("blessed_blade");
        let a = state
            .add_unit(unit(PlayerId::A, &["always_3"]).with_character(hero))
            .unwrap();
        let b = state.add_unit(unit(PlayerId::B, &[])).unwrap();
        let cid = state.unit(a).unwrap().characters[0].id;

        let ctx = ModifierContext::new(TestCategory::ToHitMelee, a, situation())
            .against(b)
            .by_character(cid);
        let resolved = resolve_modifiers(&state, &catalog(), &ctx).unwrap();
        assert_eq!(resolved.facts.int(facts::FIXED_TO_HIT), Some(5));
        assert!(resolved.conflicts.is_empty());
    }

    #[test]
    fn test_weapon_rules_follow_the_holder() {
        let mut state = GameState::new(PlayerId::A);
        let a = state
            .add_unit(unit(PlayerId::A, &[]).with_weapon(Weapon::melee("Great Weapon").with_rule("great_weapon")))
            .unwrap();
        let b = state.add_unit(unit(PlayerId::B, &[])).unwrap();

        let ctx = ModifierContext::new(TestCategory::ToWound, a, FactVector::new().with_int(facts::STRENGTH, 3))
            .against(b)
            .with_weapon(WeaponRef::unit(a, 0));
        let resolved = resolve_modifiers(&state, &catalog(), &ctx).unwrap();
        assert_eq!(resolved.facts.int(facts::STRENGTH), Some(5));
    }

    #[test]
    fn test_condition_filters_rules() {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(unit(PlayerId::A, &["hatred"])).unwrap();
        let b = state.add_unit(unit(PlayerId::B, &[])).unwrap();

        let ctx = ModifierContext::new(
            TestCategory::ToHitMelee,
            a,
            situation().with_bool(facts::FIRST_ROUND, false),
        )
        .against(b);
        let resolved = resolve_modifiers(&state, &catalog(), &ctx).unwrap();
        assert_eq!(resolved.facts.int(facts::TO_HIT_BONUS), Some(0));
        assert!(resolved.applied.is_empty());
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(unit(PlayerId::A, &["hatred", "always_4", "drilled", "always_3"])).unwrap();
        let c = state.add_unit(unit(PlayerId::A, &["always_3", "drilled", "always_4", "hatred"])).unwrap();
        let b = state.add_unit(unit(PlayerId::B, &[])).unwrap();

        let first = resolve(&state, a, b);
        assert_eq!(first, resolve(&state, a, b));
        assert_eq!(first, resolve(&state, c, b));
    }

    #[test]
    fn test_unknown_rule_is_an_error() {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(unit(PlayerId::A, &["no_such_rule"])).unwrap();
        let b = state.add_unit(unit(PlayerId::B, &[])).unwrap();
        let ctx = ModifierContext::new(TestCategory::ToHitMelee, a, situation()).against(b);
        assert!(matches!(
            resolve_modifiers(&state, &catalog(), &ctx),
            Err(RulesError::UnknownRule(_))
        ));
    }
}
