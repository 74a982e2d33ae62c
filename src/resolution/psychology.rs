//! Leadership tests.
//!
//! Break, panic and rally tests are all 2D6 against leadership. A double
//! one always passes (insane courage). Break tests apply the lost combat
//! result as a penalty unless the unit is stubborn or steadfast.

use serde::{Deserialize, Serialize};

use crate::core::{GameState, Result, UnitId};
use crate::explain::{Provenance, TraceEntry};
use crate::modifiers::{resolve_modifiers, ModifierContext};
use crate::rules::{RuleCatalog, TestCategory};
use crate::tables::{facts, standard, FactVector};

use super::dice::{total, DiceSource};
use super::step::{Step, StepResult};

/// Kind of leadership test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    /// After losing a round of combat by `lost_by`.
    Break { lost_by: u32, steadfast: bool },
    /// After nearby friends break or heavy shooting casualties.
    Panic,
    /// A fleeing unit trying to stop.
    Rally,
}

impl TestKind {
    /// Tag passed to rule conditions.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            TestKind::Break { .. } => "break_test",
            TestKind::Panic => "panic_test",
            TestKind::Rally => "rally_test",
        }
    }
}

/// Outcome of a leadership test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadershipResult {
    pub unit: UnitId,
    pub kind: TestKind,
    /// Leadership tested against, after modifiers and penalties.
    pub leadership: i64,
    /// 2D6 total.
    pub roll: i64,
    pub passed: bool,
    pub step: StepResult,
}

impl Provenance for LeadershipResult {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.step.provenance(out);
    }
}

/// Take a leadership test.
pub fn leadership_test(
    state: &GameState,
    catalog: &RuleCatalog,
    unit: UnitId,
    kind: TestKind,
    dice: &mut dyn DiceSource,
) -> Result<LeadershipResult> {
    let tester = state.unit(unit)?;
    let penalty = match kind {
        TestKind::Break { lost_by, .. } => -i64::from(lost_by),
        _ => 0,
    };
    let situation = FactVector::new()
        .with_int(facts::LEADERSHIP, i64::from(tester.leadership()))
        .with_int(facts::LEADERSHIP_MODIFIER, penalty)
        .with_bool(facts::STUBBORN, false);
    let ctx = ModifierContext::new(TestCategory::Psychology, unit, situation).tagged(kind.tag());
    let modifiers = resolve_modifiers(state, catalog, &ctx)?;

    let ignores_penalty = match kind {
        TestKind::Break { steadfast, .. } => steadfast || modifiers.flag(facts::STUBBORN),
        _ => false,
    };
    let mut leadership = modifiers.int_or(facts::LEADERSHIP, 0);
    if !ignores_penalty {
        leadership += modifiers.int_or(facts::LEADERSHIP_MODIFIER, 0);
    }
    let leadership = leadership.clamp(0, 10);

    let draws = dice.d6(2)?;
    let roll = total(&draws);
    let test_facts = FactVector::new()
        .with_bool(facts::INSANE_COURAGE, draws.iter().all(|&d| d == 1))
        .with_int(facts::MARGIN, leadership - roll);
    let ruling = catalog.evaluate(standard::LEADERSHIP_TEST, &test_facts)?.require()?;
    let passed = ruling.bool(facts::PASSED)?;

    Ok(LeadershipResult {
        unit,
        kind,
        leadership,
        roll,
        passed,
        step: StepResult {
            step: Step::Leadership,
            modifiers,
            ruling,
            target: leadership,
            draws,
            successes: u32::from(passed),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::{Profile, TroopType, Unit};
    use crate::core::PlayerId;
    use crate::explain::Citation;
    use crate::modifiers::RuleCondition;
    use crate::resolution::ScriptedDice;
    use crate::rules::{RuleScope, SpecialRule};

    fn setup(rules: &[&str]) -> (GameState, UnitId) {
        let mut state = GameState::new(PlayerId::A);
        let mut unit = Unit::new(
            UnitId::new(0),
            "Spearmen",
            PlayerId::A,
            TroopType::Infantry,
            Profile::line([4, 3, 3, 3, 3, 1, 3, 1, 7]),
            20,
            5,
        );
        for r in rules {
            unit = unit.with_rule(*r);
        }
        let id = state.add_unit(unit).unwrap();
        (state, id)
    }

    fn catalog() -> RuleCatalog {
        RuleCatalog::builder()
            .rule(
                SpecialRule::new("stubborn", "Stubborn", RuleScope::Unit, Citation::new("Core Rules", 96))
                    .applies_to(TestCategory::Psychology)
                    .when(RuleCondition::Tag("break_test".to_string()))
                    .set(facts::STUBBORN, true),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_break_test_applies_penalty() {
        let (state, id) = setup(&[]);
        let mut dice = ScriptedDice::new(vec![3, 3]);
        let kind = TestKind::Break {
            lost_by: 2,
            steadfast: false,
        };
        let result = leadership_test(&state, &catalog(), id, kind, &mut dice).unwrap();
        assert_eq!(result.leadership, 5);
        assert_eq!(result.roll, 6);
        assert!(!result.passed);
    }

    #[test]
    fn test_stubborn_and_steadfast_ignore_penalty() {
        let (state, id) = setup(&["stubborn"]);
        let mut dice = ScriptedDice::new(vec![3, 3, 3, 3]);
        let kind = TestKind::Break {
            lost_by: 2,
            steadfast: false,
        };
        let result = leadership_test(&state, &catalog(), id, kind, &mut dice).unwrap();
        assert_eq!(result.leadership, 7);
        assert!(result.passed);

        let (state, id) = setup(&[]);
        let kind = TestKind::Break {
            lost_by: 2,
            steadfast: true,
        };
        let result = leadership_test(&state, &catalog(), id, kind, &mut dice).unwrap();
        assert!(result.passed);
    }

    #[test]
    fn test_insane_courage() {
        let (state, id) = setup(&[]);
        let mut dice = ScriptedDice::new(vec![1, 1]);
        let kind = TestKind::Break {
            lost_by: 10,
            steadfast: false,
        };
        let result = leadership_test(&state, &catalog(), id, kind, &mut dice).unwrap();
        assert_eq!(result.leadership, 0);
        assert!(result.passed);
        assert_eq!(result.step.ruling.rule.as_str(), "insane_courage");
    }

    #[test]
    fn test_rally_uses_plain_leadership() {
        let (state, id) = setup(&["stubborn"]);
        let mut dice = ScriptedDice::new(vec![4, 4]);
        let result = leadership_test(&state, &catalog(), id, TestKind::Rally, &mut dice).unwrap();
        assert!(!result.passed);
        assert!(result.step.modifiers.applied.is_empty());
    }
}
