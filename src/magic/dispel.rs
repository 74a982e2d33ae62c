//! Dispelling pending casts and spells that remain in play.

use serde::{Deserialize, Serialize};

use crate::army::Unit;
use crate::core::{GameState, PlayerId, Result, RulesError};
use crate::explain::{Provenance, TraceEntry};
use crate::modifiers::{resolve_modifiers, ModifierContext};
use crate::resolution::{total, DiceSource, Step, StepResult};
use crate::rules::{RuleCatalog, TestCategory};
use crate::tables::{facts, standard, FactVector};

/// A dispel attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispelOutcome {
    pub player: PlayerId,
    /// Total the attempt had to equal or beat.
    pub against: i64,
    /// Dice total plus wizard level and dispel modifiers.
    pub dispel_total: i64,
    pub dispelled: bool,
    pub step: StepResult,
}

impl Provenance for DispelOutcome {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.step.provenance(out);
    }
}

/// Unit that leads a side's dispel attempts: the one with the best wizard,
/// or the first live unit when the side has none.
fn dispelling_unit(state: &GameState, player: PlayerId) -> Result<&Unit> {
    state
        .live_units_of(player)
        .max_by_key(|u| (u.best_wizard_level(), std::cmp::Reverse(u.id)))
        .ok_or_else(|| RulesError::InvalidAction(format!("{} has no unit that can dispel", player)))
}

/// Roll a dispel attempt of `dice` dice from `player`'s dispel pool
/// against a casting total.
///
/// The pool is checked but not spent; the caller spends it.
pub fn attempt_dispel(
    state: &GameState,
    catalog: &RuleCatalog,
    player: PlayerId,
    dice_count: u8,
    against: i64,
    dice: &mut dyn DiceSource,
) -> Result<DispelOutcome> {
    let max = catalog.config().max_dice_per_attempt;
    if dice_count == 0 || dice_count > max {
        return Err(RulesError::InvalidAction(format!(
            "a dispel attempt uses 1 to {} dice, not {}",
            max, dice_count
        )));
    }
    let available = state.pools().dispel[player];
    if dice_count > available {
        return Err(RulesError::InsufficientPool {
            player,
            requested: dice_count,
            available,
        });
    }

    let unit = dispelling_unit(state, player)?;
    let level = unit.best_wizard_level();
    let situation = FactVector::new().with_int(facts::DISPEL_BONUS, 0);
    let ctx = ModifierContext::new(TestCategory::Dispel, unit.id, situation);
    let modifiers = resolve_modifiers(state, catalog, &ctx)?;

    let draws = dice.d6(usize::from(dice_count))?;
    let dispel_total = total(&draws) + i64::from(level) + modifiers.int_or(facts::DISPEL_BONUS, 0);
    let ones = draws.iter().filter(|&&d| d == 1).count() as i64;
    let table_facts = FactVector::new()
        .with_int(facts::ONES, ones)
        .with_int(facts::MARGIN, dispel_total - against);
    let ruling = catalog.evaluate(standard::DISPEL_ROLL, &table_facts)?.require()?;
    let dispelled = ruling.bool(facts::DISPELLED)?;

    Ok(DispelOutcome {
        player,
        against,
        dispel_total,
        dispelled,
        step: StepResult {
            step: Step::Dispel,
            modifiers,
            ruling,
            target: against,
            draws,
            successes: u32::from(dispelled),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magic::tests_support::{catalog, setup};
    use crate::resolution::ScriptedDice;

    #[test]
    fn test_dispel_equal_total_succeeds() {
        let (state, ..) = setup();
        // Level 1 wizard on side B.
        let mut dice = ScriptedDice::new(vec![5, 3]);
        let outcome = attempt_dispel(&state, &catalog(), PlayerId::B, 2, 9, &mut dice).unwrap();
        assert_eq!(outcome.dispel_total, 9);
        assert!(outcome.dispelled);
    }

    #[test]
    fn test_dispel_short_fails() {
        let (state, ..) = setup();
        let mut dice = ScriptedDice::new(vec![2, 3]);
        let outcome = attempt_dispel(&state, &catalog(), PlayerId::B, 2, 9, &mut dice).unwrap();
        assert!(!outcome.dispelled);
    }

    #[test]
    fn test_double_one_always_fails() {
        let (state, ..) = setup();
        let mut dice = ScriptedDice::new(vec![1, 1, 6, 6]);
        let outcome = attempt_dispel(&state, &catalog(), PlayerId::B, 4, 5, &mut dice).unwrap();
        assert!(!outcome.dispelled);
        assert_eq!(outcome.step.ruling.rule.as_str(), "double_one");
    }

    #[test]
    fn test_dispel_pool_checked() {
        let (state, ..) = setup();
        let mut dice = ScriptedDice::new(vec![6; 6]);
        assert!(matches!(
            attempt_dispel(&state, &catalog(), PlayerId::B, 5, 9, &mut dice),
            Err(RulesError::InsufficientPool { .. })
        ));
        assert!(matches!(
            attempt_dispel(&state, &catalog(), PlayerId::B, 0, 9, &mut dice),
            Err(RulesError::InvalidAction(_))
        ));
    }
}
