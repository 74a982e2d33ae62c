//! A single dice-consuming test step.
//!
//! Every step follows the same shape: resolve modifiers, evaluate the
//! step's table, roll. [`StepResult`] keeps all three so a ruling can be
//! explained and replayed.

use serde::{Deserialize, Serialize};

use crate::core::{GameState, Result};
use crate::explain::{Provenance, TraceEntry};
use crate::modifiers::{resolve_modifiers, ModifierContext, ResolvedFacts};
use crate::rules::RuleCatalog;
use crate::tables::TableMatch;

use super::dice::Draws;

/// Kind of step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    ToHit,
    ToWound,
    ArmourSave,
    WardSave,
    Leadership,
    Charge,
    Casting,
    Miscast,
    Dispel,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Step::ToHit => "to hit",
            Step::ToWound => "to wound",
            Step::ArmourSave => "armour save",
            Step::WardSave => "ward save",
            Step::Leadership => "leadership",
            Step::Charge => "charge",
            Step::Casting => "casting",
            Step::Miscast => "miscast",
            Step::Dispel => "dispel",
        };
        f.write_str(s)
    }
}

/// Outcome of one step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: Step,
    /// Modifiers that shaped the facts.
    pub modifiers: ResolvedFacts,
    /// Winning table row.
    pub ruling: TableMatch,
    /// Final target number after modifiers to the roll (0 when unused).
    pub target: i64,
    /// Raw dice drawn for this step.
    pub draws: Draws,
    /// Dice that succeeded.
    pub successes: u32,
}

impl Provenance for StepResult {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.modifiers.provenance(out);
        out.push(
            TraceEntry::new(
                format!(
                    "{}: {} -> {} success(es)",
                    self.step,
                    self.ruling.outputs,
                    self.successes
                ),
                self.ruling.rule.clone(),
                self.ruling.citation.clone(),
            )
            .with_draws(&self.draws),
        );
    }
}

/// Resolve modifiers for `ctx`, then evaluate `table` with the result.
///
/// A table gap surfaces as the recoverable `NoMatchingRule` error.
pub fn lookup(
    state: &GameState,
    catalog: &RuleCatalog,
    ctx: &ModifierContext,
    table: &str,
) -> Result<(ResolvedFacts, TableMatch)> {
    let resolved = resolve_modifiers(state, catalog, ctx)?;
    let ruling = catalog.evaluate(table, &resolved.facts)?.require()?;
    Ok((resolved, ruling))
}

/// Whether a D6 roll meets a target, with a natural 1 always failing.
#[must_use]
pub fn passes(roll: u8, target: i64) -> bool {
    roll != 1 && i64::from(roll) >= target
}
