//! Charge, flee and pursuit distances.

use serde::{Deserialize, Serialize};

use crate::core::{GameState, Result, UnitId};
use crate::explain::{Citation, Provenance, TraceEntry};
use crate::modifiers::{resolve_modifiers, ModifierContext, ResolvedFacts};
use crate::rules::{RuleCatalog, RuleId, TestCategory};
use crate::tables::{facts, FactVector};

use super::dice::{total, DiceSource, Draws};

fn charge_citation() -> Citation {
    Citation::new("Core Rules", 40).with_section("Charge Range")
}

fn flee_citation() -> Citation {
    Citation::new("Core Rules", 72).with_section("Flee and Pursue")
}

/// Possible charge distances for a unit before rolling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRange {
    pub unit: UnitId,
    /// Movement after modifiers.
    pub movement: i64,
    /// Flat bonus from the `charge_bonus` fact.
    pub bonus: i64,
    /// Charge dice to roll.
    pub dice: u8,
    /// Movement plus the lowest possible dice total. The flat bonus is
    /// not included, so with a positive bonus every rolled distance is
    /// strictly above this.
    pub min: i64,
    /// Movement plus the highest possible dice total plus the bonus.
    pub max: i64,
    pub modifiers: ResolvedFacts,
}

impl ChargeRange {
    /// Distance reached for a given dice total.
    #[must_use]
    pub fn distance(&self, dice_total: i64) -> i64 {
        (self.movement + dice_total + self.bonus).max(0)
    }

    /// Whether a distance could ever be reached.
    #[must_use]
    pub fn can_reach(&self, distance: f32) -> bool {
        distance <= self.max as f32
    }
}

/// Charge range of a unit.
///
/// With the default two dice this is `M + 2` to `M + 12 + B`: only the
/// maximum carries the flat `charge_bonus`.
pub fn charge_range(state: &GameState, catalog: &RuleCatalog, unit: UnitId) -> Result<ChargeRange> {
    let charger = state.unit(unit)?;
    let situation = FactVector::new()
        .with_int(facts::MOVEMENT, i64::from(charger.lead_profile().movement))
        .with_int(facts::CHARGE_BONUS, 0);
    let ctx = ModifierContext::new(TestCategory::ChargeRange, unit, situation);
    let modifiers = resolve_modifiers(state, catalog, &ctx)?;

    let movement = modifiers.int_or(facts::MOVEMENT, 0).max(0);
    let bonus = modifiers.int_or(facts::CHARGE_BONUS, 0);
    let dice = catalog.config().charge_dice;
    let n = i64::from(dice);
    Ok(ChargeRange {
        unit,
        movement,
        bonus,
        dice,
        min: (movement + n).max(0),
        max: (movement + 6 * n + bonus).max(0),
        modifiers,
    })
}

/// A rolled charge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChargeRoll {
    pub charger: UnitId,
    pub target: UnitId,
    pub range: ChargeRange,
    pub draws: Draws,
    /// Distance the charger may move.
    pub distance: i64,
    /// Distance needed to make contact.
    pub required: f32,
    pub success: bool,
}

impl Provenance for ChargeRoll {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.range.modifiers.provenance(out);
        let verdict = if self.success { "connects" } else { "fails" };
        out.push(
            TraceEntry::new(
                format!(
                    "charge: {} of {:.1} needed, {}",
                    self.distance, self.required, verdict
                ),
                RuleId::new("charge_range"),
                charge_citation(),
            )
            .with_draws(&self.draws),
        );
    }
}

/// Distance a charger must cover to reach its target.
pub fn charge_distance(state: &GameState, catalog: &RuleCatalog, charger: UnitId, target: UnitId) -> Result<f32> {
    let from = state.unit(charger)?.position;
    let to = state.unit(target)?.position;
    Ok((from.distance(to) - catalog.config().contact_distance).max(0.0))
}

/// Roll a declared charge.
pub fn roll_charge(
    state: &GameState,
    catalog: &RuleCatalog,
    charger: UnitId,
    target: UnitId,
    dice: &mut dyn DiceSource,
) -> Result<ChargeRoll> {
    let range = charge_range(state, catalog, charger)?;
    let required = charge_distance(state, catalog, charger, target)?;
    let draws = dice.d6(usize::from(range.dice))?;
    let distance = range.distance(total(&draws));
    Ok(ChargeRoll {
        charger,
        target,
        distance,
        required,
        success: distance as f32 >= required,
        draws,
        range,
    })
}

/// A flee or pursuit roll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceRoll {
    pub unit: UnitId,
    pub draws: Draws,
    pub distance: i64,
}

impl Provenance for DistanceRoll {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        out.push(
            TraceEntry::new(
                format!("moves {} inches", self.distance),
                RuleId::new("flee_and_pursue"),
                flee_citation(),
            )
            .with_draws(&self.draws),
        );
    }
}

/// Roll the flee or pursuit dice for a unit.
pub fn roll_distance(catalog: &RuleCatalog, unit: UnitId, dice: &mut dyn DiceSource) -> Result<DistanceRoll> {
    let draws = dice.d6(usize::from(catalog.config().flee_dice))?;
    Ok(DistanceRoll {
        unit,
        distance: total(&draws),
        draws,
    })
}

/// Outcome of a broken unit fleeing from its enemies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PursuitResult {
    pub flee: DistanceRoll,
    /// Pursuit rolls, one per pursuing unit.
    pub pursuers: Vec<DistanceRoll>,
    /// Whether any pursuer equalled or beat the flee roll.
    pub caught: bool,
}

impl Provenance for PursuitResult {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.flee.provenance(out);
        self.pursuers.provenance(out);
        if self.caught {
            out.push(TraceEntry::new(
                "fleeing unit caught and destroyed",
                RuleId::new("flee_and_pursue"),
                flee_citation(),
            ));
        }
    }
}

/// Roll flee for `fleeing`, then pursuit for each pursuer in order.
pub fn resolve_pursuit(
    catalog: &RuleCatalog,
    fleeing: UnitId,
    pursuers: &[UnitId],
    dice: &mut dyn DiceSource,
) -> Result<PursuitResult> {
    let flee = roll_distance(catalog, fleeing, dice)?;
    let pursuers = pursuers
        .iter()
        .map(|&p| roll_distance(catalog, p, dice))
        .collect::<Result<Vec<_>>>()?;
    let caught = pursuers.iter().any(|p| p.distance >= flee.distance);
    Ok(PursuitResult { flee, pursuers, caught })
}
