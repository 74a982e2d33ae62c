//! Casting spells.
//!
//! A cast is resolved in two halves. [`cast_spell`] rolls the casting dice
//! and, on success, produces a [`PendingCast`]. The effect is only applied
//! once the opponent allows the spell or fails to dispel it, so a dispelled
//! spell never leaves anything behind.

use serde::{Deserialize, Serialize};

use crate::army::{Character, Spell, SpellId, Unit};
use crate::core::{CharacterId, GameState, PlayerId, Result, RulesError, UnitId};
use crate::explain::{Provenance, TraceEntry};
use crate::modifiers::{resolve_modifiers, ModifierContext, ResolvedFacts};
use crate::resolution::{total, DiceSource, Draws, Step, StepResult};
use crate::rules::{RuleCatalog, TestCategory};
use crate::tables::{facts, standard, FactVector, TableMatch};

/// A request to cast one spell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastRequest {
    /// Unit the wizard is in.
    pub unit: UnitId,
    pub caster: CharacterId,
    pub spell: SpellId,
    pub target: UnitId,
    /// Dice taken from the casting pool.
    pub dice: u8,
}

impl CastRequest {
    pub fn new(unit: UnitId, caster: CharacterId, spell: impl Into<String>, target: UnitId, dice: u8) -> Self {
        Self {
            unit,
            caster,
            spell: SpellId::new(spell),
            target,
            dice,
        }
    }
}

/// Result symbol of the casting table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastResult {
    /// Cast with two or more sixes; cannot be dispelled.
    Irresistible,
    /// Two or more ones.
    Fizzled,
    Cast,
    Failed,
}

impl CastResult {
    fn from_symbol(symbol: &str) -> Result<Self> {
        match symbol {
            standard::casting::IRRESISTIBLE => Ok(CastResult::Irresistible),
            standard::casting::FIZZLED => Ok(CastResult::Fizzled),
            standard::casting::CAST => Ok(CastResult::Cast),
            standard::casting::FAILED => Ok(CastResult::Failed),
            other => Err(RulesError::InvalidAction(format!("unknown casting result `{}`", other))),
        }
    }

    /// Whether the spell goes off (pending a dispel unless irresistible).
    #[must_use]
    pub fn succeeded(self) -> bool {
        matches!(self, CastResult::Irresistible | CastResult::Cast)
    }
}

/// A successful cast waiting for the opponent's dispel attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCast {
    pub unit: UnitId,
    pub caster: CharacterId,
    pub owner: PlayerId,
    pub spell: SpellId,
    pub target: UnitId,
    /// Casting total the dispel must equal or beat.
    pub casting_total: i64,
    pub irresistible: bool,
}

/// Miscast table roll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Miscast {
    pub draws: Draws,
    pub ruling: TableMatch,
    /// Effect symbol from the table.
    pub effect: String,
    /// Wounds suffered by the caster.
    pub caster_wounds: u32,
    /// Whether the caster's side loses its remaining casting dice.
    pub pool_lost: bool,
}

impl Provenance for Miscast {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        out.push(
            TraceEntry::new(
                format!("miscast: {}", self.effect),
                self.ruling.rule.clone(),
                self.ruling.citation.clone(),
            )
            .with_draws(&self.draws),
        );
    }
}

/// Everything that happened when a spell was cast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastOutcome {
    pub request: CastRequest,
    pub result: CastResult,
    /// Dice total plus wizard level and casting modifiers.
    pub casting_total: i64,
    pub step: StepResult,
    pub miscast: Option<Miscast>,
    /// Set when the spell went off.
    pub pending: Option<PendingCast>,
}

impl Provenance for CastOutcome {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.step.provenance(out);
        self.miscast.provenance(out);
    }
}

/// Check a cast request without rolling anything.
///
/// Returns the caster's unit, the caster and the spell.
pub fn validate_cast<'a>(
    state: &'a GameState,
    catalog: &'a RuleCatalog,
    request: &CastRequest,
) -> Result<(&'a Unit, &'a Character, &'a Spell)> {
    let unit = state.unit(request.unit)?;
    if !unit.is_on_table() {
        return Err(RulesError::InvalidAction(format!("{} is not on the table", unit.id)));
    }
    let caster = unit
        .character(request.caster)
        .filter(|c| c.is_alive())
        .ok_or(RulesError::UnknownCharacter(request.caster))?;
    if !caster.knows(&request.spell) {
        return Err(RulesError::InvalidAction(format!(
            "{} does not know {}",
            caster.name, request.spell
        )));
    }
    let spell = catalog.spell(&request.spell)?;

    let max = catalog.config().max_dice_per_attempt;
    if request.dice == 0 || request.dice > max {
        return Err(RulesError::InvalidAction(format!(
            "a casting attempt uses 1 to {} dice, not {}",
            max, request.dice
        )));
    }
    let available = state.pools().casting[unit.owner];
    if request.dice > available {
        return Err(RulesError::InsufficientPool {
            player: unit.owner,
            requested: request.dice,
            available,
        });
    }

    let target = state.unit(request.target)?;
    if !target.is_on_table() {
        return Err(RulesError::InvalidTarget {
            target: target.id,
            reason: "target is not on the table".to_string(),
        });
    }
    let enemy = target.owner != unit.owner;
    if spell.effect.targets_enemy() != enemy {
        let wanted = if spell.effect.targets_enemy() { "an enemy" } else { "a friendly" };
        return Err(RulesError::InvalidTarget {
            target: target.id,
            reason: format!("{} needs {} unit", spell.name, wanted),
        });
    }
    if unit.position.distance(target.position) > spell.range {
        return Err(RulesError::InvalidTarget {
            target: target.id,
            reason: format!("out of range ({} inches)", spell.range),
        });
    }
    Ok((unit, caster, spell))
}

/// Roll a casting attempt.
///
/// Does not touch the state: the caller spends the dice, applies any
/// miscast and stores the pending cast.
pub fn cast_spell(
    state: &GameState,
    catalog: &RuleCatalog,
    request: &CastRequest,
    dice: &mut dyn DiceSource,
) -> Result<CastOutcome> {
    let (unit, caster, spell) = validate_cast(state, catalog, request)?;

    let situation = FactVector::new().with_int(facts::CASTING_BONUS, 0);
    let ctx = ModifierContext::new(TestCategory::Casting, unit.id, situation)
        .against(request.target)
        .by_character(caster.id)
        .tagged(request.spell.0.clone());
    let modifiers: ResolvedFacts = resolve_modifiers(state, catalog, &ctx)?;

    let draws = dice.d6(usize::from(request.dice))?;
    let casting_total =
        total(&draws) + i64::from(caster.wizard_level) + modifiers.int_or(facts::CASTING_BONUS, 0);
    let count = |face: u8| draws.iter().filter(|&&d| d == face).count() as i64;
    let table_facts = FactVector::new()
        .with_int(facts::ONES, count(1))
        .with_int(facts::SIXES, count(6))
        .with_int(facts::MARGIN, casting_total - i64::from(spell.casting_value));
    let ruling = catalog.evaluate(standard::CASTING_ROLL, &table_facts)?.require()?;
    let result = CastResult::from_symbol(ruling.symbol(facts::RESULT)?)?;

    let miscast = if ruling.bool(facts::MISCAST)? {
        Some(roll_miscast(catalog, dice)?)
    } else {
        None
    };

    let pending = result.succeeded().then(|| PendingCast {
        unit: unit.id,
        caster: caster.id,
        owner: unit.owner,
        spell: spell.id.clone(),
        target: request.target,
        casting_total,
        irresistible: result == CastResult::Irresistible,
    });

    Ok(CastOutcome {
        request: request.clone(),
        result,
        casting_total,
        step: StepResult {
            step: Step::Casting,
            modifiers,
            ruling,
            target: i64::from(spell.casting_value),
            successes: u32::from(result.succeeded()),
            draws,
        },
        miscast,
        pending,
    })
}

/// Roll 2D6 on the miscast table.
pub fn roll_miscast(catalog: &RuleCatalog, dice: &mut dyn DiceSource) -> Result<Miscast> {
    let draws = dice.d6(2)?;
    let facts_in = FactVector::new().with_int(facts::ROLL, total(&draws));
    let ruling = catalog.evaluate(standard::MISCAST, &facts_in)?.require()?;
    Ok(Miscast {
        effect: ruling.symbol(facts::EFFECT)?.to_string(),
        caster_wounds: ruling.int(facts::CASTER_WOUNDS)?.max(0) as u32,
        pool_lost: ruling.bool(facts::POOL_LOST)?,
        draws,
        ruling,
    })
}
