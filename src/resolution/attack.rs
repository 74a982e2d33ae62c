//! Attack sequence: to hit, to wound, armour save, ward save.
//!
//! Every attack goes through the same pipeline and the counts are
//! aggregated; there is no per-model bookkeeping. Casualties are computed
//! here but applied by the caller, so a failed action never leaves a
//! half-resolved attack in the game state.

use serde::{Deserialize, Serialize};

use crate::army::{Profile, Unit, Weapon};
use crate::core::{CharacterId, GameState, Result, RulesError, UnitId};
use crate::explain::{Provenance, TraceEntry};
use crate::lifecycle::UnitStatus;
use crate::modifiers::{ModifierContext, WeaponRef};
use crate::rules::{RuleCatalog, TestCategory};
use crate::tables::{facts, standard, FactVector};

use super::dice::{DiceSource, Draws};
use super::step::{lookup, passes, Step, StepResult};

/// How the attacks are made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackKind {
    /// Close combat, to hit on the weapon skill chart.
    Melee,
    /// Shooting, to hit on the ballistic skill chart.
    Ranged,
    /// Automatic hits at a fixed strength (spells, impact hits).
    Hits { strength: u8, armour_penetration: u8 },
}

/// A batch of attacks from one unit (or one character) against one target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttackRequest {
    pub attacker: UnitId,
    /// Attacks made by a character rather than the rank and file.
    pub character: Option<CharacterId>,
    /// Weapon in use; `None` means a hand weapon.
    pub weapon: Option<WeaponRef>,
    pub target: UnitId,
    pub kind: AttackKind,
    pub attacks: u32,
    /// Precomputed situation facts (charging, first round, long range).
    pub situation: FactVector,
    pub tags: Vec<String>,
}

impl AttackRequest {
    /// Melee attacks with no weapon and no situation facts.
    #[must_use]
    pub fn melee(attacker: UnitId, target: UnitId, attacks: u32) -> Self {
        Self {
            attacker,
            character: None,
            weapon: None,
            target,
            kind: AttackKind::Melee,
            attacks,
            situation: FactVector::new(),
            tags: Vec::new(),
        }
    }

    /// Shooting attacks with a rank-and-file weapon.
    #[must_use]
    pub fn ranged(attacker: UnitId, weapon: usize, target: UnitId, attacks: u32) -> Self {
        Self {
            kind: AttackKind::Ranged,
            weapon: Some(WeaponRef::unit(attacker, weapon)),
            ..Self::melee(attacker, target, attacks)
        }
    }

    /// Automatic hits.
    #[must_use]
    pub fn hits(attacker: UnitId, target: UnitId, hits: u32, strength: u8, armour_penetration: u8) -> Self {
        Self {
            kind: AttackKind::Hits {
                strength,
                armour_penetration,
            },
            ..Self::melee(attacker, target, hits)
        }
    }

    /// Attacks by a character (builder pattern).
    #[must_use]
    pub fn by_character(mut self, character: CharacterId) -> Self {
        self.character = Some(character);
        self
    }

    /// Use a weapon (builder pattern).
    #[must_use]
    pub fn with_weapon(mut self, weapon: WeaponRef) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Add a situation fact (builder pattern).
    #[must_use]
    pub fn with_fact(mut self, name: &str, value: bool) -> Self {
        self.situation.set(name, value.into());
        self
    }

    /// Set the situation facts (builder pattern).
    #[must_use]
    pub fn with_situation(mut self, situation: FactVector) -> Self {
        self.situation = situation;
        self
    }

    /// Add a tag (builder pattern).
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Aggregated result of an attack batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub attacker: Option<UnitId>,
    pub target: Option<UnitId>,
    pub attacks: u32,
    pub hits: u32,
    /// Successful to-wound rolls.
    pub wounding_hits: u32,
    /// Wounds not stopped by armour.
    pub unsaved: u32,
    /// Wounds not stopped by armour or ward; to be removed from the target.
    pub wounds: u32,
    pub steps: Vec<StepResult>,
}

impl AttackOutcome {
    /// Every die drawn, in order.
    #[must_use]
    pub fn draws(&self) -> Vec<u8> {
        self.steps.iter().flat_map(|s| s.draws.iter().copied()).collect()
    }
}

impl Provenance for AttackOutcome {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.steps.provenance(out);
    }
}

struct Attacker<'a> {
    profile: Profile,
    weapon: Option<&'a Weapon>,
}

fn attacker_of<'a>(unit: &'a Unit, request: &AttackRequest, holder: Option<&'a Unit>) -> Result<Attacker<'a>> {
    let profile = match request.character {
        Some(cid) => {
            unit.character(cid)
                .ok_or(RulesError::UnknownCharacter(cid))?
                .profile
        }
        None => unit.profile,
    };
    let weapon = match (request.weapon, holder) {
        (Some(w), Some(holder)) => {
            let list = match w.character {
                Some(cid) => &holder.character(cid).ok_or(RulesError::UnknownCharacter(cid))?.weapons,
                None => &holder.weapons,
            };
            Some(list.get(w.index).ok_or_else(|| {
                RulesError::InvalidAction(format!("{} has no weapon {}", holder.id, w.index))
            })?)
        }
        _ => None,
    };
    Ok(Attacker { profile, weapon })
}

/// Check that `target` may be attacked by `attacker`.
pub fn validate_target(state: &GameState, attacker: &Unit, target: UnitId) -> Result<()> {
    let invalid = |reason: &str| RulesError::InvalidTarget {
        target,
        reason: reason.to_string(),
    };
    let Ok(unit) = state.unit(target) else {
        return Err(invalid("no such unit"));
    };
    if unit.status == UnitStatus::Destroyed {
        return Err(invalid("unit is destroyed"));
    }
    if !unit.placed {
        return Err(invalid("unit is not on the table"));
    }
    if unit.owner == attacker.owner {
        return Err(invalid("unit is friendly"));
    }
    Ok(())
}

fn roll_each(dice: &mut dyn DiceSource, count: u32, target: i64) -> Result<(Draws, u32)> {
    let mut draws = Draws::new();
    let mut successes = 0;
    if target > 6 {
        return Ok((draws, 0));
    }
    for _ in 0..count {
        let roll = dice.draw(6)?;
        draws.push(roll);
        if passes(roll, target) {
            successes += 1;
        }
    }
    Ok((draws, successes))
}

/// Roll to hit. Targets of 7+ need a 6 followed by `target - 3`.
fn roll_to_hit(dice: &mut dyn DiceSource, count: u32, target: i64) -> Result<(Draws, u32)> {
    if target <= 6 {
        return roll_each(dice, count, target);
    }
    let mut draws = Draws::new();
    let mut hits = 0;
    if target >= 10 {
        return Ok((draws, 0));
    }
    for _ in 0..count {
        let first = dice.draw(6)?;
        draws.push(first);
        if first == 6 {
            let second = dice.draw(6)?;
            draws.push(second);
            if i64::from(second) >= target - 3 {
                hits += 1;
            }
        }
    }
    Ok((draws, hits))
}

/// Resolve a batch of attacks.
///
/// Fails with `InvalidTarget` when the target does not exist, is
/// destroyed, or is friendly. Zero attacks give a zero outcome.
pub fn resolve_attacks(
    state: &GameState,
    catalog: &RuleCatalog,
    request: &AttackRequest,
    dice: &mut dyn DiceSource,
) -> Result<AttackOutcome> {
    let attacker_unit = state.unit(request.attacker)?;
    validate_target(state, attacker_unit, request.target)?;
    let defender = state.unit(request.target)?;

    let mut outcome = AttackOutcome {
        attacker: Some(request.attacker),
        target: Some(request.target),
        attacks: request.attacks,
        ..AttackOutcome::default()
    };
    if request.attacks == 0 {
        return Ok(outcome);
    }

    let holder = match request.weapon {
        Some(w) => Some(state.unit(w.unit)?),
        None => None,
    };
    let attacker = attacker_of(attacker_unit, request, holder)?;
    let defence = defender.lead_profile();

    let context = |category: TestCategory, situation: FactVector| {
        let mut ctx = ModifierContext::new(category, request.attacker, situation).against(request.target);
        ctx.actor_character = request.character;
        ctx.weapon = request.weapon;
        ctx.tags = request.tags.clone();
        ctx
    };

    // To hit.
    let (hits, strength, armour_penetration) = match request.kind {
        AttackKind::Hits {
            strength,
            armour_penetration,
        } => (request.attacks, i64::from(strength), i64::from(armour_penetration)),
        kind => {
            let (category, table) = match kind {
                AttackKind::Ranged => (TestCategory::ToHitRanged, standard::TO_HIT_RANGED),
                _ => (TestCategory::ToHitMelee, standard::TO_HIT_MELEE),
            };
            let mut situation = request.situation.clone();
            situation.set(facts::ATTACKER_WS, i64::from(attacker.profile.weapon_skill).into());
            situation.set(facts::DEFENDER_WS, i64::from(defence.weapon_skill).into());
            situation.set(facts::BALLISTIC_SKILL, i64::from(attacker.profile.ballistic_skill).into());
            situation.set(facts::FIXED_TO_HIT, 0_i64.into());
            situation.set(facts::TO_HIT_BONUS, 0_i64.into());

            let (modifiers, ruling) = lookup(state, catalog, &context(category, situation), table)?;
            let fixed = (2..=7).contains(&modifiers.int_or(facts::FIXED_TO_HIT, 0));
            let base = ruling.int(facts::TARGET)?;
            let target = if fixed {
                base
            } else {
                let bonus = modifiers.int_or(facts::TO_HIT_BONUS, 0);
                match kind {
                    AttackKind::Ranged => (base - bonus).clamp(2, 10),
                    _ => (base - bonus).clamp(2, 6),
                }
            };
            let (draws, hits) = roll_to_hit(dice, request.attacks, target)?;
            outcome.steps.push(StepResult {
                step: Step::ToHit,
                modifiers,
                ruling,
                target,
                draws,
                successes: hits,
            });
            let weapon_strength = attacker.weapon.map_or(0, |w| i64::from(w.strength_modifier));
            let weapon_ap = attacker.weapon.map_or(0, |w| i64::from(w.armour_penetration));
            (hits, i64::from(attacker.profile.strength) + weapon_strength, weapon_ap)
        }
    };
    outcome.hits = hits;
    if hits == 0 {
        return Ok(outcome);
    }

    // To wound.
    let mut situation = request.situation.clone();
    situation.set(facts::STRENGTH, strength.into());
    situation.set(facts::TOUGHNESS, i64::from(defence.toughness).into());
    situation.set(facts::TO_WOUND_BONUS, 0_i64.into());
    situation.set(facts::ARMOUR_PENETRATION, armour_penetration.into());
    let mut ctx = context(TestCategory::ToWound, situation);
    let resolved = crate::modifiers::resolve_modifiers(state, catalog, &ctx)?;
    let diff = resolved.int_or(facts::STRENGTH, strength) - resolved.int_or(facts::TOUGHNESS, 0);
    let armour_penetration = resolved.int_or(facts::ARMOUR_PENETRATION, armour_penetration);
    ctx.situation = resolved.facts.clone();
    ctx.situation.set(facts::STRENGTH_VS_TOUGHNESS, diff.into());
    let ruling = catalog.evaluate(standard::TO_WOUND, &ctx.situation)?.require()?;
    let target = (ruling.int(facts::TARGET)? - resolved.int_or(facts::TO_WOUND_BONUS, 0)).clamp(2, 7);
    let (draws, wounding) = roll_each(dice, hits, target)?;
    outcome.steps.push(StepResult {
        step: Step::ToWound,
        modifiers: resolved,
        ruling,
        target,
        draws,
        successes: wounding,
    });
    outcome.wounding_hits = wounding;
    if wounding == 0 {
        return Ok(outcome);
    }

    // Saves are taken by the defender, so the defender is the actor.
    let save_context = |category: TestCategory, situation: FactVector| {
        let mut ctx = ModifierContext::new(category, request.target, situation).against(request.attacker);
        ctx.weapon = request.weapon;
        ctx.tags = request.tags.clone();
        ctx
    };

    let mut situation = request.situation.clone();
    situation.set(facts::ARMOUR, i64::from(defender.armour).into());
    situation.set(facts::ARMOUR_PENETRATION, armour_penetration.into());
    let resolved = crate::modifiers::resolve_modifiers(
        state,
        catalog,
        &save_context(TestCategory::ArmourSave, situation),
    )?;
    let save_value = resolved.int_or(facts::ARMOUR, 7) + resolved.int_or(facts::ARMOUR_PENETRATION, 0);
    let mut save_facts = resolved.facts.clone();
    save_facts.set(facts::SAVE_VALUE, save_value.into());
    let ruling = catalog.evaluate(standard::ARMOUR_SAVE, &save_facts)?.require()?;
    let target = ruling.int(facts::TARGET)?;
    let (draws, saved) = roll_each(dice, wounding, target)?;
    outcome.steps.push(StepResult {
        step: Step::ArmourSave,
        modifiers: resolved,
        ruling,
        target,
        draws,
        successes: saved,
    });
    outcome.unsaved = wounding - saved;
    if outcome.unsaved == 0 {
        return Ok(outcome);
    }

    let mut situation = request.situation.clone();
    situation.set(facts::WARD, i64::from(defender.ward).into());
    let resolved = crate::modifiers::resolve_modifiers(
        state,
        catalog,
        &save_context(TestCategory::WardSave, situation),
    )?;
    let mut ward_facts = resolved.facts.clone();
    ward_facts.set(facts::WARD_VALUE, resolved.int_or(facts::WARD, 7).into());
    let ruling = catalog.evaluate(standard::WARD_SAVE, &ward_facts)?.require()?;
    let target = ruling.int(facts::TARGET)?;
    let (draws, warded) = roll_each(dice, outcome.unsaved, target)?;
    outcome.steps.push(StepResult {
        step: Step::WardSave,
        modifiers: resolved,
        ruling,
        target,
        draws,
        successes: warded,
    });
    outcome.wounds = outcome.unsaved - warded;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::TroopType;
    use crate::core::PlayerId;
    use crate::resolution::ScriptedDice;

    fn unit(owner: PlayerId, stats: [u8; 9], models: u32) -> Unit {
        let mut u = Unit::new(UnitId::new(0), "Unit", owner, TroopType::Infantry, Profile::line(stats), models, 5);
        u.placed = true;
        u
    }

    fn setup() -> (GameState, UnitId, UnitId) {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(unit(PlayerId::A, [4, 3, 3, 3, 3, 1, 3, 1, 7], 10)).unwrap();
        let b = state
            .add_unit(unit(PlayerId::B, [4, 3, 3, 3, 3, 1, 3, 1, 7], 10).with_saves(5, 7))
            .unwrap();
        (state, a, b)
    }

    #[test]
    fn test_full_sequence() {
        let (state, a, b) = setup();
        let catalog = RuleCatalog::standard().unwrap();
        // WS3 vs WS3 hits on 4+, S3 vs T3 wounds on 4+, armour 5+.
        let mut dice = ScriptedDice::new(vec![
            4, 6, 1, 3, // to hit: 2 hits
            5, 2, // to wound: 1 wound
            4, // armour: failed
        ]);
        let outcome = resolve_attacks(&state, &catalog, &AttackRequest::melee(a, b, 4), &mut dice).unwrap();
        assert_eq!(outcome.hits, 2);
        assert_eq!(outcome.wounding_hits, 1);
        assert_eq!(outcome.unsaved, 1);
        // No ward save: the ward step rolls nothing.
        assert_eq!(outcome.wounds, 1);
        assert_eq!(outcome.steps.len(), 4);
        assert_eq!(outcome.steps[3].target, 7);
        assert!(outcome.steps[3].draws.is_empty());
        assert_eq!(outcome.draws(), vec![4, 6, 1, 3, 5, 2, 4]);
        assert_eq!(dice.remaining(), 0);
    }

    #[test]
    fn test_zero_attacks() {
        let (state, a, b) = setup();
        let catalog = RuleCatalog::standard().unwrap();
        let mut dice = ScriptedDice::new(vec![]);
        let outcome = resolve_attacks(&state, &catalog, &AttackRequest::melee(a, b, 0), &mut dice).unwrap();
        assert_eq!(outcome.wounds, 0);
        assert!(outcome.steps.is_empty());
    }

    #[test]
    fn test_invalid_targets() {
        let (mut state, a, b) = setup();
        let catalog = RuleCatalog::standard().unwrap();
        let mut dice = ScriptedDice::new(vec![6; 10]);

        let err = resolve_attacks(&state, &catalog, &AttackRequest::melee(a, UnitId::new(99), 2), &mut dice);
        assert!(matches!(err, Err(RulesError::InvalidTarget { .. })));

        let friendly = state.add_unit(unit(PlayerId::A, [4, 3, 3, 3, 3, 1, 3, 1, 7], 5)).unwrap();
        let err = resolve_attacks(&state, &catalog, &AttackRequest::melee(a, friendly, 2), &mut dice);
        assert!(matches!(err, Err(RulesError::InvalidTarget { .. })));

        state.set_status(b, UnitStatus::Destroyed).unwrap();
        let err = resolve_attacks(&state, &catalog, &AttackRequest::melee(a, b, 2), &mut dice);
        assert!(matches!(err, Err(RulesError::InvalidTarget { .. })));
        assert_eq!(dice.remaining(), 10);
    }

    #[test]
    fn test_high_ballistic_target_needs_follow_up() {
        let (mut state, a, b) = setup();
        state.unit_mut(a).unwrap().profile.ballistic_skill = 0;
        state.unit_mut(a).unwrap().weapons.push(Weapon::ranged("Sling", 18.0));
        let catalog = RuleCatalog::standard().unwrap();

        // BS0 hits on 7+: a 6 then a 4+.
        let mut dice = ScriptedDice::new(vec![6, 4, 6, 3, 5, 1, 1]);
        let outcome =
            resolve_attacks(&state, &catalog, &AttackRequest::ranged(a, 0, b, 3), &mut dice).unwrap();
        assert_eq!(outcome.steps[0].target, 7);
        assert_eq!(outcome.hits, 1);
        assert_eq!(outcome.steps[0].draws.as_slice(), &[6, 4, 6, 3, 5]);
    }

    #[test]
    fn test_automatic_hits_skip_to_hit() {
        let (state, a, b) = setup();
        let catalog = RuleCatalog::standard().unwrap();
        // S5 vs T3 wounds on 2+, AP 2 makes a 5+ save a 7 (none).
        let mut dice = ScriptedDice::new(vec![2, 1, 6]);
        let outcome =
            resolve_attacks(&state, &catalog, &AttackRequest::hits(a, b, 3, 5, 2), &mut dice).unwrap();
        assert_eq!(outcome.hits, 3);
        assert_eq!(outcome.steps[0].step, Step::ToWound);
        assert_eq!(outcome.steps[0].target, 2);
        assert_eq!(outcome.wounding_hits, 2);
        assert_eq!(outcome.steps[1].target, 7);
        assert_eq!(outcome.wounds, 2);
    }

    #[test]
    fn test_provenance_cites_every_step() {
        let (state, a, b) = setup();
        let catalog = RuleCatalog::standard().unwrap();
        let mut dice = ScriptedDice::new(vec![6, 6, 6]);
        let outcome = resolve_attacks(&state, &catalog, &AttackRequest::melee(a, b, 1), &mut dice).unwrap();
        let mut trace = Vec::new();
        outcome.provenance(&mut trace);
        // Hit, wound, and a passed armour save; no ward step.
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[0].draws.as_slice(), &[6]);
    }
}
