//! Close combat rounds: who strikes when, and who won.
//!
//! Strike order and combat result are computed from a [`Combat`] and the
//! units it holds. The attacks themselves go through
//! [`resolve_attacks`](super::resolve_attacks).

use serde::{Deserialize, Serialize};

use crate::core::{CharacterId, GameState, PlayerId, PlayerMap, Result, UnitId};
use crate::explain::{Citation, Provenance, TraceEntry};
use crate::lifecycle::Combat;
use crate::modifiers::{resolve_modifiers, ModifierContext, ResolvedFacts};
use crate::rules::{RuleCatalog, RuleId, TestCategory};
use crate::tables::{facts, FactVector};

fn combat_result_citation() -> Citation {
    Citation::new("Core Rules", 68).with_section("Combat Result")
}

/// Situation facts every rule in a combat round can see.
#[must_use]
pub fn combat_situation(combat: &Combat, unit: UnitId) -> FactVector {
    let charging = combat.is_first_round() && combat.is_charger(unit);
    let charged = combat.is_first_round() && !charging && combat.side_of(unit).is_some_and(|side| {
        combat.chargers.iter().any(|c| combat.side_of(*c) == Some(side.opponent()))
    });
    FactVector::new()
        .with_bool(facts::CHARGING, charging)
        .with_bool(facts::CHARGED, charged)
        .with_bool(facts::FIRST_ROUND, combat.is_first_round())
}

/// One batch of attacks in a combat round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strike {
    pub unit: UnitId,
    /// Set when a character strikes rather than the rank and file.
    pub character: Option<CharacterId>,
    pub target: UnitId,
    pub initiative: i64,
    pub strikes_first: bool,
    pub attacks: u32,
    pub modifiers: ResolvedFacts,
}

impl Provenance for Strike {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        self.modifiers.provenance(out);
    }
}

/// Attacks from a block: the front rank attacks with its full profile, the
/// supporting ranks behind it with one attack each.
#[must_use]
pub fn block_attacks(models: u32, files: u32, attacks_per_model: u32, supporting_ranks: u32) -> u32 {
    let front = models.min(files);
    let support = models.saturating_sub(files).min(files.saturating_mul(supporting_ranks));
    front * attacks_per_model + support
}

fn first_enemy(state: &GameState, combat: &Combat, side: PlayerId) -> Option<UnitId> {
    combat.sides[side.opponent()]
        .iter()
        .copied()
        .find(|u| state.unit(*u).is_ok_and(|unit| unit.is_on_table()))
}

/// Every strike of a combat round, in the order they are made.
///
/// Strikes-first attacks go first, then descending initiative; ties keep
/// side A before side B and unit id order.
pub fn strike_order(state: &GameState, catalog: &RuleCatalog, combat: &Combat) -> Result<Vec<Strike>> {
    let config = catalog.config();
    let mut strikes = Vec::new();

    for (side, units) in combat.sides.iter() {
        let Some(target) = first_enemy(state, combat, side) else {
            continue;
        };
        for &id in units {
            let unit = state.unit(id)?;
            if !unit.is_on_table() {
                continue;
            }
            let situation = combat_situation(combat, id);

            if unit.models > 0 {
                let facts_in = situation
                    .clone()
                    .with_int(facts::ATTACKS, i64::from(unit.profile.attacks))
                    .with_int(facts::INITIATIVE, i64::from(unit.profile.initiative))
                    .with_bool(facts::STRIKES_FIRST, false);
                let ctx = ModifierContext::new(TestCategory::Strikes, id, facts_in).against(target);
                let modifiers = resolve_modifiers(state, catalog, &ctx)?;
                let per_model = modifiers.int_or(facts::ATTACKS, 0).max(0) as u32;
                strikes.push(Strike {
                    unit: id,
                    character: None,
                    target,
                    initiative: modifiers.int_or(facts::INITIATIVE, 0),
                    strikes_first: modifiers.flag(facts::STRIKES_FIRST),
                    attacks: block_attacks(unit.models, unit.files, per_model, config.supporting_ranks),
                    modifiers,
                });
            }

            for character in unit.living_characters() {
                let facts_in = situation
                    .clone()
                    .with_int(facts::ATTACKS, i64::from(character.profile.attacks))
                    .with_int(facts::INITIATIVE, i64::from(character.profile.initiative))
                    .with_bool(facts::STRIKES_FIRST, false);
                let ctx = ModifierContext::new(TestCategory::Strikes, id, facts_in)
                    .against(target)
                    .by_character(character.id);
                let modifiers = resolve_modifiers(state, catalog, &ctx)?;
                strikes.push(Strike {
                    unit: id,
                    character: Some(character.id),
                    target,
                    initiative: modifiers.int_or(facts::INITIATIVE, 0),
                    strikes_first: modifiers.flag(facts::STRIKES_FIRST),
                    attacks: modifiers.int_or(facts::ATTACKS, 0).max(0) as u32,
                    modifiers,
                });
            }
        }
    }

    // Stable: equal strikes keep side and unit order.
    strikes.sort_by(|a, b| {
        b.strikes_first
            .cmp(&a.strikes_first)
            .then(b.initiative.cmp(&a.initiative))
    });
    Ok(strikes)
}

/// Combat result of one side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideScore {
    pub wounds: i64,
    pub rank_bonus: i64,
    /// 1 when the side charged this round.
    pub charge: i64,
    /// 1 when the side has more models.
    pub outnumber: i64,
    /// Sum of `combat_result` modifiers.
    pub bonuses: i64,
    pub models: u32,
    pub modifiers: Vec<ResolvedFacts>,
}

impl SideScore {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.wounds + self.rank_bonus + self.charge + self.outnumber + self.bonuses
    }
}

/// Combat result of a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatScore {
    pub sides: PlayerMap<SideScore>,
    /// `None` on a draw.
    pub winner: Option<PlayerId>,
    /// Difference between the totals.
    pub margin: u32,
}

impl CombatScore {
    /// Side that lost the round.
    #[must_use]
    pub fn loser(&self) -> Option<PlayerId> {
        self.winner.map(PlayerId::opponent)
    }

    /// Totals as stored on the combat.
    #[must_use]
    pub fn totals(&self) -> PlayerMap<i32> {
        PlayerMap::new(|p| self.sides[p].total() as i32)
    }
}

impl Provenance for CombatScore {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        for (_, side) in self.sides.iter() {
            side.modifiers.provenance(out);
        }
        let decision = match self.winner {
            Some(p) => format!(
                "combat result {} to {}, won by player {}",
                self.sides[PlayerId::A].total(),
                self.sides[PlayerId::B].total(),
                p
            ),
            None => format!("combat result drawn at {}", self.sides[PlayerId::A].total()),
        };
        out.push(TraceEntry::new(
            decision,
            RuleId::new("combat_result"),
            combat_result_citation(),
        ));
    }
}

/// Score a fought round from the wounds each side caused.
pub fn combat_result(
    state: &GameState,
    catalog: &RuleCatalog,
    combat: &Combat,
    wounds: &PlayerMap<u32>,
) -> Result<CombatScore> {
    let config = catalog.config();
    let mut sides: PlayerMap<SideScore> = PlayerMap::default();

    for (side, units) in combat.sides.iter() {
        let score = &mut sides[side];
        score.wounds = i64::from(wounds[side]);
        let opponent = first_enemy(state, combat, side);
        for &id in units {
            let unit = state.unit(id)?;
            if !unit.is_on_table() {
                continue;
            }
            score.models += unit.model_count();
            if combat.is_first_round() && combat.is_charger(id) {
                score.charge = 1;
            }

            let situation = combat_situation(combat, id)
                .with_int(facts::RANK_BONUS, i64::from(config.rank_bonus(unit.models, unit.files)))
                .with_int(facts::COMBAT_RESULT, 0);
            let mut ctx = ModifierContext::new(TestCategory::CombatResult, id, situation);
            if let Some(o) = opponent {
                ctx = ctx.against(o);
            }
            let modifiers = resolve_modifiers(state, catalog, &ctx)?;
            score.rank_bonus = score.rank_bonus.max(modifiers.int_or(facts::RANK_BONUS, 0));
            score.bonuses += modifiers.int_or(facts::COMBAT_RESULT, 0);
            score.modifiers.push(modifiers);
        }
    }

    let (a, b) = (sides[PlayerId::A].models, sides[PlayerId::B].models);
    if a > b {
        sides[PlayerId::A].outnumber = 1;
    } else if b > a {
        sides[PlayerId::B].outnumber = 1;
    }

    let (ta, tb) = (sides[PlayerId::A].total(), sides[PlayerId::B].total());
    let winner = match ta.cmp(&tb) {
        std::cmp::Ordering::Greater => Some(PlayerId::A),
        std::cmp::Ordering::Less => Some(PlayerId::B),
        std::cmp::Ordering::Equal => None,
    };
    Ok(CombatScore {
        sides,
        winner,
        margin: ta.abs_diff(tb) as u32,
    })
}

/// A unit is steadfast when it has more ranks than every enemy unit in
/// its combat.
pub fn is_steadfast(state: &GameState, combat: &Combat, unit: UnitId) -> Result<bool> {
    let Some(side) = combat.side_of(unit) else {
        return Ok(false);
    };
    let ranks = state.unit(unit)?.ranks();
    for &enemy in &combat.sides[side.opponent()] {
        let enemy = state.unit(enemy)?;
        if enemy.is_on_table() && enemy.ranks() >= ranks {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::{Character, Profile, TroopType, Unit};
    use crate::rules::{RuleScope, SpecialRule};

    fn block(owner: PlayerId, models: u32, files: u32, initiative: u8, rules: &[&str]) -> Unit {
        let mut u = Unit::new(
            UnitId::new(0),
            "Block",
            owner,
            TroopType::Infantry,
            Profile::line([4, 3, 3, 3, 3, 1, initiative, 1, 7]),
            models,
            files,
        );
        u.placed = true;
        for r in rules {
            u = u.with_rule(*r);
        }
        u
    }

    fn catalog() -> RuleCatalog {
        RuleCatalog::builder()
            .rule(
                SpecialRule::new("standard", "Standard Bearer", RuleScope::Unit, Citation::new("Core Rules", 69))
                    .applies_to(TestCategory::CombatResult)
                    .add(facts::COMBAT_RESULT, 1),
            )
            .rule(
                SpecialRule::new("always_strikes_first", "Always Strikes First", RuleScope::Unit, Citation::new("Core Rules", 90))
                    .applies_to(TestCategory::Strikes)
                    .set(facts::STRIKES_FIRST, true),
            )
            .build()
            .unwrap()
    }

    fn setup(a: Unit, b: Unit) -> (GameState, Combat) {
        let mut state = GameState::new(PlayerId::A);
        let a = state.add_unit(a).unwrap();
        let b = state.add_unit(b).unwrap();
        (state, Combat::new(a, PlayerId::A, b))
    }

    #[test]
    fn test_block_attacks() {
        assert_eq!(block_attacks(20, 5, 1, 1), 10);
        assert_eq!(block_attacks(7, 5, 2, 1), 12);
        assert_eq!(block_attacks(3, 5, 1, 1), 3);
        assert_eq!(block_attacks(20, 5, 1, 0), 5);
    }

    #[test]
    fn test_strike_order_by_initiative() {
        let (state, combat) = setup(
            block(PlayerId::A, 10, 5, 3, &[]),
            block(PlayerId::B, 10, 5, 4, &[]),
        );
        let strikes = strike_order(&state, &catalog(), &combat).unwrap();
        assert_eq!(strikes.len(), 2);
        assert_eq!(strikes[0].unit, UnitId::new(2));
        assert_eq!(strikes[0].target, UnitId::new(1));
        assert_eq!(strikes[1].attacks, 10);
    }

    #[test]
    fn test_strikes_first_beats_initiative() {
        let (state, combat) = setup(
            block(PlayerId::A, 10, 5, 1, &["always_strikes_first"]),
            block(PlayerId::B, 10, 5, 9, &[]),
        );
        let strikes = strike_order(&state, &catalog(), &combat).unwrap();
        assert_eq!(strikes[0].unit, UnitId::new(1));
        assert!(strikes[0].strikes_first);
    }

    #[test]
    fn test_characters_strike_separately() {
        let champion = Character::new(CharacterId::new(0), "Captain", Profile::line([4, 5, 5, 4, 4, 2, 5, 3, 8]));
        let (state, combat) = setup(
            block(PlayerId::A, 10, 5, 3, &[]).with_character(champion),
            block(PlayerId::B, 10, 5, 3, &[]),
        );
        let strikes = strike_order(&state, &catalog(), &combat).unwrap();
        assert_eq!(strikes.len(), 3);
        assert_eq!(strikes[0].attacks, 3);
        assert!(strikes[0].character.is_some());
    }

    #[test]
    fn test_combat_result_counts_every_bonus() {
        let (state, combat) = setup(
            block(PlayerId::A, 20, 5, 3, &["standard"]),
            block(PlayerId::B, 10, 5, 3, &[]),
        );
        let wounds = PlayerMap::new(|p| if p == PlayerId::A { 2 } else { 3 });
        let score = combat_result(&state, &catalog(), &combat, &wounds).unwrap();
        let a = &score.sides[PlayerId::A];
        assert_eq!((a.wounds, a.rank_bonus, a.charge, a.outnumber, a.bonuses), (2, 3, 1, 1, 1));
        assert_eq!(a.total(), 8);
        assert_eq!(score.sides[PlayerId::B].total(), 4);
        assert_eq!(score.winner, Some(PlayerId::A));
        assert_eq!(score.loser(), Some(PlayerId::B));
        assert_eq!(score.margin, 4);
    }

    #[test]
    fn test_combat_result_draw() {
        let (state, mut combat) = setup(
            block(PlayerId::A, 10, 5, 3, &[]),
            block(PlayerId::B, 10, 5, 3, &[]),
        );
        combat.finish_round(PlayerMap::default());
        let score = combat_result(&state, &catalog(), &combat, &PlayerMap::default()).unwrap();
        assert_eq!(score.winner, None);
        assert_eq!(score.margin, 0);
    }

    #[test]
    fn test_steadfast() {
        let (state, combat) = setup(
            block(PlayerId::A, 10, 5, 3, &[]),
            block(PlayerId::B, 20, 5, 3, &[]),
        );
        assert!(is_steadfast(&state, &combat, UnitId::new(2)).unwrap());
        assert!(!is_steadfast(&state, &combat, UnitId::new(1)).unwrap());
    }
}
