//! The core rulebook tables.
//!
//! These are data, built once and validated like any catalog-supplied
//! table. Faction content never lives here; it arrives through special
//! rules that modify the facts these tables read.
//!
//! | Table | Policy | Inputs | Outputs |
//! |-------|--------|--------|---------|
//! | `to_hit_melee` | Priority | attacker WS, defender WS, fixed to-hit | target |
//! | `to_hit_ranged` | Priority | BS, fixed to-hit | target |
//! | `to_wound` | Unique | strength vs toughness | target |
//! | `armour_save` | Unique | save value | target |
//! | `ward_save` | Unique | ward value | target |
//! | `leadership_test` | First | insane courage, margin | passed |
//! | `casting_roll` | First | ones, sixes, margin | result, miscast |
//! | `miscast` | Unique | 2D6 | effect, caster wounds, pool lost |
//! | `dispel_roll` | First | ones, margin | dispelled |
//!
//! A target of 7 on a save table means no save is possible. A ranged
//! to-hit target of 7 or more means rolling a 6 followed by a second die
//! needing `target - 3`; 10 is impossible.

use crate::core::Result;
use crate::explain::Citation;
use crate::rules::RuleId;

use super::fact::{FactSchema, FactSpec};
use super::table::{Condition, DecisionTable, HitPolicy, OutputValue, Row, TableId};

pub const TO_HIT_MELEE: &str = "to_hit_melee";
pub const TO_HIT_RANGED: &str = "to_hit_ranged";
pub const TO_WOUND: &str = "to_wound";
pub const ARMOUR_SAVE: &str = "armour_save";
pub const WARD_SAVE: &str = "ward_save";
pub const LEADERSHIP_TEST: &str = "leadership_test";
pub const CASTING_ROLL: &str = "casting_roll";
pub const MISCAST: &str = "miscast";
pub const DISPEL_ROLL: &str = "dispel_roll";

/// Names of the facts read by the core tables and the resolution engine.
///
/// Special rules address these names in their modifier effects.
pub mod facts {
    // Characteristics.
    pub const MOVEMENT: &str = "movement";
    pub const ATTACKER_WS: &str = "attacker_ws";
    pub const DEFENDER_WS: &str = "defender_ws";
    pub const BALLISTIC_SKILL: &str = "ballistic_skill";
    pub const STRENGTH: &str = "strength";
    pub const TOUGHNESS: &str = "toughness";
    pub const INITIATIVE: &str = "initiative";
    pub const ATTACKS: &str = "attacks";
    pub const LEADERSHIP: &str = "leadership";

    // Target-number shifts and overrides.
    pub const FIXED_TO_HIT: &str = "fixed_to_hit";
    pub const TO_HIT_BONUS: &str = "to_hit_bonus";
    pub const TO_WOUND_BONUS: &str = "to_wound_bonus";
    pub const STRENGTH_VS_TOUGHNESS: &str = "strength_vs_toughness";
    pub const ARMOUR: &str = "armour";
    pub const ARMOUR_PENETRATION: &str = "armour_penetration";
    pub const SAVE_VALUE: &str = "save_value";
    pub const WARD: &str = "ward";
    pub const WARD_VALUE: &str = "ward_value";

    // Situation.
    pub const CHARGING: &str = "charging";
    pub const CHARGED: &str = "charged";
    pub const FIRST_ROUND: &str = "first_round";
    pub const LONG_RANGE: &str = "long_range";
    pub const RANK_BONUS: &str = "rank_bonus";
    pub const CHARGE_BONUS: &str = "charge_bonus";
    pub const COMBAT_RESULT: &str = "combat_result";
    pub const LEADERSHIP_MODIFIER: &str = "leadership_modifier";
    pub const STUBBORN: &str = "stubborn";
    pub const STRIKES_FIRST: &str = "strikes_first";

    // Dice-derived.
    pub const INSANE_COURAGE: &str = "insane_courage";
    pub const MARGIN: &str = "margin";
    pub const ONES: &str = "ones";
    pub const SIXES: &str = "sixes";
    pub const ROLL: &str = "roll";

    // Magic.
    pub const CASTING_BONUS: &str = "casting_bonus";
    pub const DISPEL_BONUS: &str = "dispel_bonus";

    // Outputs.
    pub const TARGET: &str = "target";
    pub const PASSED: &str = "passed";
    pub const RESULT: &str = "result";
    pub const MISCAST: &str = "miscast";
    pub const EFFECT: &str = "effect";
    pub const CASTER_WOUNDS: &str = "caster_wounds";
    pub const POOL_LOST: &str = "pool_lost";
    pub const DISPELLED: &str = "dispelled";
}

/// Casting results produced by `casting_roll`.
pub mod casting {
    pub const IRRESISTIBLE: &str = "irresistible";
    pub const FIZZLED: &str = "fizzled";
    pub const CAST: &str = "cast";
    pub const FAILED: &str = "failed";
}

const CORE: &str = "Core Rules";
const FAQ: &str = "Core Rules FAQ";

fn cite(page: u16, section: &str) -> Citation {
    Citation::new(CORE, page).with_section(section)
}

fn row(rule: &str, citation: &Citation) -> Row {
    Row::new(RuleId::new(rule), citation.clone())
}

fn outputs(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

/// Build every core table.
pub fn standard_tables() -> Result<Vec<DecisionTable>> {
    Ok(vec![
        to_hit_melee()?,
        to_hit_ranged()?,
        to_wound()?,
        armour_save()?,
        ward_save()?,
        leadership_test()?,
        casting_roll()?,
        miscast()?,
        dispel_roll()?,
    ])
}

fn fixed_override(citation: &Citation, conditions: usize) -> Row {
    let mut when = vec![Condition::Any; conditions];
    when.push(Condition::range(2, 7));
    row("fixed_to_hit", citation)
        .when(when)
        .then([OutputValue::from_fact(facts::FIXED_TO_HIT)])
        .with_priority(10)
}

/// Weapon skill chart.
///
/// With attacker WS `a` and defender WS `d`: `d` at most half of `a`
/// (rounded up, `a >= 2`) hits on 2+, lower WS hits on 3+, up to double
/// hits on 4+, more than double on 5+.
pub fn to_hit_melee() -> Result<DecisionTable> {
    let chart = cite(48, "To Hit");
    let mut rows = Vec::new();
    for a in 1..=10_i64 {
        let half = if a >= 2 { (a + 1) / 2 } else { 0 };
        let bands = [
            (1, half, 2),
            (half + 1, a - 1, 3),
            (a, (2 * a).min(10), 4),
            (2 * a + 1, 10, 5),
        ];
        for (lo, hi, target) in bands {
            let lo = lo.max(1);
            if lo > hi {
                continue;
            }
            rows.push(
                row("weapon_skill_chart", &chart)
                    .when([Condition::eq_int(a), Condition::range(lo, hi), Condition::Any])
                    .then([OutputValue::int(target)]),
            );
        }
    }
    rows.push(fixed_override(&Citation::new(FAQ, 3).with_section("Fixed to-hit rolls"), 2));

    DecisionTable::new(
        TableId::new(TO_HIT_MELEE),
        FactSchema::new([
            FactSpec::saturating(facts::ATTACKER_WS, 1, 10),
            FactSpec::saturating(facts::DEFENDER_WS, 1, 10),
            FactSpec::saturating(facts::FIXED_TO_HIT, 0, 7),
        ]),
        outputs(&[facts::TARGET]),
        HitPolicy::Priority,
        rows,
    )
}

/// Ballistic skill chart.
pub fn to_hit_ranged() -> Result<DecisionTable> {
    let chart = cite(60, "Ballistic Skill");
    let mut rows = vec![row("ballistic_skill_chart", &chart)
        .when([Condition::range(5, 10), Condition::Any])
        .then([OutputValue::int(2)])];
    for bs in -3..=4_i64 {
        rows.push(
            row("ballistic_skill_chart", &chart)
                .when([Condition::eq_int(bs), Condition::Any])
                .then([OutputValue::int(7 - bs)]),
        );
    }
    rows.push(fixed_override(&Citation::new(FAQ, 3).with_section("Fixed to-hit rolls"), 1));

    DecisionTable::new(
        TableId::new(TO_HIT_RANGED),
        FactSchema::new([
            FactSpec::saturating(facts::BALLISTIC_SKILL, -3, 10),
            FactSpec::saturating(facts::FIXED_TO_HIT, 0, 7),
        ]),
        outputs(&[facts::TARGET]),
        HitPolicy::Priority,
        rows,
    )
}

/// Strength against toughness.
pub fn to_wound() -> Result<DecisionTable> {
    let chart = cite(50, "To Wound");
    let bands = [(2, 9, 2), (1, 1, 3), (0, 0, 4), (-1, -1, 5), (-9, -2, 6)];
    let rows = bands
        .into_iter()
        .map(|(lo, hi, target)| {
            row("wound_chart", &chart)
                .when([Condition::range(lo, hi)])
                .then([OutputValue::int(target)])
        })
        .collect();

    DecisionTable::new(
        TableId::new(TO_WOUND),
        FactSchema::new([FactSpec::saturating(facts::STRENGTH_VS_TOUGHNESS, -9, 9)]),
        outputs(&[facts::TARGET]),
        HitPolicy::Unique,
        rows,
    )
}

fn save_table(id: &str, fact: &str, rule: &str, citation: Citation) -> Result<DecisionTable> {
    let mut rows = vec![row(rule, &citation)
        .when([Condition::range(1, 2)])
        .then([OutputValue::int(2)])];
    for v in 3..=6_i64 {
        rows.push(row(rule, &citation).when([Condition::eq_int(v)]).then([OutputValue::int(v)]));
    }
    rows.push(
        row(rule, &citation)
            .when([Condition::range(7, 12)])
            .then([OutputValue::int(7)]),
    );

    DecisionTable::new(
        TableId::new(id),
        FactSchema::new([FactSpec::saturating(fact, 1, 12)]),
        outputs(&[facts::TARGET]),
        HitPolicy::Unique,
        rows,
    )
}

/// Modified armour save. A value of 1 is treated as 2+.
pub fn armour_save() -> Result<DecisionTable> {
    save_table(ARMOUR_SAVE, facts::SAVE_VALUE, "armour_save", cite(51, "Armour Saves"))
}

/// Ward save; armour penetration never applies.
pub fn ward_save() -> Result<DecisionTable> {
    save_table(WARD_SAVE, facts::WARD_VALUE, "ward_save", cite(52, "Ward Saves"))
}

/// 2D6 leadership test. `margin` is leadership minus the roll.
pub fn leadership_test() -> Result<DecisionTable> {
    let courage = cite(70, "Insane Courage");
    let test = cite(70, "Leadership Tests");
    DecisionTable::new(
        TableId::new(LEADERSHIP_TEST),
        FactSchema::new([
            FactSpec::boolean(facts::INSANE_COURAGE),
            FactSpec::saturating(facts::MARGIN, -12, 12),
        ]),
        outputs(&[facts::PASSED]),
        HitPolicy::First,
        vec![
            row("insane_courage", &courage)
                .when([Condition::is(true), Condition::Any])
                .then([OutputValue::boolean(true)]),
            row("leadership_test", &test)
                .when([Condition::Any, Condition::range(0, 12)])
                .then([OutputValue::boolean(true)]),
            row("leadership_test", &test)
                .when([Condition::Any, Condition::range(-12, -1)])
                .then([OutputValue::boolean(false)]),
        ],
    )
}

/// Casting roll: two sixes are irresistible, two ones fizzle.
pub fn casting_roll() -> Result<DecisionTable> {
    let irresistible = cite(80, "Irresistible Force");
    let fizzle = cite(80, "Double One");
    let casting = cite(80, "Casting Spells");
    DecisionTable::new(
        TableId::new(CASTING_ROLL),
        FactSchema::new([
            FactSpec::saturating(facts::ONES, 0, 6),
            FactSpec::saturating(facts::SIXES, 0, 6),
            FactSpec::saturating(facts::MARGIN, -40, 40),
        ]),
        outputs(&[facts::RESULT, facts::MISCAST]),
        HitPolicy::First,
        vec![
            row("irresistible_force", &irresistible)
                .when([Condition::Any, Condition::range(2, 6), Condition::Any])
                .then([OutputValue::symbol(casting::IRRESISTIBLE), OutputValue::boolean(true)]),
            row("double_one", &fizzle)
                .when([Condition::range(2, 6), Condition::Any, Condition::Any])
                .then([OutputValue::symbol(casting::FIZZLED), OutputValue::boolean(false)]),
            row("casting_value", &casting)
                .when([Condition::Any, Condition::Any, Condition::range(0, 40)])
                .then([OutputValue::symbol(casting::CAST), OutputValue::boolean(false)]),
            row("casting_value", &casting)
                .when([Condition::Any, Condition::Any, Condition::Any])
                .then([OutputValue::symbol(casting::FAILED), OutputValue::boolean(false)]),
        ],
    )
}

/// Miscast effects on 2D6.
pub fn miscast() -> Result<DecisionTable> {
    let citation = cite(82, "Miscast Table");
    let bands: [(i64, i64, &str, i64, bool); 5] = [
        (2, 4, "catastrophe", 2, true),
        (5, 6, "backlash", 1, true),
        (7, 7, "power_drain", 0, true),
        (8, 9, "feedback", 1, false),
        (10, 12, "dissipation", 0, false),
    ];
    let rows = bands
        .into_iter()
        .map(|(lo, hi, effect, wounds, lost)| {
            row("miscast", &citation).when([Condition::range(lo, hi)]).then([
                OutputValue::symbol(effect),
                OutputValue::int(wounds),
                OutputValue::boolean(lost),
            ])
        })
        .collect();

    DecisionTable::new(
        TableId::new(MISCAST),
        FactSchema::new([FactSpec::int(facts::ROLL, 2, 12)]),
        outputs(&[facts::EFFECT, facts::CASTER_WOUNDS, facts::POOL_LOST]),
        HitPolicy::Unique,
        rows,
    )
}

/// Dispel roll: two ones always fail.
pub fn dispel_roll() -> Result<DecisionTable> {
    let citation = cite(81, "Dispelling");
    DecisionTable::new(
        TableId::new(DISPEL_ROLL),
        FactSchema::new([
            FactSpec::saturating(facts::ONES, 0, 6),
            FactSpec::saturating(facts::MARGIN, -40, 40),
        ]),
        outputs(&[facts::DISPELLED]),
        HitPolicy::First,
        vec![
            row("double_one", &cite(81, "Double One"))
                .when([Condition::range(2, 6), Condition::Any])
                .then([OutputValue::boolean(false)]),
            row("dispel_value", &citation)
                .when([Condition::Any, Condition::range(0, 40)])
                .then([OutputValue::boolean(true)]),
            row("dispel_value", &citation)
                .when([Condition::Any, Condition::Any])
                .then([OutputValue::boolean(false)]),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{validate::coverage_gaps, FactVector};

    fn target(table: &DecisionTable, f: FactVector) -> i64 {
        table.evaluate(&f).unwrap().require().unwrap().int(facts::TARGET).unwrap()
    }

    #[test]
    fn test_all_standard_tables_build() {
        let tables = standard_tables().unwrap();
        assert_eq!(tables.len(), 9);
    }

    #[test]
    fn test_standard_tables_have_no_gaps() {
        for table in standard_tables().unwrap() {
            assert!(coverage_gaps(&table).is_empty(), "{} has gaps", table.id());
        }
    }

    #[test]
    fn test_ws3_vs_ws1_and_ws2_hits_on_2() {
        let table = to_hit_melee().unwrap();
        for d in 1..=2 {
            let f = FactVector::new()
                .with_int(facts::ATTACKER_WS, 3)
                .with_int(facts::DEFENDER_WS, d)
                .with_int(facts::FIXED_TO_HIT, 0);
            assert_eq!(target(&table, f), 2);
        }
    }

    #[test]
    fn test_weapon_skill_chart_bands() {
        let table = to_hit_melee().unwrap();
        let hit = |a, d| {
            target(
                &table,
                FactVector::new()
                    .with_int(facts::ATTACKER_WS, a)
                    .with_int(facts::DEFENDER_WS, d)
                    .with_int(facts::FIXED_TO_HIT, 0),
            )
        };
        assert_eq!(hit(4, 3), 3);
        assert_eq!(hit(4, 4), 4);
        assert_eq!(hit(3, 6), 4);
        assert_eq!(hit(3, 7), 5);
        assert_eq!(hit(1, 1), 4);
    }

    #[test]
    fn test_fixed_to_hit_overrides_chart() {
        let table = to_hit_melee().unwrap();
        let f = FactVector::new()
            .with_int(facts::ATTACKER_WS, 3)
            .with_int(facts::DEFENDER_WS, 1)
            .with_int(facts::FIXED_TO_HIT, 4);
        let m = table.evaluate(&f).unwrap().require().unwrap();
        assert_eq!(m.int(facts::TARGET).unwrap(), 4);
        assert_eq!(m.rule, RuleId::new("fixed_to_hit"));
    }

    #[test]
    fn test_ranged_chart() {
        let table = to_hit_ranged().unwrap();
        let hit = |bs| {
            target(
                &table,
                FactVector::new()
                    .with_int(facts::BALLISTIC_SKILL, bs)
                    .with_int(facts::FIXED_TO_HIT, 0),
            )
        };
        assert_eq!(hit(3), 4);
        assert_eq!(hit(6), 2);
        assert_eq!(hit(0), 7);
        assert_eq!(hit(-8), 10);
    }

    #[test]
    fn test_save_value_one_is_two_plus() {
        let table = armour_save().unwrap();
        assert_eq!(target(&table, FactVector::new().with_int(facts::SAVE_VALUE, 0)), 2);
        assert_eq!(target(&table, FactVector::new().with_int(facts::SAVE_VALUE, 5)), 5);
        assert_eq!(target(&table, FactVector::new().with_int(facts::SAVE_VALUE, 9)), 7);
    }

    #[test]
    fn test_casting_double_six_beats_double_one() {
        let table = casting_roll().unwrap();
        let m = table
            .evaluate(
                &FactVector::new()
                    .with_int(facts::ONES, 2)
                    .with_int(facts::SIXES, 2)
                    .with_int(facts::MARGIN, -3),
            )
            .unwrap()
            .require()
            .unwrap();
        assert_eq!(m.symbol(facts::RESULT).unwrap(), casting::IRRESISTIBLE);
        assert!(m.bool(facts::MISCAST).unwrap());
    }

    #[test]
    fn test_miscast_rejects_impossible_roll() {
        let table = miscast().unwrap();
        assert!(table.evaluate(&FactVector::new().with_int(facts::ROLL, 1)).is_err());
    }
}
