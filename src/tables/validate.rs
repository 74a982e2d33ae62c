//! Load-time table validation.
//!
//! Shape checks make sure every row fits the table's schemas. For
//! `Unique` tables, rows are checked pairwise for overlap: two rows
//! overlap when, for every input, some value of the declared domain
//! satisfies both conditions (box intersection). Integer inputs are
//! intersected arithmetically, so wide domains cost nothing.

use crate::core::{Result, RulesError};

use super::fact::FactDomain;
use super::table::{Condition, DecisionTable, HitPolicy, OutputValue};

/// Every load-time check for a table.
pub(crate) fn validate(table: &DecisionTable) -> Result<()> {
    check_shape(table)?;
    if table.policy() == HitPolicy::Unique {
        check_unique(table)?;
    }
    Ok(())
}

/// Check domains, arity, condition types and `FromFact` references.
fn check_shape(table: &DecisionTable) -> Result<()> {
    let inputs = table.inputs();
    for spec in inputs.specs() {
        if let FactDomain::Int { min, max, .. } = spec.domain {
            if min > max {
                return Err(shape_error(
                    table,
                    &spec.name,
                    format!("empty integer domain {}..={}", min, max),
                ));
            }
        }
    }
    for (index, row) in table.rows().iter().enumerate() {
        if row.conditions.len() != inputs.len() {
            return Err(shape_error(
                table,
                &row.rule.to_string(),
                format!(
                    "row {} has {} conditions, schema has {} inputs",
                    index,
                    row.conditions.len(),
                    inputs.len()
                ),
            ));
        }
        if row.outputs.len() != table.outputs().len() {
            return Err(shape_error(
                table,
                &row.rule.to_string(),
                format!(
                    "row {} has {} outputs, table declares {}",
                    index,
                    row.outputs.len(),
                    table.outputs().len()
                ),
            ));
        }
        for (cond, spec) in row.conditions.iter().zip(inputs.specs()) {
            if !cond.compatible_with(&spec.domain) {
                return Err(shape_error(
                    table,
                    &spec.name,
                    format!("row {} has a condition of the wrong type", index),
                ));
            }
        }
        for out in &row.outputs {
            if let OutputValue::FromFact(name) = out {
                if inputs.position(name).is_none() {
                    return Err(shape_error(
                        table,
                        name,
                        format!("row {} copies an undeclared input", index),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Reject overlapping rows of a `Unique` table.
fn check_unique(table: &DecisionTable) -> Result<()> {
    debug_assert_eq!(table.policy(), HitPolicy::Unique);

    let rows = table.rows();
    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            let overlap = rows[i]
                .conditions
                .iter()
                .zip(&rows[j].conditions)
                .zip(table.inputs().specs())
                .all(|((a, b), spec)| intersects(a, b, &spec.domain));
            if overlap {
                return Err(RulesError::AmbiguousTable {
                    table: table.id().clone(),
                    first: i,
                    second: j,
                });
            }
        }
    }
    Ok(())
}

/// Whether two conditions share a value of the domain.
fn intersects(a: &Condition, b: &Condition, domain: &FactDomain) -> bool {
    let FactDomain::Int { min, max, .. } = domain else {
        return domain.values().iter().any(|v| a.matches(v) && b.matches(v));
    };
    // An explicit value list bounds the search.
    for cond in [a, b] {
        let listed = match cond {
            Condition::Is(v) => std::slice::from_ref(v),
            Condition::OneOf(values) => values.as_slice(),
            _ => continue,
        };
        return listed
            .iter()
            .any(|v| domain.contains(v) && a.matches(v) && b.matches(v));
    }
    let (mut lo, mut hi) = (*min, *max);
    for cond in [a, b] {
        if let Condition::Range { min, max } = cond {
            lo = lo.max(*min);
            hi = hi.min(*max);
        }
    }
    lo <= hi
}

/// Input combinations of the declared domain no row covers.
///
/// Not an error: a gap surfaces at runtime as `NoMatchingRule`. Catalog
/// authors use this to find coverage holes before a game starts.
#[must_use]
pub fn coverage_gaps(table: &DecisionTable) -> Vec<crate::tables::FactVector> {
    table
        .inputs()
        .enumerate()
        .into_iter()
        .filter(|facts| matches!(table.matching_rows(facts), Ok(rows) if rows.is_empty()))
        .collect()
}

fn shape_error(table: &DecisionTable, fact: &str, reason: String) -> RulesError {
    RulesError::InvalidFact {
        table: table.id().clone(),
        fact: fact.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::Citation;
    use crate::rules::RuleId;
    use crate::tables::{FactSchema, FactSpec, FactValue, Row, TableId};

    fn row() -> Row {
        Row::new(RuleId::new("r"), Citation::new("Test Rules", 1))
    }

    fn build(policy: HitPolicy, rows: Vec<Row>) -> Result<DecisionTable> {
        DecisionTable::new(
            TableId::new("t"),
            FactSchema::new([FactSpec::int("x", 0, 5), FactSpec::boolean("flag")]),
            vec!["out".to_string()],
            policy,
            rows,
        )
    }

    #[test]
    fn test_arity_mismatch() {
        let err = build(
            HitPolicy::First,
            vec![row().when([Condition::Any]).then([OutputValue::int(1)])],
        )
        .unwrap_err();
        assert!(matches!(err, RulesError::InvalidFact { .. }));
    }

    #[test]
    fn test_condition_type_mismatch() {
        let err = build(
            HitPolicy::First,
            vec![row()
                .when([Condition::is(true), Condition::Any])
                .then([OutputValue::int(1)])],
        )
        .unwrap_err();
        assert!(matches!(err, RulesError::InvalidFact { ref fact, .. } if fact == "x"));
    }

    #[test]
    fn test_disjoint_on_one_input_is_not_overlap() {
        let table = build(
            HitPolicy::Unique,
            vec![
                row().when([Condition::range(0, 5), Condition::is(true)]).then([OutputValue::int(1)]),
                row().when([Condition::range(0, 5), Condition::is(false)]).then([OutputValue::int(2)]),
            ],
        );
        assert!(table.is_ok());
    }

    #[test]
    fn test_any_overlaps_everything() {
        let err = build(
            HitPolicy::Unique,
            vec![
                row().when([Condition::Any, Condition::is(true)]).then([OutputValue::int(1)]),
                row().when([Condition::eq_int(3), Condition::Any]).then([OutputValue::int(2)]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, RulesError::AmbiguousTable { first: 0, second: 1, .. }));
    }

    #[test]
    fn test_inverted_domain_fails_at_build() {
        let err = DecisionTable::new(
            TableId::new("t"),
            FactSchema::new([FactSpec::saturating("x", 6, 1)]),
            vec!["out".to_string()],
            HitPolicy::First,
            vec![row().when([Condition::Any]).then([OutputValue::int(1)])],
        )
        .unwrap_err();
        assert!(matches!(err, RulesError::InvalidFact { ref fact, .. } if fact == "x"));
    }

    #[test]
    fn test_wide_domain_checked_without_enumeration() {
        let table = |second: Condition| {
            DecisionTable::new(
                TableId::new("wide"),
                FactSchema::new([FactSpec::int("x", i64::MIN, i64::MAX)]),
                vec!["out".to_string()],
                HitPolicy::Unique,
                vec![
                    row().when([Condition::range(i64::MIN, 0)]).then([OutputValue::int(1)]),
                    row().when([second]).then([OutputValue::int(2)]),
                ],
            )
        };
        assert!(table(Condition::range(1, i64::MAX)).is_ok());
        assert!(table(Condition::OneOf(vec![FactValue::Int(5), FactValue::Int(9)])).is_ok());
        assert!(matches!(
            table(Condition::Any).unwrap_err(),
            RulesError::AmbiguousTable { first: 0, second: 1, .. }
        ));
        assert!(matches!(
            table(Condition::eq_int(-3)).unwrap_err(),
            RulesError::AmbiguousTable { .. }
        ));
    }

    #[test]
    fn test_coverage_gaps() {
        let table = build(
            HitPolicy::Unique,
            vec![row().when([Condition::range(0, 4), Condition::Any]).then([OutputValue::int(1)])],
        )
        .unwrap();
        let gaps = coverage_gaps(&table);
        assert_eq!(gaps.len(), 2);
        assert!(gaps.iter().all(|f| f.int("x") == Some(5)));
    }
}
