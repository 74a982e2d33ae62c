//! Decision tables.
//!
//! A `DecisionTable` is an ordered list of condition rows over a fixed
//! input schema, a hit policy, and an output schema. Tables are pure data:
//! they are validated once when built and never change afterwards.
//!
//! ## Hit policies
//!
//! - `Unique`: rows partition the input space. Overlapping rows are an
//!   authoring defect reported as `AmbiguousTable` at build time.
//! - `First`: the first matching row wins. Later rows may overlap earlier
//!   ones; this is how FAQ refinements are layered before base rows.
//! - `Priority`: every matching row is collected and the highest
//!   `priority` wins. Ties go to the row declared first.
//!
//! ```
//! use rust_wargame::explain::Citation;
//! use rust_wargame::rules::RuleId;
//! use rust_wargame::tables::{
//!     Condition, DecisionTable, Evaluation, FactSchema, FactSpec, FactVector,
//!     HitPolicy, OutputValue, Row, TableId,
//! };
//!
//! let cite = Citation::new("Core Rules", 50);
//! let table = DecisionTable::new(
//!     TableId::new("to_wound"),
//!     FactSchema::new([FactSpec::saturating("diff", -9, 9)]),
//!     vec!["target".to_string()],
//!     HitPolicy::Unique,
//!     vec![
//!         Row::new(RuleId::new("wound_chart"), cite.clone())
//!             .when([Condition::range(1, 9)])
//!             .then([OutputValue::int(3)]),
//!         Row::new(RuleId::new("wound_chart"), cite)
//!             .when([Condition::range(-9, 0)])
//!             .then([OutputValue::int(5)]),
//!     ],
//! )
//! .unwrap();
//!
//! let facts = FactVector::new().with_int("diff", 2);
//! match table.evaluate(&facts).unwrap() {
//!     Evaluation::Matched(m) => assert_eq!(m.int("target").unwrap(), 3),
//!     Evaluation::NoMatch { .. } => unreachable!(),
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::core::{Result, RulesError};
use crate::explain::{Citation, Provenance, TraceEntry};
use crate::rules::RuleId;

use super::fact::{FactDomain, FactSchema, FactValue, FactVector};
use super::validate;

/// Identifier of a decision table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub String);

impl TableId {
    /// Create a new table id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TableId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a table resolves multiple matching rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitPolicy {
    /// At most one row may match any input combination.
    Unique,
    /// The first matching row in declaration order wins.
    First,
    /// The matching row with the highest priority wins; ties go to the
    /// earlier row.
    Priority,
}

/// A condition on a single input fact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Matches every value.
    Any,
    /// Inclusive integer range.
    Range { min: i64, max: i64 },
    /// Exact value.
    Is(FactValue),
    /// Any of the listed values.
    OneOf(Vec<FactValue>),
}

impl Condition {
    /// Inclusive integer range condition.
    #[must_use]
    pub fn range(min: i64, max: i64) -> Self {
        Self::Range { min, max }
    }

    /// Exact integer condition.
    #[must_use]
    pub fn eq_int(v: i64) -> Self {
        Self::Is(FactValue::Int(v))
    }

    /// Exact boolean condition.
    #[must_use]
    pub fn is(v: bool) -> Self {
        Self::Is(FactValue::Bool(v))
    }

    /// Exact symbol condition.
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Is(FactValue::Symbol(s.into()))
    }

    /// Check a value against this condition.
    #[must_use]
    pub fn matches(&self, value: &FactValue) -> bool {
        match self {
            Condition::Any => true,
            Condition::Range { min, max } => value.as_int().is_some_and(|v| v >= *min && v <= *max),
            Condition::Is(expected) => expected == value,
            Condition::OneOf(values) => values.contains(value),
        }
    }

    /// Check that the condition can only ever talk about values of the
    /// domain's type.
    pub(crate) fn compatible_with(&self, domain: &FactDomain) -> bool {
        match self {
            Condition::Any => true,
            Condition::Range { min, max } => matches!(domain, FactDomain::Int { .. }) && min <= max,
            Condition::Is(v) => same_type(v, domain),
            Condition::OneOf(values) => values.iter().all(|v| same_type(v, domain)),
        }
    }
}

fn same_type(value: &FactValue, domain: &FactDomain) -> bool {
    matches!(
        (value, domain),
        (FactValue::Int(_), FactDomain::Int { .. })
            | (FactValue::Bool(_), FactDomain::Bool)
            | (FactValue::Symbol(_), FactDomain::Symbol(_))
    )
}

/// One output cell of a row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputValue {
    /// A constant.
    Literal(FactValue),
    /// Copy the (normalized) value of an input fact.
    FromFact(String),
}

impl OutputValue {
    /// Integer literal output.
    #[must_use]
    pub fn int(v: i64) -> Self {
        Self::Literal(FactValue::Int(v))
    }

    /// Boolean literal output.
    #[must_use]
    pub fn boolean(v: bool) -> Self {
        Self::Literal(FactValue::Bool(v))
    }

    /// Symbol literal output.
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Literal(FactValue::Symbol(s.into()))
    }

    /// Output copied from an input fact.
    pub fn from_fact(name: impl Into<String>) -> Self {
        Self::FromFact(name.into())
    }
}

/// A table row: one condition per input, one value per output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Conditions, positional to the input schema.
    pub conditions: Vec<Condition>,
    /// Outputs, positional to the output schema.
    pub outputs: Vec<OutputValue>,
    /// Priority for `HitPolicy::Priority` (higher wins).
    pub priority: i32,
    /// Rule this row encodes.
    pub rule: RuleId,
    /// Where the rule is written down.
    pub citation: Citation,
}

impl Row {
    /// Create an empty row for a rule.
    pub fn new(rule: RuleId, citation: Citation) -> Self {
        Self {
            conditions: Vec::new(),
            outputs: Vec::new(),
            priority: 0,
            rule,
            citation,
        }
    }

    /// Set the conditions (builder pattern).
    #[must_use]
    pub fn when(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions = conditions.into_iter().collect();
        self
    }

    /// Set the outputs (builder pattern).
    #[must_use]
    pub fn then(mut self, outputs: impl IntoIterator<Item = OutputValue>) -> Self {
        self.outputs = outputs.into_iter().collect();
        self
    }

    /// Set the priority (builder pattern).
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn matches(&self, values: &[FactValue]) -> bool {
        self.conditions
            .iter()
            .zip(values)
            .all(|(c, v)| c.matches(v))
    }
}

/// A validated, immutable decision table.
///
/// Deserialized tables go through the same checks as [`DecisionTable::new`],
/// so a malformed or ambiguous table fails to load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDecisionTable")]
pub struct DecisionTable {
    id: TableId,
    inputs: FactSchema,
    outputs: Vec<String>,
    policy: HitPolicy,
    rows: Vec<Row>,
}

/// Unchecked wire form of a [`DecisionTable`].
#[derive(Deserialize)]
struct RawDecisionTable {
    id: TableId,
    inputs: FactSchema,
    outputs: Vec<String>,
    policy: HitPolicy,
    rows: Vec<Row>,
}

impl TryFrom<RawDecisionTable> for DecisionTable {
    type Error = RulesError;

    fn try_from(raw: RawDecisionTable) -> Result<Self> {
        Self::new(raw.id, raw.inputs, raw.outputs, raw.policy, raw.rows)
    }
}

impl DecisionTable {
    /// Build and validate a table.
    ///
    /// Fails with `InvalidFact` when a row does not fit the schemas and
    /// with `AmbiguousTable` when two rows of a `Unique` table overlap.
    pub fn new(
        id: TableId,
        inputs: FactSchema,
        outputs: Vec<String>,
        policy: HitPolicy,
        rows: Vec<Row>,
    ) -> Result<Self> {
        let table = Self {
            id,
            inputs,
            outputs,
            policy,
            rows,
        };
        validate::validate(&table)?;
        Ok(table)
    }

    /// Table id.
    #[must_use]
    pub fn id(&self) -> &TableId {
        &self.id
    }

    /// Input schema.
    #[must_use]
    pub fn inputs(&self) -> &FactSchema {
        &self.inputs
    }

    /// Output names.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Hit policy.
    #[must_use]
    pub fn policy(&self) -> HitPolicy {
        self.policy
    }

    /// Rows in declaration order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Indices of every row matching the facts (after normalization).
    pub fn matching_rows(&self, facts: &FactVector) -> Result<Vec<usize>> {
        let values = self.inputs.normalize(&self.id, facts)?;
        Ok(self.matching_values(&values))
    }

    fn matching_values(&self, values: &[FactValue]) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.matches(values))
            .map(|(i, _)| i)
            .collect()
    }

    /// Evaluate the table against facts.
    ///
    /// Returns `Evaluation::NoMatch` rather than an error when no row
    /// applies, so the caller can fall back to a declared default.
    pub fn evaluate(&self, facts: &FactVector) -> Result<Evaluation> {
        let values = self.inputs.normalize(&self.id, facts)?;

        let winner = match self.policy {
            HitPolicy::Unique | HitPolicy::First => {
                self.rows.iter().position(|row| row.matches(&values))
            }
            HitPolicy::Priority => {
                let mut best: Option<(usize, i32)> = None;
                for (i, row) in self.rows.iter().enumerate() {
                    if !row.matches(&values) {
                        continue;
                    }
                    // Strictly greater: earlier rows keep ties.
                    if best.map_or(true, |(_, p)| row.priority > p) {
                        best = Some((i, row.priority));
                    }
                }
                best.map(|(i, _)| i)
            }
        };

        let mut normalized = FactVector::new();
        for (spec, v) in self.inputs.specs().iter().zip(&values) {
            normalized.set(spec.name.clone(), v.clone());
        }

        let Some(index) = winner else {
            return Ok(Evaluation::NoMatch {
                table: self.id.clone(),
                facts: normalized,
            });
        };

        let row = &self.rows[index];
        let mut outputs = FactVector::new();
        for (name, out) in self.outputs.iter().zip(&row.outputs) {
            let value = match out {
                OutputValue::Literal(v) => v.clone(),
                OutputValue::FromFact(src) => match normalized.get(src) {
                    Some(v) => v.clone(),
                    None => {
                        return Err(RulesError::InvalidFact {
                            table: self.id.clone(),
                            fact: src.clone(),
                            reason: "output refers to an undeclared input".to_string(),
                        })
                    }
                },
            };
            outputs.set(name.clone(), value);
        }

        Ok(Evaluation::Matched(TableMatch {
            table: self.id.clone(),
            row: index,
            inputs: normalized,
            outputs,
            rule: row.rule.clone(),
            citation: row.citation.clone(),
        }))
    }
}

/// Evaluate `table` against `facts`.
///
/// Free-function form of [`DecisionTable::evaluate`].
pub fn evaluate(table: &DecisionTable, facts: &FactVector) -> Result<Evaluation> {
    table.evaluate(facts)
}

/// The winning row of an evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMatch {
    /// Table evaluated.
    pub table: TableId,
    /// Index of the winning row.
    pub row: usize,
    /// Normalized inputs the row was matched against.
    pub inputs: FactVector,
    /// Row outputs by name.
    pub outputs: FactVector,
    /// Rule the row encodes.
    pub rule: RuleId,
    /// Citation of the rule.
    pub citation: Citation,
}

impl TableMatch {
    /// Integer output by name.
    pub fn int(&self, name: &str) -> Result<i64> {
        self.outputs.int(name).ok_or_else(|| self.missing(name))
    }

    /// Boolean output by name.
    pub fn bool(&self, name: &str) -> Result<bool> {
        self.outputs.bool(name).ok_or_else(|| self.missing(name))
    }

    /// Symbol output by name.
    pub fn symbol(&self, name: &str) -> Result<&str> {
        match self.outputs.symbol(name) {
            Some(s) => Ok(s),
            None => Err(self.missing(name)),
        }
    }

    fn missing(&self, name: &str) -> RulesError {
        RulesError::InvalidFact {
            table: self.table.clone(),
            fact: name.to_string(),
            reason: "output missing or of the wrong type".to_string(),
        }
    }
}

impl Provenance for TableMatch {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        out.push(
            TraceEntry::new(
                format!("{} row {} -> {}", self.table, self.row, self.outputs),
                self.rule.clone(),
                self.citation.clone(),
            ),
        );
    }
}

/// Result of evaluating a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evaluation {
    /// A row matched.
    Matched(TableMatch),
    /// No row matched the (normalized) facts.
    NoMatch { table: TableId, facts: FactVector },
}

impl Evaluation {
    /// Convert `NoMatch` into the recoverable `NoMatchingRule` error.
    pub fn require(self) -> Result<TableMatch> {
        match self {
            Evaluation::Matched(m) => Ok(m),
            Evaluation::NoMatch { table, facts } => Err(RulesError::NoMatchingRule { table, facts }),
        }
    }

    /// The match, if any.
    #[must_use]
    pub fn matched(&self) -> Option<&TableMatch> {
        match self {
            Evaluation::Matched(m) => Some(m),
            Evaluation::NoMatch { .. } => None,
        }
    }
}
