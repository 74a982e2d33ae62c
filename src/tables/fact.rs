//! Typed facts and fact schemas.
//!
//! A fact is a named, typed value describing one aspect of a pending test
//! (attacker weapon skill, modified save value, whether the unit charged).
//! Tables declare the facts they read in a [`FactSchema`]; the modifier
//! pipeline produces [`FactVector`]s that are checked against that schema
//! before any row is evaluated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Result, RulesError};

use super::table::TableId;

/// A single fact value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactValue {
    /// Integer value (characteristics, differentials, dice counts).
    Int(i64),
    /// Boolean flag (charging, insane courage).
    Bool(bool),
    /// Symbolic value from a closed set (troop type, spell result).
    Symbol(String),
}

impl FactValue {
    /// Create a symbol value.
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Symbol(s.into())
    }

    /// Get as integer if this is an Int value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FactValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as bool if this is a Bool value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string slice if this is a Symbol value.
    #[must_use]
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            FactValue::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            FactValue::Int(_) => "int",
            FactValue::Bool(_) => "bool",
            FactValue::Symbol(_) => "symbol",
        }
    }
}

// Integers, then booleans, then symbols; values of one type in natural order.
impl PartialOrd for FactValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FactValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        fn rank(v: &FactValue) -> u8 {
            match v {
                FactValue::Int(_) => 0,
                FactValue::Bool(_) => 1,
                FactValue::Symbol(_) => 2,
            }
        }
        match (self, other) {
            (FactValue::Int(a), FactValue::Int(b)) => a.cmp(b),
            (FactValue::Bool(a), FactValue::Bool(b)) => a.cmp(b),
            (FactValue::Symbol(a), FactValue::Symbol(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl From<i64> for FactValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for FactValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        Self::Symbol(s.to_string())
    }
}

impl std::fmt::Display for FactValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactValue::Int(v) => write!(f, "{}", v),
            FactValue::Bool(v) => write!(f, "{}", v),
            FactValue::Symbol(s) => write!(f, ":{}", s),
        }
    }
}

/// An ordered, named set of facts.
///
/// Ordering is by name so that two vectors built in different orders
/// compare, hash and serialize identically.
///
/// ```
/// use rust_wargame::tables::FactVector;
///
/// let facts = FactVector::new()
///     .with_int("attacker_ws", 3)
///     .with_bool("charging", true);
///
/// assert_eq!(facts.int("attacker_ws"), Some(3));
/// assert_eq!(facts.bool("charging"), Some(true));
/// assert_eq!(facts.to_string(), "{attacker_ws=3, charging=true}");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactVector {
    values: BTreeMap<String, FactValue>,
}

impl FactVector {
    /// Create an empty fact vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an integer fact (builder pattern).
    #[must_use]
    pub fn with_int(mut self, name: impl Into<String>, value: i64) -> Self {
        self.values.insert(name.into(), FactValue::Int(value));
        self
    }

    /// Add a boolean fact (builder pattern).
    #[must_use]
    pub fn with_bool(mut self, name: impl Into<String>, value: bool) -> Self {
        self.values.insert(name.into(), FactValue::Bool(value));
        self
    }

    /// Add a symbol fact (builder pattern).
    #[must_use]
    pub fn with_symbol(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), FactValue::Symbol(value.into()));
        self
    }

    /// Set a fact, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: FactValue) {
        self.values.insert(name.into(), value);
    }

    /// Get a fact by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FactValue> {
        self.values.get(name)
    }

    /// Get an integer fact.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FactValue::as_int)
    }

    /// Get a boolean fact.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FactValue::as_bool)
    }

    /// Get a symbol fact.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FactValue::as_symbol)
    }

    /// Check whether a fact is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over facts in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FactValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy every fact of `other` into this vector, overwriting duplicates.
    pub fn extend_from(&mut self, other: &FactVector) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }
}

impl std::fmt::Display for FactVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// The set of values a fact may take.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactDomain {
    /// Inclusive integer range. Saturating facts are clamped into range
    /// instead of being rejected.
    Int { min: i64, max: i64, saturating: bool },
    /// `true` or `false`.
    Bool,
    /// One of a closed set of symbols.
    Symbol(Vec<String>),
}

impl FactDomain {
    /// Check whether a value lies inside the domain.
    #[must_use]
    pub fn contains(&self, value: &FactValue) -> bool {
        match (self, value) {
            (FactDomain::Int { min, max, .. }, FactValue::Int(v)) => v >= min && v <= max,
            (FactDomain::Bool, FactValue::Bool(_)) => true,
            (FactDomain::Symbol(set), FactValue::Symbol(s)) => set.iter().any(|x| x == s),
            _ => false,
        }
    }

    /// Every value of the domain, in order.
    ///
    /// Used for coverage reports and property tests, so integer domains
    /// are expected to be small (characteristics, dice results). Overlap
    /// validation never enumerates integer domains.
    #[must_use]
    pub fn values(&self) -> Vec<FactValue> {
        match self {
            FactDomain::Int { min, max, .. } => (*min..=*max).map(FactValue::Int).collect(),
            FactDomain::Bool => vec![FactValue::Bool(false), FactValue::Bool(true)],
            FactDomain::Symbol(set) => set.iter().cloned().map(FactValue::Symbol).collect(),
        }
    }

    fn describe(&self) -> String {
        match self {
            FactDomain::Int { min, max, .. } => format!("int in {}..={}", min, max),
            FactDomain::Bool => "bool".to_string(),
            FactDomain::Symbol(set) => format!("one of {:?}", set),
        }
    }
}

/// Declaration of one input fact of a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSpec {
    /// Fact name.
    pub name: String,
    /// Admissible values.
    pub domain: FactDomain,
}

impl FactSpec {
    /// An integer fact rejected when out of range.
    pub fn int(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            domain: FactDomain::Int {
                min,
                max,
                saturating: false,
            },
        }
    }

    /// An integer fact clamped into range.
    pub fn saturating(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            domain: FactDomain::Int {
                min,
                max,
                saturating: true,
            },
        }
    }

    /// A boolean fact.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: FactDomain::Bool,
        }
    }

    /// A symbolic fact.
    pub fn symbol<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            domain: FactDomain::Symbol(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// Ordered input schema of a decision table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSchema {
    specs: Vec<FactSpec>,
}

impl FactSchema {
    /// Create a schema from fact declarations.
    pub fn new(specs: impl IntoIterator<Item = FactSpec>) -> Self {
        Self {
            specs: specs.into_iter().collect(),
        }
    }

    /// Declared facts, in order.
    #[must_use]
    pub fn specs(&self) -> &[FactSpec] {
        &self.specs
    }

    /// Number of declared facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the schema declares no facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Position of a fact in the schema.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.specs.iter().position(|s| s.name == name)
    }

    /// Check facts against the schema and return them in schema order.
    ///
    /// Saturating integers are clamped; every other mismatch fails with
    /// `InvalidFact`. Facts the schema does not declare are ignored.
    pub fn normalize(&self, table: &TableId, facts: &FactVector) -> Result<Vec<FactValue>> {
        let mut out = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let Some(value) = facts.get(&spec.name) else {
                return Err(RulesError::InvalidFact {
                    table: table.clone(),
                    fact: spec.name.clone(),
                    reason: "missing".to_string(),
                });
            };

            let value = match (&spec.domain, value) {
                (FactDomain::Int { min, max, saturating: true }, FactValue::Int(v)) => {
                    // Not `clamp`: an inverted domain must fail below, not panic.
                    FactValue::Int((*v).max(*min).min(*max))
                }
                _ => value.clone(),
            };

            if !spec.domain.contains(&value) {
                return Err(RulesError::InvalidFact {
                    table: table.clone(),
                    fact: spec.name.clone(),
                    reason: format!(
                        "{} value {} outside {}",
                        value.type_name(),
                        value,
                        spec.domain.describe()
                    ),
                });
            }
            out.push(value);
        }
        Ok(out)
    }

    /// Every fact vector of the declared domain (cartesian product).
    #[must_use]
    pub fn enumerate(&self) -> Vec<FactVector> {
        let mut acc = vec![FactVector::new()];
        for spec in &self.specs {
            let values = spec.domain.values();
            let mut next = Vec::with_capacity(acc.len() * values.len());
            for partial in &acc {
                for v in &values {
                    let mut f = partial.clone();
                    f.set(spec.name.clone(), v.clone());
                    next.push(f);
                }
            }
            acc = next;
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableId {
        TableId::new("test")
    }

    #[test]
    fn test_fact_vector_order_independent() {
        let a = FactVector::new().with_int("b", 2).with_int("a", 1);
        let b = FactVector::new().with_int("a", 1).with_int("b", 2);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{a=1, b=2}");
    }

    #[test]
    fn test_normalize_clamps_saturating() {
        let schema = FactSchema::new([FactSpec::saturating("ws", 1, 10)]);
        let facts = FactVector::new().with_int("ws", 12);
        let values = schema.normalize(&table(), &facts).unwrap();
        assert_eq!(values, vec![FactValue::Int(10)]);
    }

    #[test]
    fn test_normalize_rejects_out_of_range() {
        let schema = FactSchema::new([FactSpec::int("roll", 2, 12)]);
        let facts = FactVector::new().with_int("roll", 13);
        let err = schema.normalize(&table(), &facts).unwrap_err();
        assert!(matches!(err, RulesError::InvalidFact { ref fact, .. } if fact == "roll"));
    }

    #[test]
    fn test_normalize_rejects_missing_and_mistyped() {
        let schema = FactSchema::new([FactSpec::boolean("charging")]);

        let missing = schema.normalize(&table(), &FactVector::new());
        assert!(matches!(missing, Err(RulesError::InvalidFact { .. })));

        let mistyped = schema.normalize(&table(), &FactVector::new().with_int("charging", 1));
        assert!(matches!(mistyped, Err(RulesError::InvalidFact { .. })));
    }

    #[test]
    fn test_symbol_domain() {
        let schema = FactSchema::new([FactSpec::symbol("troop", ["infantry", "cavalry"])]);
        assert!(schema
            .normalize(&table(), &FactVector::new().with_symbol("troop", "cavalry"))
            .is_ok());
        assert!(schema
            .normalize(&table(), &FactVector::new().with_symbol("troop", "monster"))
            .is_err());
    }

    #[test]
    fn test_enumerate_domain() {
        let schema = FactSchema::new([FactSpec::int("a", 1, 3), FactSpec::boolean("b")]);
        let all = schema.enumerate();
        assert_eq!(all.len(), 6);
        assert!(all.contains(&FactVector::new().with_int("a", 2).with_bool("b", true)));
    }
}
