//! Decision Table Engine.
//!
//! Rules that map discrete input combinations to outcomes are written as
//! ordered condition rows with a named hit policy, validated once when
//! loaded, and evaluated against typed fact vectors.
//!
//! ## Key Types
//!
//! - `FactVector`: named, typed inputs of a test
//! - `FactSchema`: declared inputs and their domains
//! - `DecisionTable`: validated, immutable rows plus a `HitPolicy`
//! - `Evaluation`: the winning row with citation, or `NoMatch`

pub mod fact;
pub mod standard;
pub mod table;
pub mod validate;

pub use fact::{FactDomain, FactSchema, FactSpec, FactValue, FactVector};
pub use standard::{facts, standard_tables};
pub use table::{
    evaluate, Condition, DecisionTable, Evaluation, HitPolicy, OutputValue, Row, TableId, TableMatch,
};
pub use validate::coverage_gaps;
