//! Special rules and the rule catalog.
//!
//! Rules are data: a `SpecialRule` declares modifier contributions with a
//! citation, and the `RuleCatalog` bundles rules with the decision tables,
//! spells and precedence policy they are evaluated against.

pub mod catalog;
pub mod special;

pub use catalog::{RuleCatalog, RuleCatalogBuilder, LONG_RANGE};
pub use special::{Bearer, ModifierEffect, ModifierOp, RuleId, RuleScope, SpecialRule, TestCategory};
