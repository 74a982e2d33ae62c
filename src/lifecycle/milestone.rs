//! Milestones.
//!
//! A milestone is a named lifecycle event raised by the case manager when
//! a unit or combat changes in a way other components care about: a unit
//! breaking makes its neighbours test for panic, a wizard dying ends its
//! spells. Milestones are delivered synchronously inside the action that
//! raised them.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::army::SpellId;
use crate::core::{CombatId, EffectId, UnitId};

/// A lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Milestone {
    /// A unit was set up on the table.
    UnitDeployed { unit: UnitId },
    /// A unit declared its first charge of the game.
    FirstCharge { unit: UnitId, target: UnitId },
    /// Units were locked in combat.
    EngagedInCombat {
        combat: CombatId,
        units: SmallVec<[UnitId; 4]>,
    },
    /// A unit failed a break or panic test.
    Broken { unit: UnitId },
    /// A unit fled from a charge.
    Fled { unit: UnitId },
    /// A fleeing unit passed its rally test.
    Rallied { unit: UnitId },
    /// A unit was removed from the game.
    Destroyed { unit: UnitId },
    /// No unit of one side remains in a combat.
    CombatEnded { combat: CombatId },
    /// A lasting spell effect ended.
    SpellEffectExpired {
        effect: EffectId,
        spell: SpellId,
        target: UnitId,
    },
}

/// Discriminant of a milestone, for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MilestoneKind {
    UnitDeployed,
    FirstCharge,
    EngagedInCombat,
    Broken,
    Fled,
    Rallied,
    Destroyed,
    CombatEnded,
    SpellEffectExpired,
}

impl Milestone {
    /// Kind of this milestone.
    #[must_use]
    pub fn kind(&self) -> MilestoneKind {
        match self {
            Milestone::UnitDeployed { .. } => MilestoneKind::UnitDeployed,
            Milestone::FirstCharge { .. } => MilestoneKind::FirstCharge,
            Milestone::EngagedInCombat { .. } => MilestoneKind::EngagedInCombat,
            Milestone::Broken { .. } => MilestoneKind::Broken,
            Milestone::Fled { .. } => MilestoneKind::Fled,
            Milestone::Rallied { .. } => MilestoneKind::Rallied,
            Milestone::Destroyed { .. } => MilestoneKind::Destroyed,
            Milestone::CombatEnded { .. } => MilestoneKind::CombatEnded,
            Milestone::SpellEffectExpired { .. } => MilestoneKind::SpellEffectExpired,
        }
    }

    /// The unit the milestone is about, if it names exactly one.
    #[must_use]
    pub fn unit(&self) -> Option<UnitId> {
        match self {
            Milestone::UnitDeployed { unit }
            | Milestone::FirstCharge { unit, .. }
            | Milestone::Broken { unit }
            | Milestone::Fled { unit }
            | Milestone::Rallied { unit }
            | Milestone::Destroyed { unit } => Some(*unit),
            Milestone::SpellEffectExpired { target, .. } => Some(*target),
            Milestone::EngagedInCombat { .. } | Milestone::CombatEnded { .. } => None,
        }
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Milestone::UnitDeployed { unit } => write!(f, "{} deployed", unit),
            Milestone::FirstCharge { unit, target } => write!(f, "{} charges {}", unit, target),
            Milestone::EngagedInCombat { combat, units } => {
                write!(f, "{} engaged ({} units)", combat, units.len())
            }
            Milestone::Broken { unit } => write!(f, "{} broken", unit),
            Milestone::Fled { unit } => write!(f, "{} fled", unit),
            Milestone::Rallied { unit } => write!(f, "{} rallied", unit),
            Milestone::Destroyed { unit } => write!(f, "{} destroyed", unit),
            Milestone::CombatEnded { combat } => write!(f, "{} ended", combat),
            Milestone::SpellEffectExpired { effect, spell, .. } => {
                write!(f, "{} ({}) expired", effect, spell)
            }
        }
    }
}

/// Which milestones an observer wants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilestoneFilter {
    /// Every milestone.
    Any,
    /// Milestones of one kind.
    Kind(MilestoneKind),
    /// Milestones of any of these kinds.
    AnyKind(Vec<MilestoneKind>),
    /// Milestones about one unit.
    Unit(UnitId),
    /// All filters must match.
    All(Vec<MilestoneFilter>),
    /// Filter must not match.
    Not(Box<MilestoneFilter>),
}

impl MilestoneFilter {
    /// Create an any-of-kinds filter.
    pub fn kinds(kinds: impl IntoIterator<Item = MilestoneKind>) -> Self {
        Self::AnyKind(kinds.into_iter().collect())
    }

    /// Check a milestone against the filter.
    #[must_use]
    pub fn matches(&self, milestone: &Milestone) -> bool {
        match self {
            MilestoneFilter::Any => true,
            MilestoneFilter::Kind(k) => milestone.kind() == *k,
            MilestoneFilter::AnyKind(kinds) => kinds.contains(&milestone.kind()),
            MilestoneFilter::Unit(u) => milestone.unit() == Some(*u),
            MilestoneFilter::All(filters) => filters.iter().all(|f| f.matches(milestone)),
            MilestoneFilter::Not(inner) => !inner.matches(milestone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_unit() {
        let m = Milestone::Broken { unit: UnitId::new(3) };
        assert_eq!(m.kind(), MilestoneKind::Broken);
        assert_eq!(m.unit(), Some(UnitId::new(3)));
        assert_eq!(m.to_string(), "Unit(3) broken");

        let ended = Milestone::CombatEnded { combat: CombatId::new(1) };
        assert_eq!(ended.unit(), None);
    }

    #[test]
    fn test_filters() {
        let broken = Milestone::Broken { unit: UnitId::new(3) };
        let destroyed = Milestone::Destroyed { unit: UnitId::new(4) };

        let panic = MilestoneFilter::kinds([MilestoneKind::Broken, MilestoneKind::Destroyed]);
        assert!(panic.matches(&broken));
        assert!(panic.matches(&destroyed));

        let only_3 = MilestoneFilter::All(vec![panic, MilestoneFilter::Unit(UnitId::new(3))]);
        assert!(only_3.matches(&broken));
        assert!(!only_3.matches(&destroyed));

        let not_broken = MilestoneFilter::Not(Box::new(MilestoneFilter::Kind(MilestoneKind::Broken)));
        assert!(!not_broken.matches(&broken));
        assert!(MilestoneFilter::Any.matches(&destroyed));
    }
}
