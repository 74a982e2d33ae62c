//! Unit status machine.
//!
//! ```text
//! Deployed -> Active -> Fleeing -> Rallied -> Active
//!     \          \          \          \
//!      +----------+----------+----------+--> Destroyed
//! ```
//!
//! Destroyed is absorbing. Every change of status is caused by a
//! [`StatusTrigger`], which names the test outcome that produced it.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    /// On the table, before the first turn.
    #[default]
    Deployed,
    /// Fighting normally.
    Active,
    /// Broken and running.
    Fleeing,
    /// Passed a rally test; becomes active at the start of its next turn.
    Rallied,
    /// Removed from the game.
    Destroyed,
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitStatus::Deployed => "deployed",
            UnitStatus::Active => "active",
            UnitStatus::Fleeing => "fleeing",
            UnitStatus::Rallied => "rallied",
            UnitStatus::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Whether the lifecycle table allows `from -> to`.
#[must_use]
pub fn can_transition(from: UnitStatus, to: UnitStatus) -> bool {
    use UnitStatus::*;
    match (from, to) {
        (Destroyed, _) => false,
        (_, Destroyed) => true,
        (Deployed, Active) | (Active, Fleeing) | (Fleeing, Rallied) | (Rallied, Active) => true,
        _ => false,
    }
}

/// Test outcome that moves a unit to a new status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusTrigger {
    /// First turn of its side begins.
    Activated,
    BreakTestFailed,
    PanicTestFailed,
    /// Chose to flee from a charge.
    FledAsReaction,
    RallyTestPassed,
    /// A rallied unit reforms at the start of its turn.
    Reformed,
    /// Last model removed.
    WoundsExhausted,
    /// Caught by a pursuer while fleeing.
    Caught,
}

impl StatusTrigger {
    /// Status the trigger leads to.
    #[must_use]
    pub fn target(self) -> UnitStatus {
        match self {
            StatusTrigger::Activated | StatusTrigger::Reformed => UnitStatus::Active,
            StatusTrigger::BreakTestFailed
            | StatusTrigger::PanicTestFailed
            | StatusTrigger::FledAsReaction => UnitStatus::Fleeing,
            StatusTrigger::RallyTestPassed => UnitStatus::Rallied,
            StatusTrigger::WoundsExhausted | StatusTrigger::Caught => UnitStatus::Destroyed,
        }
    }
}

impl std::fmt::Display for StatusTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusTrigger::Activated => "activated",
            StatusTrigger::BreakTestFailed => "break test failed",
            StatusTrigger::PanicTestFailed => "panic test failed",
            StatusTrigger::FledAsReaction => "fled from charge",
            StatusTrigger::RallyTestPassed => "rally test passed",
            StatusTrigger::Reformed => "reformed",
            StatusTrigger::WoundsExhausted => "wiped out",
            StatusTrigger::Caught => "caught by pursuers",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [UnitStatus; 5] = [
        UnitStatus::Deployed,
        UnitStatus::Active,
        UnitStatus::Fleeing,
        UnitStatus::Rallied,
        UnitStatus::Destroyed,
    ];

    #[test]
    fn test_destroyed_is_absorbing() {
        for to in ALL {
            assert!(!can_transition(UnitStatus::Destroyed, to));
        }
        for from in &ALL[..4] {
            assert!(can_transition(*from, UnitStatus::Destroyed));
        }
    }

    #[test]
    fn test_transition_table() {
        let allowed: Vec<_> = ALL
            .iter()
            .flat_map(|a| ALL.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| can_transition(*a, *b) && *b != UnitStatus::Destroyed)
            .collect();
        assert_eq!(
            allowed,
            vec![
                (UnitStatus::Deployed, UnitStatus::Active),
                (UnitStatus::Active, UnitStatus::Fleeing),
                (UnitStatus::Fleeing, UnitStatus::Rallied),
                (UnitStatus::Rallied, UnitStatus::Active),
            ]
        );
    }

    #[test]
    fn test_trigger_targets() {
        assert_eq!(StatusTrigger::BreakTestFailed.target(), UnitStatus::Fleeing);
        assert_eq!(StatusTrigger::Reformed.target(), UnitStatus::Active);
        assert_eq!(StatusTrigger::Caught.target(), UnitStatus::Destroyed);
    }
}
