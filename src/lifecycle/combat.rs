//! Combats and declared charges.
//!
//! A combat is created when a charge connects and lives until one side
//! has no engaged unit left. Each combat phase it is `Engaged` until its
//! round has been fought, then `ResolvedThisRound`.

use serde::{Deserialize, Serialize};

use crate::core::{CombatId, PlayerId, PlayerMap, Reaction, UnitId};

/// Per-round state of a combat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatState {
    /// Must be fought this combat phase.
    #[default]
    Engaged,
    /// Already fought this combat phase.
    ResolvedThisRound,
}

/// A set of engaged units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combat {
    pub id: CombatId,
    /// Engaged units per side.
    pub sides: PlayerMap<Vec<UnitId>>,
    /// Round to be fought next, starting at 1.
    pub round: u32,
    /// Combat result of each side in the last round fought.
    pub results: PlayerMap<i32>,
    pub state: CombatState,
    /// Units that charged into this combat; cleared after the first round.
    pub chargers: Vec<UnitId>,
}

impl Combat {
    /// A new combat between a charger and its target.
    ///
    /// The id is assigned by `GameState` when the combat is registered.
    #[must_use]
    pub fn new(charger: UnitId, charger_owner: PlayerId, target: UnitId) -> Self {
        let mut sides: PlayerMap<Vec<UnitId>> = PlayerMap::default();
        sides[charger_owner].push(charger);
        sides[charger_owner.opponent()].push(target);
        Self {
            id: CombatId::new(0),
            sides,
            round: 1,
            results: PlayerMap::default(),
            state: CombatState::Engaged,
            chargers: vec![charger],
        }
    }

    /// Every engaged unit, side A first.
    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.sides.iter().flat_map(|(_, units)| units.iter().copied())
    }

    /// Side a unit fights on.
    #[must_use]
    pub fn side_of(&self, unit: UnitId) -> Option<PlayerId> {
        self.sides
            .iter()
            .find(|(_, units)| units.contains(&unit))
            .map(|(p, _)| p)
    }

    /// Add a unit to a side, as a charger or not.
    pub fn join(&mut self, unit: UnitId, side: PlayerId, charging: bool) {
        if !self.sides[side].contains(&unit) {
            self.sides[side].push(unit);
        }
        if charging && !self.chargers.contains(&unit) {
            self.chargers.push(unit);
        }
    }

    /// Remove a unit. Returns whether it was engaged.
    pub fn remove(&mut self, unit: UnitId) -> bool {
        let mut removed = false;
        for (_, units) in self.sides.iter_mut() {
            let before = units.len();
            units.retain(|u| *u != unit);
            removed |= units.len() != before;
        }
        self.chargers.retain(|u| *u != unit);
        removed
    }

    /// Whether one side has no engaged unit left.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.sides.iter().any(|(_, units)| units.is_empty())
    }

    /// Whether the next round is the first.
    #[must_use]
    pub fn is_first_round(&self) -> bool {
        self.round == 1
    }

    /// Whether a unit charged into the combat this round.
    #[must_use]
    pub fn is_charger(&self, unit: UnitId) -> bool {
        self.chargers.contains(&unit)
    }

    /// Mark the combat as to be fought this phase.
    pub fn engage(&mut self) {
        self.state = CombatState::Engaged;
    }

    /// Record a fought round.
    pub fn finish_round(&mut self, results: PlayerMap<i32>) {
        self.results = results;
        self.round += 1;
        self.chargers.clear();
        self.state = CombatState::ResolvedThisRound;
    }
}

/// A charge declared but not yet rolled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredCharge {
    pub charger: UnitId,
    pub target: UnitId,
    /// Target's reaction; `None` until declared (treated as hold).
    pub reaction: Option<Reaction>,
}

impl DeclaredCharge {
    /// A charge with no reaction yet.
    #[must_use]
    pub fn new(charger: UnitId, target: UnitId) -> Self {
        Self {
            charger,
            target,
            reaction: None,
        }
    }

    /// Reaction in force when the charge is rolled.
    #[must_use]
    pub fn effective_reaction(&self) -> Reaction {
        self.reaction.unwrap_or_default()
    }
}
