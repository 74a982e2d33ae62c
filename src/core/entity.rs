//! Entity identification.
//!
//! Every game object the engine tracks (unit, character, combat, spell
//! effect, terrain feature) has a typed numeric identifier. Identifiers are
//! allocated by `GameState` and are never reused within a game, so a
//! destroyed unit's id still resolves to its historical record.
//!
//! ## Usage
//!
//! ```
//! use rust_wargame::core::{UnitId, CombatId};
//!
//! let unit = UnitId::new(3);
//! assert_eq!(unit.raw(), 3);
//! assert_eq!(format!("{}", unit), "Unit(3)");
//!
//! // Ids of different kinds never compare with each other.
//! let combat = CombatId::new(3);
//! assert_eq!(combat.raw(), unit.raw());
//! ```

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a new id.
            #[must_use]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            /// Get the raw id value.
            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a unit on the table.
    UnitId,
    "Unit"
);

numeric_id!(
    /// Identifier of a character (always owned by exactly one unit).
    CharacterId,
    "Character"
);

numeric_id!(
    /// Identifier of a combat (a set of engaged units).
    CombatId,
    "Combat"
);

numeric_id!(
    /// Identifier of an active spell effect.
    EffectId,
    "Effect"
);

numeric_id!(
    /// Identifier of a terrain feature.
    TerrainId,
    "Terrain"
);

/// Identifier of a resolved action outcome.
///
/// Outcome ids are sequential per session and key the explanation log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutcomeId(pub u64);

impl OutcomeId {
    /// Create a new outcome id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for OutcomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Outcome({})", self.0)
    }
}

/// Monotonic id allocator stored in `GameState`.
///
/// Each id kind has its own counter; counters start at 1 so that
/// `0` never names a live object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next_unit: u32,
    next_character: u32,
    next_combat: u32,
    next_effect: u32,
    next_terrain: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next_unit: 1,
            next_character: 1,
            next_combat: 1,
            next_effect: 1,
            next_terrain: 1,
        }
    }
}

impl IdAllocator {
    /// Allocate a unit id.
    pub fn unit(&mut self) -> UnitId {
        let id = UnitId(self.next_unit);
        self.next_unit += 1;
        id
    }

    /// Allocate a character id.
    pub fn character(&mut self) -> CharacterId {
        let id = CharacterId(self.next_character);
        self.next_character += 1;
        id
    }

    /// Allocate a combat id.
    pub fn combat(&mut self) -> CombatId {
        let id = CombatId(self.next_combat);
        self.next_combat += 1;
        id
    }

    /// Allocate a spell effect id.
    pub fn effect(&mut self) -> EffectId {
        let id = EffectId(self.next_effect);
        self.next_effect += 1;
        id
    }

    /// Allocate a terrain id.
    pub fn terrain(&mut self) -> TerrainId {
        let id = TerrainId(self.next_terrain);
        self.next_terrain += 1;
        id
    }

    /// Make sure future unit ids are above an externally chosen one.
    pub fn observe_unit(&mut self, id: UnitId) {
        if id.0 >= self.next_unit {
            self.next_unit = id.0 + 1;
        }
    }

    /// Make sure future terrain ids are above an externally chosen one.
    pub fn observe_terrain(&mut self, id: TerrainId) {
        if id.0 >= self.next_terrain {
            self.next_terrain = id.0 + 1;
        }
    }

    /// Make sure future character ids are above an externally chosen one.
    pub fn observe_character(&mut self, id: CharacterId) {
        if id.0 >= self.next_character {
            self.next_character = id.0 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", UnitId::new(7)), "Unit(7)");
        assert_eq!(format!("{}", CombatId::new(2)), "Combat(2)");
        assert_eq!(format!("{}", OutcomeId::new(9)), "Outcome(9)");
    }

    #[test]
    fn test_allocator_is_monotonic() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.unit(), UnitId(1));
        assert_eq!(ids.unit(), UnitId(2));
        assert_eq!(ids.combat(), CombatId(1));
        assert_eq!(ids.effect(), EffectId(1));
    }

    #[test]
    fn test_observe_external_ids() {
        let mut ids = IdAllocator::default();
        ids.observe_unit(UnitId(10));
        assert_eq!(ids.unit(), UnitId(11));

        // Lower ids do not move the counter back.
        ids.observe_unit(UnitId(3));
        assert_eq!(ids.unit(), UnitId(12));
    }

    #[test]
    fn test_ordering() {
        assert!(UnitId(1) < UnitId(2));
        assert_eq!(OutcomeId(4).next(), OutcomeId(5));
    }
}
