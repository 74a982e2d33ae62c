//! Characters.
//!
//! A character always belongs to exactly one unit. A character fighting on
//! its own is a unit with no rank and file.

use serde::{Deserialize, Serialize};

use crate::core::CharacterId;
use crate::rules::RuleId;

use super::profile::Profile;
use super::spell::SpellId;
use super::weapon::{MagicItem, Weapon};

/// A character model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub profile: Profile,
    /// Wounds suffered so far.
    pub wounds_taken: u8,
    pub weapons: Vec<Weapon>,
    pub items: Vec<MagicItem>,
    /// Spells known (wizards only).
    pub spells: Vec<SpellId>,
    /// Wizard level; 0 for non-wizards.
    pub wizard_level: u8,
    pub rules: Vec<RuleId>,
    /// Armour save value (7 means none).
    pub armour: u8,
    /// Ward save value (7 means none).
    pub ward: u8,
}

impl Character {
    /// Create a character with no equipment.
    pub fn new(id: CharacterId, name: impl Into<String>, profile: Profile) -> Self {
        Self {
            id,
            name: name.into(),
            profile,
            wounds_taken: 0,
            weapons: Vec::new(),
            items: Vec::new(),
            spells: Vec::new(),
            wizard_level: 0,
            rules: Vec::new(),
            armour: 7,
            ward: 7,
        }
    }

    /// Make the character a wizard (builder pattern).
    #[must_use]
    pub fn wizard<S: Into<String>>(mut self, level: u8, spells: impl IntoIterator<Item = S>) -> Self {
        self.wizard_level = level;
        self.spells = spells.into_iter().map(|s| SpellId::new(s)).collect();
        self
    }

    /// Add a weapon (builder pattern).
    #[must_use]
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapons.push(weapon);
        self
    }

    /// Add a magic item (builder pattern).
    #[must_use]
    pub fn with_item(mut self, item: MagicItem) -> Self {
        self.items.push(item);
        self
    }

    /// Attach a special rule (builder pattern).
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(RuleId::new(rule));
        self
    }

    /// Set the armour save (builder pattern).
    #[must_use]
    pub fn with_armour(mut self, armour: u8) -> Self {
        self.armour = armour;
        self
    }

    /// Remaining wounds.
    #[must_use]
    pub fn wounds_left(&self) -> u8 {
        self.profile.wounds.saturating_sub(self.wounds_taken)
    }

    /// Whether the character is still on the table.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.wounds_left() > 0
    }

    /// Whether the character can cast spells.
    #[must_use]
    pub fn is_wizard(&self) -> bool {
        self.wizard_level > 0 && !self.spells.is_empty()
    }

    /// Whether the character knows a spell.
    #[must_use]
    pub fn knows(&self, spell: &SpellId) -> bool {
        self.spells.contains(spell)
    }

    /// Every rule the character carries, including magic item powers.
    pub fn carried_rules(&self) -> impl Iterator<Item = &RuleId> {
        self.rules.iter().chain(self.items.iter().flat_map(|i| i.rules.iter()))
    }

    /// Apply wounds; returns how many were absorbed.
    pub fn take_wounds(&mut self, wounds: u32) -> u32 {
        let absorbed = wounds.min(u32::from(self.wounds_left()));
        // absorbed <= wounds_left, which fits in u8
        self.wounds_taken = self.wounds_taken.saturating_add(absorbed as u8);
        absorbed
    }

    /// Restore up to `wounds` lost wounds; returns how many were healed.
    pub fn heal(&mut self, wounds: u32) -> u32 {
        let healed = wounds.min(u32::from(self.wounds_taken));
        self.wounds_taken -= healed as u8;
        healed
    }
}
