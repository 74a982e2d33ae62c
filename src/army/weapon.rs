//! Weapons and magic items.

use serde::{Deserialize, Serialize};

use crate::rules::RuleId;

/// A weapon carried by a unit's rank and file or by a character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    /// Display name.
    pub name: String,
    /// Maximum range in inches; `None` for close combat weapons.
    pub range: Option<f32>,
    /// Shots per model when shooting.
    pub shots: u8,
    /// Added to the wielder's strength.
    pub strength_modifier: i8,
    /// Worsens the target's armour save by this much.
    pub armour_penetration: u8,
    /// Special rules carried by the weapon.
    pub rules: Vec<RuleId>,
}

impl Weapon {
    /// A close combat weapon with no modifiers.
    pub fn melee(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: None,
            shots: 0,
            strength_modifier: 0,
            armour_penetration: 0,
            rules: Vec::new(),
        }
    }

    /// A missile weapon with one shot.
    pub fn ranged(name: impl Into<String>, range: f32) -> Self {
        Self {
            name: name.into(),
            range: Some(range),
            shots: 1,
            strength_modifier: 0,
            armour_penetration: 0,
            rules: Vec::new(),
        }
    }

    /// Set the strength modifier (builder pattern).
    #[must_use]
    pub fn with_strength(mut self, modifier: i8) -> Self {
        self.strength_modifier = modifier;
        self
    }

    /// Set armour penetration (builder pattern).
    #[must_use]
    pub fn with_armour_penetration(mut self, ap: u8) -> Self {
        self.armour_penetration = ap;
        self
    }

    /// Set shots per model (builder pattern).
    #[must_use]
    pub fn with_shots(mut self, shots: u8) -> Self {
        self.shots = shots;
        self
    }

    /// Attach a special rule (builder pattern).
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(RuleId::new(rule));
        self
    }

    /// Whether the weapon can shoot.
    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.range.is_some()
    }
}

/// A magic item. Its powers are special rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicItem {
    pub name: String,
    pub rules: Vec<RuleId>,
}

impl MagicItem {
    /// Create an item granting the given rules.
    pub fn new<S: Into<String>>(name: impl Into<String>, rules: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            rules: rules.into_iter().map(|r| RuleId::new(r)).collect(),
        }
    }
}
