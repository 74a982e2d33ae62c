//! Spells.

use serde::{Deserialize, Serialize};

use crate::explain::Citation;
use crate::rules::RuleId;
use crate::sequencer::Phase;

/// Identifier of a spell.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellId(pub String);

impl SpellId {
    /// Create a new spell id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SpellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spell category. Decides the phase a spell is cast in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellCategory {
    Enchantment,
    Hex,
    Conveyance,
    MagicMissile,
    Assailment,
}

impl SpellCategory {
    /// The phase spells of this category are cast in.
    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            SpellCategory::Enchantment | SpellCategory::Hex => Phase::Strategy,
            SpellCategory::Conveyance => Phase::Movement,
            SpellCategory::MagicMissile => Phase::Shooting,
            SpellCategory::Assailment => Phase::Combat,
        }
    }
}

/// What a spell does once it resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellEffectSpec {
    /// Hits resolved from to-wound onwards.
    DirectDamage {
        hits: u8,
        strength: u8,
        armour_penetration: u8,
    },
    /// Grants special rules to a friendly unit.
    Augment { rules: Vec<RuleId> },
    /// Grants special rules to an enemy unit.
    Hex { rules: Vec<RuleId> },
    /// Restores lost wounds to a friendly unit.
    Heal { wounds: u8 },
}

impl SpellEffectSpec {
    /// Whether the spell must target an enemy unit.
    #[must_use]
    pub fn targets_enemy(&self) -> bool {
        matches!(self, SpellEffectSpec::DirectDamage { .. } | SpellEffectSpec::Hex { .. })
    }

    /// Rules granted to the target, if any.
    #[must_use]
    pub fn granted_rules(&self) -> &[RuleId] {
        match self {
            SpellEffectSpec::Augment { rules } | SpellEffectSpec::Hex { rules } => rules,
            _ => &[],
        }
    }
}

/// How long a spell's effect lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationClass {
    /// Resolved at once; granted rules last until the end of the phase.
    Instant,
    /// Until the start of the caster's next turn.
    UntilCasterNextTurn,
    /// Until dispelled, or until the caster or target is gone.
    RemainsInPlay,
}

/// A spell definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub id: SpellId,
    pub name: String,
    pub lore: String,
    pub casting_value: u8,
    pub category: SpellCategory,
    /// Range in inches from the caster's unit.
    pub range: f32,
    pub effect: SpellEffectSpec,
    pub duration: DurationClass,
    pub citation: Citation,
}

impl Spell {
    /// Create an instant spell.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        lore: impl Into<String>,
        casting_value: u8,
        category: SpellCategory,
        range: f32,
        effect: SpellEffectSpec,
        citation: Citation,
    ) -> Self {
        Self {
            id: SpellId::new(id),
            name: name.into(),
            lore: lore.into(),
            casting_value,
            category,
            range,
            effect,
            duration: DurationClass::Instant,
            citation,
        }
    }

    /// Set the duration (builder pattern).
    #[must_use]
    pub fn lasting(mut self, duration: DurationClass) -> Self {
        self.duration = duration;
        self
    }
}
