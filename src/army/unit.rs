//! Units.
//!
//! A unit is a block of identical rank-and-file models, plus any attached
//! characters. Wounds are tracked on the front model only: a multi-wound
//! model is removed when its last wound goes, and excess wounds carry over
//! to the next model. Characters take wounds once the rank and file are
//! gone.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::{CharacterId, CombatId, PlayerId, UnitId};
use crate::lifecycle::UnitStatus;
use crate::rules::RuleId;

use super::character::Character;
use super::profile::{Profile, TroopType};
use super::weapon::Weapon;

/// Flags that reset during the turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnFlags {
    pub moved: bool,
    pub marched: bool,
    /// Declared a charge this turn.
    pub charged: bool,
    pub shot: bool,
    /// Took a panic test this phase.
    pub panic_tested: bool,
    /// Models (rank and file plus characters) at the start of the phase.
    pub models_at_phase_start: u32,
}

/// Wounds applied by one casualty event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasualtyReport {
    pub unit: Option<UnitId>,
    /// Wounds actually absorbed.
    pub wounds: u32,
    pub models_removed: u32,
    pub characters_slain: Vec<CharacterId>,
}

/// A unit on the table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub owner: PlayerId,
    pub troop_type: TroopType,
    /// Rank-and-file profile.
    pub profile: Profile,
    /// Rank-and-file models remaining.
    pub models: u32,
    /// Rank-and-file models the unit started the game with.
    pub starting_models: u32,
    /// Formation width.
    pub files: u32,
    /// Wounds suffered by the front model.
    pub damage: u8,
    /// Armour save value (7 means none).
    pub armour: u8,
    /// Ward save value (7 means none).
    pub ward: u8,
    pub weapons: Vec<Weapon>,
    pub rules: Vec<RuleId>,
    pub characters: Vec<Character>,
    /// Centre of the unit, in inches.
    pub position: Vec2,
    /// Facing in radians.
    pub facing: f32,
    /// Whether the unit has been set up on the table.
    pub placed: bool,
    pub status: UnitStatus,
    pub combat: Option<CombatId>,
    /// Whether the unit has ever declared a charge.
    pub has_charged: bool,
    pub flags: TurnFlags,
}

impl Unit {
    /// Create an undeployed unit of `models` models, `files` wide.
    pub fn new(
        id: UnitId,
        name: impl Into<String>,
        owner: PlayerId,
        troop_type: TroopType,
        profile: Profile,
        models: u32,
        files: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            troop_type,
            profile,
            models,
            starting_models: models,
            files: files.max(1),
            damage: 0,
            armour: 7,
            ward: 7,
            weapons: Vec::new(),
            rules: Vec::new(),
            characters: Vec::new(),
            position: Vec2::ZERO,
            facing: 0.0,
            placed: false,
            status: UnitStatus::Deployed,
            combat: None,
            has_charged: false,
            flags: TurnFlags::default(),
        }
    }

    /// A character fighting on its own.
    pub fn lone_character(id: UnitId, owner: PlayerId, troop_type: TroopType, character: Character) -> Self {
        let mut unit = Self::new(id, character.name.clone(), owner, troop_type, character.profile, 0, 1);
        unit.armour = character.armour;
        unit.ward = character.ward;
        unit.characters.push(character);
        unit
    }

    /// Add a weapon (builder pattern).
    #[must_use]
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapons.push(weapon);
        self
    }

    /// Attach a special rule (builder pattern).
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(RuleId::new(rule));
        self
    }

    /// Attach a character (builder pattern).
    #[must_use]
    pub fn with_character(mut self, character: Character) -> Self {
        self.characters.push(character);
        self
    }

    /// Set armour and ward saves (builder pattern).
    #[must_use]
    pub fn with_saves(mut self, armour: u8, ward: u8) -> Self {
        self.armour = armour;
        self.ward = ward;
        self
    }

    /// Living characters.
    pub fn living_characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter().filter(|c| c.is_alive())
    }

    /// Look up an attached character.
    #[must_use]
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Look up an attached character mutably.
    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.iter_mut().find(|c| c.id == id)
    }

    /// Models on the table, characters included.
    #[must_use]
    pub fn model_count(&self) -> u32 {
        self.models + self.living_characters().count() as u32
    }

    /// Whether nothing of the unit is left.
    #[must_use]
    pub fn is_wiped_out(&self) -> bool {
        self.model_count() == 0
    }

    /// Profile the unit moves and tests with.
    #[must_use]
    pub fn lead_profile(&self) -> Profile {
        if self.models > 0 {
            return self.profile;
        }
        self.living_characters()
            .next()
            .map_or(self.profile, |c| c.profile)
    }

    /// Best leadership in the unit.
    #[must_use]
    pub fn leadership(&self) -> u8 {
        let base = if self.models > 0 { self.profile.leadership } else { 0 };
        self.living_characters()
            .map(|c| c.profile.leadership)
            .fold(base, u8::max)
    }

    /// Full ranks of rank and file. A unit with no files counts as one
    /// file wide.
    #[must_use]
    pub fn ranks(&self) -> u32 {
        self.models / self.files.max(1)
    }

    /// Whether the unit is on the table and not destroyed.
    #[must_use]
    pub fn is_on_table(&self) -> bool {
        self.placed && self.status != UnitStatus::Destroyed
    }

    /// Wizard level of the best living wizard in the unit.
    #[must_use]
    pub fn best_wizard_level(&self) -> u8 {
        self.living_characters()
            .filter(|c| c.is_wizard())
            .map(|c| c.wizard_level)
            .max()
            .unwrap_or(0)
    }

    /// Every rule carried at unit level.
    pub fn carried_rules(&self) -> impl Iterator<Item = &RuleId> {
        self.rules.iter()
    }

    /// Apply wounds to rank and file first, then to characters in order.
    pub fn take_wounds(&mut self, wounds: u32) -> CasualtyReport {
        let per_model = u32::from(self.profile.wounds.max(1));
        let mut remaining = wounds;
        let mut report = CasualtyReport {
            unit: Some(self.id),
            ..CasualtyReport::default()
        };

        while remaining > 0 && self.models > 0 {
            let left = per_model - u32::from(self.damage).min(per_model - 1);
            if remaining >= left {
                remaining -= left;
                report.wounds += left;
                self.models -= 1;
                self.damage = 0;
                report.models_removed += 1;
            } else {
                // remaining < left <= per_model, which fits in u8
                self.damage += remaining as u8;
                report.wounds += remaining;
                remaining = 0;
            }
        }

        for character in self.characters.iter_mut().filter(|c| c.is_alive()) {
            if remaining == 0 {
                break;
            }
            let absorbed = character.take_wounds(remaining);
            remaining -= absorbed;
            report.wounds += absorbed;
            if !character.is_alive() {
                report.characters_slain.push(character.id);
            }
        }
        report
    }

    /// Restore lost wounds: damage on the front model first, then whole
    /// models up to the starting strength. Returns wounds restored.
    pub fn heal(&mut self, wounds: u32) -> u32 {
        let per_model = u32::from(self.profile.wounds.max(1));
        let mut remaining = wounds;
        let mut healed = 0;

        let front = u32::from(self.damage).min(remaining);
        // front <= damage
        self.damage -= front as u8;
        remaining -= front;
        healed += front;

        while remaining >= per_model && self.models < self.starting_models {
            self.models += 1;
            remaining -= per_model;
            healed += per_model;
        }
        healed
    }
}
