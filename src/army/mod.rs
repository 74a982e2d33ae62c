//! Army data: profiles, units, characters, equipment, spells and terrain.
//!
//! These are plain data types. They carry rule identifiers but never
//! interpret them; that is the modifier pipeline's job.

pub mod character;
pub mod profile;
pub mod spell;
pub mod terrain;
pub mod unit;
pub mod weapon;

pub use character::Character;
pub use profile::{Profile, TroopType};
pub use spell::{DurationClass, Spell, SpellCategory, SpellEffectSpec, SpellId};
pub use terrain::{Bounds, TerrainFeature, TerrainKind};
pub use unit::{CasualtyReport, TurnFlags, Unit};
pub use weapon::{MagicItem, Weapon};
