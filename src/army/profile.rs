//! Characteristic profiles.

use serde::{Deserialize, Serialize};

/// The nine characteristics of a model.
///
/// ```
/// use rust_wargame::army::Profile;
///
/// let spearman = Profile::line([4, 3, 3, 3, 3, 1, 3, 1, 7]);
/// assert_eq!(spearman.weapon_skill, 3);
/// assert_eq!(spearman.leadership, 7);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    pub movement: u8,
    pub weapon_skill: u8,
    pub ballistic_skill: u8,
    pub strength: u8,
    pub toughness: u8,
    pub wounds: u8,
    pub initiative: u8,
    pub attacks: u8,
    pub leadership: u8,
}

impl Profile {
    /// Build a profile from a statline in rulebook order
    /// (M, WS, BS, S, T, W, I, A, Ld).
    #[must_use]
    pub const fn line(stats: [u8; 9]) -> Self {
        Self {
            movement: stats[0],
            weapon_skill: stats[1],
            ballistic_skill: stats[2],
            strength: stats[3],
            toughness: stats[4],
            wounds: stats[5],
            initiative: stats[6],
            attacks: stats[7],
            leadership: stats[8],
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "M{} WS{} BS{} S{} T{} W{} I{} A{} Ld{}",
            self.movement,
            self.weapon_skill,
            self.ballistic_skill,
            self.strength,
            self.toughness,
            self.wounds,
            self.initiative,
            self.attacks,
            self.leadership
        )
    }
}

/// Broad troop category, used by rule conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TroopType {
    Infantry,
    Cavalry,
    MonstrousInfantry,
    Monster,
    WarMachine,
    Swarm,
}

impl TroopType {
    /// Symbol used in fact vectors.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TroopType::Infantry => "infantry",
            TroopType::Cavalry => "cavalry",
            TroopType::MonstrousInfantry => "monstrous_infantry",
            TroopType::Monster => "monster",
            TroopType::WarMachine => "war_machine",
            TroopType::Swarm => "swarm",
        }
    }
}
