//! Engine configuration.
//!
//! `EngineConfig` holds the numeric constants that differ between rules
//! editions and house rules. None of them are faction specific; faction
//! content is data in the [`RuleCatalog`](crate::rules::RuleCatalog).

use serde::{Deserialize, Serialize};

/// Numeric game constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Models needed in a rank for it to count towards the rank bonus.
    pub rank_width: u32,

    /// Maximum combat result bonus from ranks.
    pub max_rank_bonus: u32,

    /// Ranks behind the front rank that may make supporting attacks.
    pub supporting_ranks: u32,

    /// Friendly units within this distance (inches) of a broken, fleeing
    /// or destroyed unit must take a panic test.
    pub panic_radius: f32,

    /// Fraction of a unit's models lost to shooting in one phase that
    /// triggers a panic test.
    pub panic_casualty_fraction: f32,

    /// Movement multiplier when marching.
    pub march_multiplier: f32,

    /// Enemy units within this distance prevent marching.
    pub march_block_radius: f32,

    /// Number of D6 rolled for a charge.
    pub charge_dice: u8,

    /// Number of D6 rolled for flee and pursuit distances.
    pub flee_dice: u8,

    /// Number of D6 rolled for the winds of magic.
    pub winds_dice: u8,

    /// Maximum dice in a casting pool.
    pub max_casting_pool: u8,

    /// Maximum dice in a dispel pool.
    pub max_dispel_pool: u8,

    /// Maximum dice one casting or dispel attempt may use.
    pub max_dice_per_attempt: u8,

    /// Distance (inches) a successful charger ends from its target's centre.
    pub contact_distance: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rank_width: 5,
            max_rank_bonus: 3,
            supporting_ranks: 1,
            panic_radius: 6.0,
            panic_casualty_fraction: 0.25,
            march_multiplier: 2.0,
            march_block_radius: 8.0,
            charge_dice: 2,
            flee_dice: 2,
            winds_dice: 2,
            max_casting_pool: 12,
            max_dispel_pool: 12,
            max_dice_per_attempt: 6,
            contact_distance: 1.0,
        }
    }
}

impl EngineConfig {
    /// Set the rank width (builder pattern).
    #[must_use]
    pub fn with_rank_width(mut self, width: u32) -> Self {
        self.rank_width = width;
        self
    }

    /// Set the maximum rank bonus (builder pattern).
    #[must_use]
    pub fn with_max_rank_bonus(mut self, bonus: u32) -> Self {
        self.max_rank_bonus = bonus;
        self
    }

    /// Set the panic radius (builder pattern).
    #[must_use]
    pub fn with_panic_radius(mut self, radius: f32) -> Self {
        self.panic_radius = radius;
        self
    }

    /// Set the number of charge dice (builder pattern).
    #[must_use]
    pub fn with_charge_dice(mut self, dice: u8) -> Self {
        self.charge_dice = dice;
        self
    }

    /// Set the pool caps (builder pattern).
    #[must_use]
    pub fn with_pool_caps(mut self, casting: u8, dispel: u8) -> Self {
        self.max_casting_pool = casting;
        self.max_dispel_pool = dispel;
        self
    }

    /// Rank bonus for a block of `models` arranged `files` wide.
    ///
    /// Counts full ranks behind the first; a rank only counts when the
    /// formation is at least `rank_width` wide.
    ///
    /// ```
    /// use rust_wargame::core::EngineConfig;
    ///
    /// let config = EngineConfig::default();
    /// assert_eq!(config.rank_bonus(20, 5), 3);
    /// assert_eq!(config.rank_bonus(12, 5), 1);
    /// assert_eq!(config.rank_bonus(12, 4), 0);
    /// ```
    #[must_use]
    pub fn rank_bonus(&self, models: u32, files: u32) -> u32 {
        if files == 0 || files < self.rank_width {
            return 0;
        }
        let full_ranks = models / files;
        full_ranks.saturating_sub(1).min(self.max_rank_bonus)
    }
}
