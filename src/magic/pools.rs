//! Power and dispel pools, and the winds of magic that fill them.

use serde::{Deserialize, Serialize};

use crate::core::{EngineConfig, GameState, PlayerId, PlayerMap, Result, RulesError};
use crate::explain::{Citation, Provenance, TraceEntry};
use crate::resolution::{total, DiceSource, Draws};
use crate::rules::RuleId;

/// Casting and dispel dice available to each player this turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicPools {
    pub casting: PlayerMap<u8>,
    pub dispel: PlayerMap<u8>,
}

impl MagicPools {
    /// Remove `dice` from a player's casting pool.
    pub fn spend_casting(&mut self, player: PlayerId, dice: u8) -> Result<()> {
        spend(&mut self.casting[player], player, dice)
    }

    /// Remove `dice` from a player's dispel pool.
    pub fn spend_dispel(&mut self, player: PlayerId, dice: u8) -> Result<()> {
        spend(&mut self.dispel[player], player, dice)
    }

    /// Empty a player's casting pool (lost to a miscast).
    pub fn drain_casting(&mut self, player: PlayerId) {
        self.casting[player] = 0;
    }

    /// Empty both pools of both players.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn spend(pool: &mut u8, player: PlayerId, dice: u8) -> Result<()> {
    if dice > *pool {
        return Err(RulesError::InsufficientPool {
            player,
            requested: dice,
            available: *pool,
        });
    }
    *pool -= dice;
    Ok(())
}

/// The winds of magic rolled at the start of a player's turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindsOfMagic {
    /// Player whose turn it is.
    pub active: PlayerId,
    pub draws: Draws,
    /// Casting pool of the active player.
    pub casting: u8,
    /// Dispel pool of the opponent.
    pub dispel: u8,
}

impl WindsOfMagic {
    /// Pools after the winds blow; the previous turn's dice are gone.
    #[must_use]
    pub fn pools(&self) -> MagicPools {
        let mut pools = MagicPools::default();
        pools.casting[self.active] = self.casting;
        pools.dispel[self.active.opponent()] = self.dispel;
        pools
    }
}

impl Provenance for WindsOfMagic {
    fn provenance(&self, out: &mut Vec<TraceEntry>) {
        out.push(
            TraceEntry::new(
                format!(
                    "winds of magic: {} casting dice, {} dispel dice",
                    self.casting, self.dispel
                ),
                RuleId::new("winds_of_magic"),
                Citation::new("Core Rules", 78).with_section("Winds of Magic"),
            )
            .with_draws(&self.draws),
        );
    }
}

fn has_wizard(state: &GameState, player: PlayerId) -> bool {
    state.live_units_of(player).any(|u| u.best_wizard_level() > 0)
}

/// Roll the winds of magic for the active player.
///
/// The casting pool is the total, the opposing dispel pool the highest
/// die; a side without wizards gets no dice.
pub fn roll_winds(state: &GameState, config: &EngineConfig, dice: &mut dyn DiceSource) -> Result<WindsOfMagic> {
    let active = state.active_player();
    let draws = dice.d6(usize::from(config.winds_dice))?;
    let casting = if has_wizard(state, active) {
        total(&draws).min(i64::from(config.max_casting_pool)) as u8
    } else {
        0
    };
    let dispel = if has_wizard(state, active.opponent()) {
        draws.iter().copied().max().unwrap_or(0).min(config.max_dispel_pool)
    } else {
        0
    };
    Ok(WindsOfMagic {
        active,
        draws,
        casting,
        dispel,
    })
}
