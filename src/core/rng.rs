//! Seeded dice generator.
//!
//! The engine itself never rolls; it draws from a
//! [`DiceSource`](crate::resolution::DiceSource). `GameRng` backs the
//! seeded source used by local games and simulations, and its state can
//! be checkpointed with a game so a resumed session rolls the same dice.
//!
//! ```
//! use rust_wargame::core::GameRng;
//!
//! let mut rng = GameRng::new(42);
//! rng.roll(6);
//! let checkpoint = rng.state();
//! let next = rng.roll(6);
//!
//! assert_eq!(GameRng::from_state(&checkpoint).roll(6), next);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// ChaCha8 generator with a recoverable position.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Roll one die (result in `1..=sides`).
    ///
    /// # Panics
    ///
    /// Panics if `sides` is zero.
    pub fn roll(&mut self, sides: u8) -> u8 {
        assert!(sides > 0, "a die needs at least one side");
        self.inner.gen_range(1..=sides)
    }

    /// Checkpoint of the generator.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Resume from a checkpoint.
    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

/// Serializable generator position.
///
/// The ChaCha word position makes a checkpoint O(1) however many dice
/// have been rolled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRngState {
    pub seed: u64,
    pub word_pos: u128,
}
