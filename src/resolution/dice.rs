//! Dice sources.
//!
//! The engine never generates randomness. Every resolution function takes
//! a `&mut dyn DiceSource` and records what it drew, so a game can be
//! replayed exactly by feeding the recorded draws to a [`ScriptedDice`].
//!
//! ```
//! use rust_wargame::resolution::{DiceSource, RecordingDice, ScriptedDice, SeededDice};
//!
//! let mut dice = RecordingDice::new(SeededDice::new(7));
//! let first: Vec<u8> = (0..4).map(|_| dice.draw(6).unwrap()).collect();
//!
//! let mut replay = ScriptedDice::new(dice.recorded().to_vec());
//! let again: Vec<u8> = (0..4).map(|_| replay.draw(6).unwrap()).collect();
//! assert_eq!(first, again);
//! assert!(replay.draw(6).is_err());
//! ```

use smallvec::SmallVec;

use crate::core::{GameRng, GameRngState, Result, RulesError};

/// Draws held inline; most tests roll at most a handful of dice.
pub type Draws = SmallVec<[u8; 8]>;

/// Source of die results.
pub trait DiceSource {
    /// Draw one die with `sides` faces (result in `1..=sides`).
    fn draw(&mut self, sides: u8) -> Result<u8>;

    /// Draw `count` dice.
    fn draw_many(&mut self, count: usize, sides: u8) -> Result<Draws> {
        (0..count).map(|_| self.draw(sides)).collect()
    }

    /// Draw `count` D6.
    fn d6(&mut self, count: usize) -> Result<Draws> {
        self.draw_many(count, 6)
    }
}

impl<D: DiceSource + ?Sized> DiceSource for &mut D {
    fn draw(&mut self, sides: u8) -> Result<u8> {
        (**self).draw(sides)
    }
}

impl<D: DiceSource + ?Sized> DiceSource for Box<D> {
    fn draw(&mut self, sides: u8) -> Result<u8> {
        (**self).draw(sides)
    }
}

/// Dice from a seeded deterministic generator.
#[derive(Clone, Debug)]
pub struct SeededDice {
    rng: GameRng,
}

impl SeededDice {
    /// Create a source from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: GameRng::new(seed),
        }
    }

    /// Resume from a checkpoint taken with [`SeededDice::state`].
    #[must_use]
    pub fn resume(state: &GameRngState) -> Self {
        Self {
            rng: GameRng::from_state(state),
        }
    }

    /// Generator state, for checkpoints.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        self.rng.state()
    }
}

impl DiceSource for SeededDice {
    fn draw(&mut self, sides: u8) -> Result<u8> {
        if sides == 0 {
            return Err(RulesError::InvalidAction("a die needs at least one side".to_string()));
        }
        Ok(self.rng.roll(sides))
    }
}

/// Dice replayed from a recorded sequence.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDice {
    draws: Vec<u8>,
    next: usize,
}

impl ScriptedDice {
    /// Replay `draws` in order.
    #[must_use]
    pub fn new(draws: impl Into<Vec<u8>>) -> Self {
        Self {
            draws: draws.into(),
            next: 0,
        }
    }

    /// Draws not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.draws.len() - self.next
    }
}

impl DiceSource for ScriptedDice {
    fn draw(&mut self, sides: u8) -> Result<u8> {
        let Some(&value) = self.draws.get(self.next) else {
            return Err(RulesError::DiceExhausted { drawn: self.next });
        };
        if value == 0 || value > sides {
            return Err(RulesError::InvalidAction(format!(
                "scripted draw {} does not fit a d{}",
                value, sides
            )));
        }
        self.next += 1;
        Ok(value)
    }
}

/// Wraps a source and keeps every value it produced.
#[derive(Clone, Debug)]
pub struct RecordingDice<D> {
    inner: D,
    recorded: Vec<u8>,
}

impl<D: DiceSource> RecordingDice<D> {
    /// Record draws from `inner`.
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
        }
    }

    /// Values drawn so far.
    #[must_use]
    pub fn recorded(&self) -> &[u8] {
        &self.recorded
    }

    /// Take the recorded values, leaving the record empty.
    pub fn take_recorded(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.recorded)
    }

    /// Unwrap the inner source.
    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: DiceSource> DiceSource for RecordingDice<D> {
    fn draw(&mut self, sides: u8) -> Result<u8> {
        let value = self.inner.draw(sides)?;
        self.recorded.push(value);
        Ok(value)
    }
}

/// Sum of draws.
#[must_use]
pub fn total(draws: &[u8]) -> i64 {
    draws.iter().map(|&d| i64::from(d)).sum()
}
