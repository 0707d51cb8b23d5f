//! Randomness behind the lucky-tap draw.
//!
//! The engine never calls a global RNG directly; it draws through
//! [`Luck`] so that sessions can be replayed from a seed and tests can
//! script the exact draws they need.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// A source of lucky-tap draws.
pub trait Luck: Send {
    /// Draws once; true with probability `chance` (0.0 to 1.0).
    fn lucky(&mut self, chance: f64) -> bool;
}

/// OS-entropy randomness for normal play.
pub struct EntropyLuck {
    rng: StdRng,
}

impl EntropyLuck {
    /// Creates a source seeded from operating system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for EntropyLuck {
    fn default() -> Self {
        Self::new()
    }
}

impl Luck for EntropyLuck {
    fn lucky(&mut self, chance: f64) -> bool {
        self.rng.gen_bool(chance.clamp(0.0, 1.0))
    }
}

/// Deterministic randomness: the same seed replays the same draws.
pub struct SeededLuck {
    rng: ChaCha20Rng,
}

impl SeededLuck {
    /// Creates a source that replays the draw sequence for `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl Luck for SeededLuck {
    fn lucky(&mut self, chance: f64) -> bool {
        self.rng.gen_bool(chance.clamp(0.0, 1.0))
    }
}

/// Plays back a fixed script of draws, then answers false forever.
pub struct ScriptedLuck {
    draws: VecDeque<bool>,
}

impl ScriptedLuck {
    /// Creates a source that yields `draws` in order.
    pub fn new(draws: impl IntoIterator<Item = bool>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
        }
    }
}

impl Luck for ScriptedLuck {
    fn lucky(&mut self, _chance: f64) -> bool {
        self.draws.pop_front().unwrap_or(false)
    }
}
