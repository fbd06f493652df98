//! Dice rolling.
//!
//! A fixed set of die types plus a `None` sentinel for "no die". All
//! randomness in the engine flows through a [`DiceRoller`], so a battle can
//! be replayed from a seed or driven by scripted values in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice token parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Unknown dice type: {0:?} (expected D4, D6, D8, D10, D12, D20 or -)")]
    UnknownToken(String),
}

/// The die types a combatant or fortune can carry.
///
/// `None` means "no die": it never participates in a roll and, as a fortune
/// override, leaves the base die in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DiceType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    #[default]
    None,
}

impl DiceType {
    /// Every rollable die type, smallest first.
    pub const ROLLABLE: [DiceType; 6] = [
        DiceType::D4,
        DiceType::D6,
        DiceType::D8,
        DiceType::D10,
        DiceType::D12,
        DiceType::D20,
    ];

    /// Number of faces, or `None` for the sentinel.
    pub fn faces(&self) -> Option<u32> {
        match self {
            DiceType::D4 => Some(4),
            DiceType::D6 => Some(6),
            DiceType::D8 => Some(8),
            DiceType::D10 => Some(10),
            DiceType::D12 => Some(12),
            DiceType::D20 => Some(20),
            DiceType::None => None,
        }
    }

    pub fn from_faces(faces: u32) -> Option<DiceType> {
        match faces {
            4 => Some(DiceType::D4),
            6 => Some(DiceType::D6),
            8 => Some(DiceType::D8),
            10 => Some(DiceType::D10),
            12 => Some(DiceType::D12),
            20 => Some(DiceType::D20),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DiceType::None)
    }

    /// Record token for this die (`-` for `None`).
    pub fn token(&self) -> &'static str {
        match self {
            DiceType::D4 => "D4",
            DiceType::D6 => "D6",
            DiceType::D8 => "D8",
            DiceType::D10 => "D10",
            DiceType::D12 => "D12",
            DiceType::D20 => "D20",
            DiceType::None => "-",
        }
    }
}

impl fmt::Display for DiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for DiceType {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token == "-" {
            return Ok(DiceType::None);
        }

        let faces = token
            .strip_prefix('D')
            .or_else(|| token.strip_prefix('d'))
            .and_then(|n| n.parse::<u32>().ok());

        faces
            .and_then(DiceType::from_faces)
            .ok_or_else(|| DiceError::UnknownToken(token.to_string()))
    }
}

/// Source of every random value the engine draws.
///
/// Implementors provide two primitives; [`DiceRoller::roll`] is built on top
/// of them and owns the `None` handling.
pub trait DiceRoller {
    /// Uniform value in `[1, faces]`. `faces` is always one of the die sizes.
    fn roll_faces(&mut self, faces: u32) -> i32;

    /// Uniform index in `[0, len)`. Callers never pass `len == 0`.
    fn pick(&mut self, len: usize) -> usize;

    /// Roll a die. Rolling `None` is a usage error: it is logged and yields 0.
    fn roll(&mut self, die: DiceType) -> i32 {
        match die.faces() {
            Some(faces) => self.roll_faces(faces),
            None => {
                tracing::warn!("roll() called with DiceType::None; treating as 0");
                0
            }
        }
    }
}

impl<T: DiceRoller + ?Sized> DiceRoller for &mut T {
    fn roll_faces(&mut self, faces: u32) -> i32 {
        (**self).roll_faces(faces)
    }

    fn pick(&mut self, len: usize) -> usize {
        (**self).pick(len)
    }

    fn roll(&mut self, die: DiceType) -> i32 {
        (**self).roll(die)
    }
}

/// Dice backed by a `rand` RNG.
#[derive(Debug, Clone)]
pub struct Dice<R = StdRng> {
    rng: R,
}

impl Dice<StdRng> {
    /// Dice seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible dice: the same seed replays the same battle.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Dice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }
}

impl Default for Dice<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> DiceRoller for Dice<R> {
    fn roll_faces(&mut self, faces: u32) -> i32 {
        self.rng.gen_range(1..=faces) as i32
    }

    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}
