//! Stat contract shared by every combatant, and the fortune overlay.
//!
//! A knight's effective stats are computed, never stored: the base
//! [`Stats`] are merged with the attached [`Fortune`] by
//! [`Stats::with_fortune`], the only place the merge rule lives.

use crate::dice::DiceType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything that exposes the four combat stats.
///
/// Base combatants report absolute values; fortunes report deltas.
pub trait Attributes {
    fn max_hp(&self) -> i32;
    fn armor(&self) -> i32;
    fn accuracy(&self) -> i32;
    fn damage_die(&self) -> DiceType;

    /// Snapshot the four values.
    fn stats(&self) -> Stats {
        Stats {
            max_hp: self.max_hp(),
            armor: self.armor(),
            accuracy: self.accuracy(),
            damage_die: self.damage_die(),
        }
    }
}

/// A plain set of combat stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Stats {
    pub max_hp: i32,
    pub armor: i32,
    pub accuracy: i32,
    pub damage_die: DiceType,
}

impl Stats {
    pub fn new(max_hp: i32, armor: i32, accuracy: i32, damage_die: DiceType) -> Self {
        Self {
            max_hp,
            armor,
            accuracy,
            damage_die,
        }
    }

    /// Overlay a fortune onto these stats.
    ///
    /// Armor, max HP and accuracy add up, saturating at the `i32` bounds; the
    /// fortune's die replaces the base die unless it is `None`. Negative
    /// results are legal.
    pub fn with_fortune(&self, fortune: &Fortune) -> Stats {
        effective(self, fortune)
    }
}

impl Attributes for Stats {
    fn max_hp(&self) -> i32 {
        self.max_hp
    }

    fn armor(&self) -> i32 {
        self.armor
    }

    fn accuracy(&self) -> i32 {
        self.accuracy
    }

    fn damage_die(&self) -> DiceType {
        self.damage_die
    }
}

/// Merge a base stat set with a modifier's deltas.
pub fn effective(base: &impl Attributes, modifier: &impl Attributes) -> Stats {
    let damage_die = match modifier.damage_die() {
        DiceType::None => base.damage_die(),
        die => die,
    };

    Stats {
        max_hp: base.max_hp().saturating_add(modifier.max_hp()),
        armor: base.armor().saturating_add(modifier.armor()),
        accuracy: base.accuracy().saturating_add(modifier.accuracy()),
        damage_die,
    }
}

/// A named bundle of stat deltas attached to a knight for one adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fortune {
    name: String,
    hp: i32,
    armor: i32,
    accuracy: i32,
    damage_die: DiceType,
}

impl Fortune {
    /// Name carried by the neutral fortune.
    pub const NONE_NAME: &'static str = "None";

    pub fn new(
        name: impl Into<String>,
        hp: i32,
        armor: i32,
        accuracy: i32,
        damage_die: DiceType,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            hp,
            armor,
            accuracy,
            damage_die,
        }
    }

    /// The neutral fortune: no deltas, no die override.
    pub fn none() -> Self {
        Self::new(Self::NONE_NAME, 0, 0, 0, DiceType::None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when attaching this fortune changes nothing.
    pub fn is_neutral(&self) -> bool {
        self.hp == 0 && self.armor == 0 && self.accuracy == 0 && self.damage_die.is_none()
    }
}

impl Default for Fortune {
    fn default() -> Self {
        Self::none()
    }
}

impl Attributes for Fortune {
    fn max_hp(&self) -> i32 {
        self.hp
    }

    fn armor(&self) -> i32 {
        self.armor
    }

    fn accuracy(&self) -> i32 {
        self.accuracy
    }

    fn damage_die(&self) -> DiceType {
        self.damage_die
    }
}

impl fmt::Display for Fortune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (HP {:+}, Armor {:+}, Accuracy {:+}, Die {})",
            self.name, self.hp, self.armor, self.accuracy, self.damage_die
        )
    }
}
