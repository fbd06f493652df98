//! Monsters and knights.
//!
//! Both hold fixed base [`Stats`] and a mutable damage counter; current HP is
//! derived. A knight additionally carries an ID, experience and exactly one
//! attached [`Fortune`], and reports its stats with that fortune applied.

use crate::dice::DiceType;
use crate::stats::{Attributes, Fortune, Stats};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A participant in battle. Stats reported through [`Attributes`] are the
/// effective ones.
pub trait Combatant: Attributes {
    fn name(&self) -> &str;

    /// Damage taken so far.
    fn damage(&self) -> i32;

    /// Apply damage (negative heals), clamped to `[0, max_hp]`.
    fn add_damage(&mut self, amount: i32);

    fn reset_damage(&mut self);

    /// Effective max HP minus damage. Zero or less means defeated.
    fn hp(&self) -> i32 {
        self.max_hp() - self.damage()
    }

    fn is_defeated(&self) -> bool {
        self.hp() <= 0
    }
}

/// Clamp a damage total into `[0, max_hp]`; a negative max clamps to 0.
fn clamp_damage(current: i32, amount: i32, max_hp: i32) -> i32 {
    current.saturating_add(amount).min(max_hp).max(0)
}

// ============================================================================
// Monster
// ============================================================================

/// A non-player combatant. Catalog entries are archetypes; battles use
/// [`Monster::copy`] so each drawn instance tracks its own damage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    name: String,
    stats: Stats,
    damage: i32,
}

impl Monster {
    pub fn new(name: impl Into<String>, stats: Stats) -> Self {
        Self {
            name: name.into().trim().to_string(),
            stats,
            damage: 0,
        }
    }

    /// Fresh instance with the same stats and no damage.
    pub fn copy(&self) -> Monster {
        Monster::new(self.name.clone(), self.stats)
    }

    /// Fresh, renamed instance with the same stats and no damage.
    pub fn copy_named(&self, name: impl Into<String>) -> Monster {
        Monster::new(name, self.stats)
    }

    pub fn base_stats(&self) -> Stats {
        self.stats
    }
}

impl Attributes for Monster {
    fn max_hp(&self) -> i32 {
        self.stats.max_hp
    }

    fn armor(&self) -> i32 {
        self.stats.armor
    }

    fn accuracy(&self) -> i32 {
        self.stats.accuracy
    }

    fn damage_die(&self) -> DiceType {
        self.stats.damage_die
    }
}

impl Combatant for Monster {
    fn name(&self) -> &str {
        &self.name
    }

    fn damage(&self) -> i32 {
        self.damage
    }

    fn add_damage(&mut self, amount: i32) {
        self.damage = clamp_damage(self.damage, amount, self.max_hp());
    }

    fn reset_damage(&mut self) {
        self.damage = 0;
    }
}

impl fmt::Display for Monster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (HP {}/{}, Armor {}, Die {})",
            self.name,
            self.hp(),
            self.max_hp(),
            self.armor(),
            self.damage_die()
        )
    }
}

// ============================================================================
// Knight
// ============================================================================

/// Roster identifier, assigned sequentially from 1 in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KnightId(pub u32);

impl fmt::Display for KnightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player-controlled combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knight {
    id: KnightId,
    name: String,
    base: Stats,
    damage: i32,
    xp: u32,
    fortune: Fortune,
}

impl Knight {
    pub fn new(id: KnightId, name: impl Into<String>, base: Stats, xp: u32) -> Self {
        Self {
            id,
            name: name.into().trim().to_string(),
            base,
            damage: 0,
            xp,
            fortune: Fortune::none(),
        }
    }

    pub fn id(&self) -> KnightId {
        self.id
    }

    /// Stats before the fortune is applied. These are what gets saved.
    pub fn base_stats(&self) -> Stats {
        self.base
    }

    /// Stats with the attached fortune applied.
    pub fn effective_stats(&self) -> Stats {
        self.base.with_fortune(&self.fortune)
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }

    pub fn add_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(amount);
    }

    pub fn fortune(&self) -> &Fortune {
        &self.fortune
    }

    /// Replace the attached fortune. Fortunes never stack.
    pub fn set_fortune(&mut self, fortune: Fortune) {
        self.fortune = fortune;
    }

    pub fn clear_fortune(&mut self) {
        self.fortune = Fortune::none();
    }

    /// Give the knight a new roster ID (used when a roster is rebuilt).
    pub(crate) fn reassign_id(&mut self, id: KnightId) {
        self.id = id;
    }
}

impl Attributes for Knight {
    fn max_hp(&self) -> i32 {
        self.effective_stats().max_hp
    }

    fn armor(&self) -> i32 {
        self.effective_stats().armor
    }

    fn accuracy(&self) -> i32 {
        self.effective_stats().accuracy
    }

    fn damage_die(&self) -> DiceType {
        self.effective_stats().damage_die
    }
}

impl Combatant for Knight {
    fn name(&self) -> &str {
        &self.name
    }

    fn damage(&self) -> i32 {
        self.damage
    }

    fn add_damage(&mut self, amount: i32) {
        self.damage = clamp_damage(self.damage, amount, self.max_hp());
    }

    fn reset_damage(&mut self) {
        self.damage = 0;
    }
}

impl fmt::Display for Knight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} (HP {}/{}, Armor {}, Die {}, XP {})",
            self.id,
            self.name,
            self.hp(),
            self.max_hp(),
            self.armor(),
            self.damage_die(),
            self.xp
        )
    }
}
