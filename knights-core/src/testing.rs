//! Testing utilities for the combat engine.
//!
//! This module provides tools for deterministic tests:
//! - `ScriptedDice` for replaying exact rolls and picks
//! - `TestHarness` for building rosters with sample catalogs
//! - Assertion helpers for verifying knight state

use crate::combatant::{Combatant, KnightId, Monster};
use crate::dice::{DiceRoller, DiceType};
use crate::roster::Roster;
use crate::stats::{Fortune, Stats};
use std::collections::VecDeque;

/// Dice that replay scripted values.
///
/// Rolls and picks come from separate queues. When the roll queue runs dry
/// every roll is 1; when the pick queue runs dry every pick is 0. Values are
/// clamped into the legal range of the die or list they are used for.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<i32>,
    picks: VecDeque<usize>,
    rolls_used: usize,
    picks_used: usize,
}

impl ScriptedDice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue die results, consumed by every roll of a real die.
    pub fn with_rolls(mut self, rolls: impl IntoIterator<Item = i32>) -> Self {
        self.rolls.extend(rolls);
        self
    }

    /// Queue list indices, consumed by every uniform pick.
    pub fn with_picks(mut self, picks: impl IntoIterator<Item = usize>) -> Self {
        self.picks.extend(picks);
        self
    }

    pub fn push_roll(&mut self, roll: i32) {
        self.rolls.push_back(roll);
    }

    pub fn push_pick(&mut self, pick: usize) {
        self.picks.push_back(pick);
    }

    pub fn rolls_left(&self) -> usize {
        self.rolls.len()
    }

    pub fn picks_left(&self) -> usize {
        self.picks.len()
    }

    pub fn rolls_used(&self) -> usize {
        self.rolls_used
    }

    pub fn picks_used(&self) -> usize {
        self.picks_used
    }
}

impl DiceRoller for ScriptedDice {
    fn roll_faces(&mut self, faces: u32) -> i32 {
        self.rolls_used += 1;
        let value = self.rolls.pop_front().unwrap_or(1);
        value.clamp(1, faces as i32)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.picks_used += 1;
        let value = self.picks.pop_front().unwrap_or(0);
        value.min(len.saturating_sub(1))
    }
}

/// Test harness for building combat scenarios.
pub struct TestHarness {
    /// The roster under test.
    pub roster: Roster,
}

impl TestHarness {
    /// Create a harness with an empty roster and empty catalogs.
    pub fn new() -> Self {
        Self {
            roster: Roster::new(),
        }
    }

    /// Create a harness whose catalogs hold [`sample_fortunes`] and
    /// [`sample_monsters`].
    pub fn with_catalogs() -> Self {
        let mut roster = Roster::new();
        roster.set_fortunes(sample_fortunes());
        roster.set_monsters(sample_monsters());
        Self { roster }
    }

    /// Add a benched knight with no experience.
    pub fn add_knight(&mut self, name: &str, stats: Stats) -> KnightId {
        self.roster.add_knight(name, stats, 0)
    }

    /// Add a knight straight into the active party.
    ///
    /// Panics if the party is already full.
    pub fn add_active_knight(&mut self, name: &str, stats: Stats) -> KnightId {
        let id = self.add_knight(name, stats);
        if let Err(err) = self.roster.activate(id) {
            panic!("could not activate {name}: {err}");
        }
        id
    }

    /// Current HP of a knight, or `None` if the ID is unknown.
    pub fn knight_hp(&self, id: KnightId) -> Option<i32> {
        self.roster.knight(id).map(|k| k.hp())
    }

    pub fn knight_xp(&self, id: KnightId) -> Option<u32> {
        self.roster.knight(id).map(|k| k.xp())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Four fortunes covering a buff, a curse, a die override and the neutral one.
pub fn sample_fortunes() -> Vec<Fortune> {
    vec![
        Fortune::none(),
        Fortune::new("Merlin Luck", 10, 5, 2, DiceType::None),
        Fortune::new("Curse of Horus", -5, 0, -2, DiceType::None),
        Fortune::new("Dragon Blade", 0, 0, 1, DiceType::D12),
    ]
}

/// Three monster archetypes of rising strength.
pub fn sample_monsters() -> Vec<Monster> {
    vec![
        Monster::new("Goblin", Stats::new(7, 11, 2, DiceType::D6)),
        Monster::new("Orc", Stats::new(15, 13, 3, DiceType::D8)),
        Monster::new("Ogre", Stats::new(30, 9, 4, DiceType::D12)),
    ]
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert a knight's current HP.
#[track_caller]
pub fn assert_hp(harness: &TestHarness, id: KnightId, expected: i32) {
    let actual = harness.knight_hp(id);
    assert_eq!(
        actual,
        Some(expected),
        "Expected knight {id} to have {expected} HP, got {actual:?}"
    );
}

/// Assert a knight's experience.
#[track_caller]
pub fn assert_xp(harness: &TestHarness, id: KnightId, expected: u32) {
    let actual = harness.knight_xp(id);
    assert_eq!(
        actual,
        Some(expected),
        "Expected knight {id} to have {expected} XP, got {actual:?}"
    );
}

/// Assert the active party, in order.
#[track_caller]
pub fn assert_party(harness: &TestHarness, expected: &[KnightId]) {
    assert_eq!(
        harness.roster.active_ids(),
        expected,
        "Unexpected active party"
    );
}

/// Assert every knight in the roster is healed and carries no fortune.
#[track_caller]
pub fn assert_roster_reset(harness: &TestHarness) {
    for knight in harness.roster.knights() {
        assert!(
            knight.fortune().is_neutral(),
            "Expected {} to carry no fortune, found {}",
            knight.name(),
            knight.fortune()
        );
        assert_eq!(
            knight.damage(),
            0,
            "Expected {} to be fully healed",
            knight.name()
        );
    }
}
