//! The knight roster, the active party and the two catalogs.

use crate::combatant::{Combatant, Knight, KnightId, Monster};
use crate::dice::DiceRoller;
use crate::stats::{Fortune, Stats};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Most knights that can be in the active party at once.
pub const MAX_ACTIVE: usize = 4;

/// Which catalog a draw came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogKind {
    Fortunes,
    Monsters,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKind::Fortunes => f.write_str("fortune"),
            CatalogKind::Monsters => f.write_str("monster"),
        }
    }
}

/// Errors from roster operations. None of these mutate the roster.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("Knight `{0}` not found")]
    NotFound(String),

    #[error("The active party is full ({max} knights)")]
    PartyFull { max: usize },

    #[error("{0} is already in the active party")]
    AlreadyActive(String),

    #[error("{0} is not in the active party")]
    NotActive(String),

    #[error("A knight with id {0} already exists")]
    DuplicateId(KnightId),

    #[error("The {0} catalog is empty")]
    EmptyCatalog(CatalogKind),
}

/// Knights, the active party (by ID, in activation order) and the catalogs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    knights: Vec<Knight>,
    active: Vec<KnightId>,
    fortunes: Vec<Fortune>,
    monsters: Vec<Monster>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from loaded data. Knight IDs must be unique.
    pub fn from_parts(
        knights: Vec<Knight>,
        fortunes: Vec<Fortune>,
        monsters: Vec<Monster>,
    ) -> Result<Self, RosterError> {
        let mut roster = Self {
            knights: Vec::with_capacity(knights.len()),
            active: Vec::new(),
            fortunes,
            monsters,
        };
        for knight in knights {
            roster.insert_knight(knight)?;
        }
        Ok(roster)
    }

    // ------------------------------------------------------------------
    // Knights
    // ------------------------------------------------------------------

    /// Append a knight under the next free ID (one past the highest).
    pub fn add_knight(&mut self, name: impl Into<String>, stats: Stats, xp: u32) -> KnightId {
        let id = self.next_id();
        self.knights.push(Knight::new(id, name, stats, xp));
        id
    }

    /// Append an already-identified knight.
    pub fn insert_knight(&mut self, knight: Knight) -> Result<(), RosterError> {
        if self.knight(knight.id()).is_some() {
            return Err(RosterError::DuplicateId(knight.id()));
        }
        self.knights.push(knight);
        Ok(())
    }

    /// Replace the knight list, renumbering from 1 in the given order.
    /// The active party is emptied.
    pub fn replace_knights(&mut self, knights: Vec<Knight>) {
        self.active.clear();
        self.knights = knights;
        for (index, knight) in self.knights.iter_mut().enumerate() {
            knight.reassign_id(KnightId(index as u32 + 1));
        }
    }

    fn next_id(&self) -> KnightId {
        let highest = self.knights.iter().map(|k| k.id().0).max().unwrap_or(0);
        KnightId(highest + 1)
    }

    pub fn knights(&self) -> &[Knight] {
        &self.knights
    }

    pub fn knight(&self, id: KnightId) -> Option<&Knight> {
        self.knights.iter().find(|k| k.id() == id)
    }

    pub fn knight_mut(&mut self, id: KnightId) -> Option<&mut Knight> {
        self.knights.iter_mut().find(|k| k.id() == id)
    }

    /// Find a knight anywhere in the roster.
    ///
    /// A query of plain ASCII digits matches by ID only. Otherwise the
    /// trimmed query is compared case-insensitively: an exact name wins,
    /// else the first knight (roster order) whose name contains it.
    pub fn find_knight(&self, query: &str) -> Result<&Knight, RosterError> {
        find_in(self.knights.iter(), query)
    }

    /// Same matching rules as [`Roster::find_knight`], restricted to the
    /// active party.
    pub fn find_active(&self, query: &str) -> Result<&Knight, RosterError> {
        find_in(self.active_knights(), query)
    }

    // ------------------------------------------------------------------
    // Active party
    // ------------------------------------------------------------------

    pub fn active_ids(&self) -> &[KnightId] {
        &self.active
    }

    /// Active knights in party order.
    pub fn active_knights(&self) -> impl Iterator<Item = &Knight> + '_ {
        self.active.iter().filter_map(|id| self.knight(*id))
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: KnightId) -> bool {
        self.active.contains(&id)
    }

    /// Add a knight to the active party. Fails without change when the knight
    /// is unknown, already active, or the party already has [`MAX_ACTIVE`].
    pub fn activate(&mut self, id: KnightId) -> Result<&Knight, RosterError> {
        let name = match self.knight(id) {
            Some(knight) => knight.name().to_string(),
            None => return Err(RosterError::NotFound(id.to_string())),
        };
        if self.is_active(id) {
            return Err(RosterError::AlreadyActive(name));
        }
        if self.active.len() >= MAX_ACTIVE {
            return Err(RosterError::PartyFull { max: MAX_ACTIVE });
        }

        self.active.push(id);
        tracing::debug!(knight = %name, %id, "knight joined the active party");
        self.knight(id).ok_or(RosterError::NotFound(id.to_string()))
    }

    /// Remove a knight from the active party and heal it.
    pub fn deactivate(&mut self, id: KnightId) -> Result<&Knight, RosterError> {
        let Some(position) = self.active.iter().position(|a| *a == id) else {
            return Err(match self.knight(id) {
                Some(knight) => RosterError::NotActive(knight.name().to_string()),
                None => RosterError::NotFound(id.to_string()),
            });
        };
        self.active.remove(position);

        let knight = self
            .knight_mut(id)
            .ok_or(RosterError::NotFound(id.to_string()))?;
        knight.reset_damage();
        tracing::debug!(knight = %knight.name(), %id, "knight left the active party");
        Ok(&*knight)
    }

    // ------------------------------------------------------------------
    // Catalogs
    // ------------------------------------------------------------------

    pub fn fortunes(&self) -> &[Fortune] {
        &self.fortunes
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    pub fn set_fortunes(&mut self, fortunes: Vec<Fortune>) {
        self.fortunes = fortunes;
    }

    pub fn set_monsters(&mut self, monsters: Vec<Monster>) {
        self.monsters = monsters;
    }

    pub fn add_fortune(&mut self, fortune: Fortune) {
        self.fortunes.push(fortune);
    }

    pub fn add_monster(&mut self, monster: Monster) {
        self.monsters.push(monster);
    }

    /// Uniformly chosen fortune from the catalog.
    pub fn random_fortune(&self, dice: &mut impl DiceRoller) -> Result<Fortune, RosterError> {
        if self.fortunes.is_empty() {
            return Err(RosterError::EmptyCatalog(CatalogKind::Fortunes));
        }
        Ok(self.fortunes[dice.pick(self.fortunes.len())].clone())
    }

    /// Independent copy of a uniformly chosen monster archetype.
    pub fn random_monster(&self, dice: &mut impl DiceRoller) -> Result<Monster, RosterError> {
        if self.monsters.is_empty() {
            return Err(RosterError::EmptyCatalog(CatalogKind::Monsters));
        }
        Ok(self.monsters[dice.pick(self.monsters.len())].copy())
    }

    /// Draw an encounter of uniformly random size in `[0, party_size]`,
    /// sampling archetypes with replacement.
    pub fn draw_encounter(
        &self,
        dice: &mut impl DiceRoller,
        party_size: usize,
    ) -> Result<Vec<Monster>, RosterError> {
        let size = dice.pick(party_size + 1);
        self.draw_monsters(dice, size)
    }

    /// Draw exactly `count` monsters.
    pub fn draw_monsters(
        &self,
        dice: &mut impl DiceRoller,
        count: usize,
    ) -> Result<Vec<Monster>, RosterError> {
        (0..count).map(|_| self.random_monster(dice)).collect()
    }

    /// End-of-adventure reset: every knight, active or not, loses its
    /// fortune and is healed.
    pub fn reset_knights(&mut self) {
        for knight in &mut self.knights {
            knight.clear_fortune();
            knight.reset_damage();
        }
    }
}

fn find_in<'a>(
    knights: impl Iterator<Item = &'a Knight>,
    query: &str,
) -> Result<&'a Knight, RosterError> {
    let query = query.trim();
    // Only plain digits are IDs; "+2" or "-2" are searched as names.
    if !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit()) {
        let id = query.parse::<u32>().ok().map(KnightId);
        return knights
            .into_iter()
            .find(|k| Some(k.id()) == id)
            .ok_or_else(|| RosterError::NotFound(query.to_string()));
    }

    let needle = query.to_lowercase();
    let mut partial = None;
    if !needle.is_empty() {
        for knight in knights {
            let name = knight.name().to_lowercase();
            if name == needle {
                return Ok(knight);
            }
            if partial.is_none() && name.contains(&needle) {
                partial = Some(knight);
            }
        }
    }
    partial.ok_or_else(|| RosterError::NotFound(query.to_string()))
}
