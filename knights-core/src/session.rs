//! GameSession - the primary public API for running the simulator.
//!
//! This module wraps the roster, the combat engine and persistence into a
//! single object exposing the operations a command layer needs: listing,
//! lookup, party changes, adventures and saving.

use crate::combat::{
    AdventureReport, BattleReport, CombatEngine, CombatError, CombatEvent, EngineConfig,
    FortunePolicy, Phase,
};
use crate::combatant::Knight;
use crate::dice::{Dice, DiceRoller};
use crate::persist::{self, GameData, PersistError, SavedRoster};
use crate::roster::{Roster, RosterError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default game-data folder, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default knight save file, relative to the working directory.
pub const DEFAULT_SAVE_FILE: &str = "data/knights.csv";

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Combat(#[from] CombatError),
}

/// Configuration for creating a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Folder holding `fortunes.csv` and `monsters.csv`.
    pub data_dir: Option<PathBuf>,

    /// Optional tagged catalog file, merged after the data folder.
    pub catalog_file: Option<PathBuf>,

    /// Knight save file. A `.json` extension selects the JSON snapshot.
    pub save_path: PathBuf,

    /// Combat engine settings.
    pub engine: EngineConfig,

    /// Dice seed; entropy when unset.
    pub seed: Option<u64>,
}

impl SessionConfig {
    /// Create a config pointing at the default data folder and save file.
    pub fn new() -> Self {
        Self {
            data_dir: Some(PathBuf::from(DEFAULT_DATA_DIR)),
            catalog_file: None,
            save_path: PathBuf::from(DEFAULT_SAVE_FILE),
            engine: EngineConfig::default(),
            seed: None,
        }
    }

    /// Set the game-data folder.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Load catalogs from a tagged catalog file as well.
    pub fn with_catalog_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_file = Some(path.into());
        self
    }

    /// Set the knight save file.
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    pub fn with_fortune_policy(mut self, policy: FortunePolicy) -> Self {
        self.engine.fortune_policy = policy;
        self
    }

    /// Seed the dice for a reproducible session.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the stalemate limit, at least 1.
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.engine = self.engine.with_max_rounds(rounds);
        self
    }

    fn dice(&self) -> Dice {
        match self.seed {
            Some(seed) => Dice::seeded(seed),
            None => Dice::from_entropy(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Which knights to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    All,
    Active,
}

/// A simulator session.
///
/// Owns the roster and the engine; all state changes go through here.
pub struct GameSession<D = Dice> {
    roster: Roster,
    engine: CombatEngine<D>,
    save_path: PathBuf,
}

impl GameSession<Dice> {
    /// Load catalogs and knights as described by the config.
    ///
    /// Missing catalogs and a missing save file are logged and start empty;
    /// malformed data is an error.
    pub async fn load(config: SessionConfig) -> Result<Self, SessionError> {
        let data = load_game_data(&config).await?;
        let roster = load_roster(&config.save_path, data).await?;
        tracing::info!(
            knights = roster.knights().len(),
            fortunes = roster.fortunes().len(),
            monsters = roster.monsters().len(),
            "session loaded"
        );
        let dice = config.dice();
        Ok(Self::with_dice(roster, dice, &config))
    }
}

impl<D: DiceRoller> GameSession<D> {
    /// Create a session around an existing roster and dice.
    pub fn with_dice(roster: Roster, dice: D, config: &SessionConfig) -> Self {
        Self {
            roster,
            engine: CombatEngine::with_config(dice, config.engine),
            save_path: config.save_path.clone(),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Direct roster access. Changes here bypass party rules.
    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn engine(&self) -> &CombatEngine<D> {
        &self.engine
    }

    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Knights in roster order, or the active party in party order.
    pub fn list(&self, filter: ListFilter) -> Vec<&Knight> {
        match filter {
            ListFilter::All => self.roster.knights().iter().collect(),
            ListFilter::Active => self.roster.active_knights().collect(),
        }
    }

    /// Look up a knight by name or numeric ID.
    pub fn find(&self, query: &str) -> Result<&Knight, SessionError> {
        Ok(self.roster.find_knight(query)?)
    }

    /// Add a knight to the active party. Only allowed between adventures.
    pub fn activate(&mut self, query: &str) -> Result<&Knight, SessionError> {
        self.ensure_idle("change the party")?;
        let id = self.roster.find_knight(query)?.id();
        Ok(self.roster.activate(id)?)
    }

    /// Remove a knight from the active party. Active knights are matched
    /// first, so a partial name picks a party member over a benched one.
    pub fn deactivate(&mut self, query: &str) -> Result<&Knight, SessionError> {
        self.ensure_idle("change the party")?;
        let id = match self.roster.find_active(query) {
            Ok(knight) => knight.id(),
            Err(_) => self.roster.find_knight(query)?.id(),
        };
        Ok(self.roster.deactivate(id)?)
    }

    /// Run an adventure with the active party.
    ///
    /// `keep_exploring` sees each won battle and decides whether to go on.
    pub fn adventure<F>(&mut self, keep_exploring: F) -> Result<AdventureReport, SessionError>
    where
        F: FnMut(&BattleReport) -> bool,
    {
        Ok(self.engine.run_adventure(&mut self.roster, keep_exploring)?)
    }

    /// Start an adventure one step at a time. Pair with [`next_battle`] and
    /// [`end_adventure`] when the caller needs to act between battles.
    ///
    /// [`next_battle`]: GameSession::next_battle
    /// [`end_adventure`]: GameSession::end_adventure
    pub fn begin_adventure(&mut self) -> Result<Vec<CombatEvent>, SessionError> {
        Ok(self.engine.initialize(&mut self.roster)?)
    }

    pub fn next_battle(&mut self) -> Result<BattleReport, SessionError> {
        Ok(self.engine.battle(&mut self.roster)?)
    }

    /// Strip fortunes and heal everyone.
    pub fn end_adventure(&mut self) {
        self.engine.clear(&mut self.roster);
    }

    fn ensure_idle(&self, action: &'static str) -> Result<(), CombatError> {
        match self.engine.phase() {
            Phase::Idle => Ok(()),
            phase => Err(CombatError::InvalidPhase { action, phase }),
        }
    }

    /// Save the knights to `path`, or to the configured save file.
    ///
    /// Returns the path written.
    pub async fn save(&self, path: Option<&Path>) -> Result<PathBuf, SessionError> {
        let path = path.unwrap_or(self.save_path.as_path()).to_path_buf();
        if persist::is_json_path(&path) {
            SavedRoster::new(&self.roster).save_json(&path).await?;
        } else {
            persist::save_knights(&path, self.roster.knights()).await?;
        }
        tracing::info!(path = %path.display(), knights = self.roster.knights().len(), "roster saved");
        Ok(path)
    }
}

async fn load_game_data(config: &SessionConfig) -> Result<GameData, SessionError> {
    let mut data = match &config.data_dir {
        Some(dir) => persist::load_game_folder(dir).await?,
        None => GameData::default(),
    };
    if let Some(path) = &config.catalog_file {
        let extra = persist::load_tagged_catalog(path).await?;
        data.fortunes.extend(extra.fortunes);
        data.monsters.extend(extra.monsters);
    }
    Ok(data)
}

async fn load_roster(path: &Path, data: GameData) -> Result<Roster, SessionError> {
    if persist::is_json_path(path) {
        match SavedRoster::load_json(path).await {
            Ok(saved) => return Ok(saved.into_roster(data)?),
            Err(err) if is_missing(&err) => {}
            Err(err) => return Err(err.into()),
        }
    } else {
        match persist::load_knights(path).await {
            Ok(knights) => return Ok(Roster::from_parts(knights, data.fortunes, data.monsters)?),
            Err(err) if is_missing(&err) => {}
            Err(err) => return Err(err.into()),
        }
    }

    tracing::warn!(path = %path.display(), "no save file; starting with an empty roster");
    Ok(Roster::from_parts(Vec::new(), data.fortunes, data.monsters)?)
}

fn is_missing(err: &PersistError) -> bool {
    matches!(err, PersistError::Io(io) if io.kind() == ErrorKind::NotFound)
}
