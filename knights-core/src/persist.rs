//! Roster persistence for save/load functionality.
//!
//! Two formats are supported:
//! - flat comma-delimited records, used for knight saves and game data
//! - a versioned JSON snapshot of the roster
//!
//! Record layouts (fields are trimmed, blank lines skipped):
//!
//! ```text
//! knight:  name,maxHP,armor,accuracy,die,xp
//! monster: name,maxHP,armor,accuracy,die
//! fortune: name,hp,armor,accuracy,die
//! tagged:  MOB,<monster record> | FORTUNE,<fortune record>
//! ```
//!
//! Dice tokens are `D4`..`D20`, or `-` for no die.

use crate::combatant::{Combatant, Knight, KnightId, Monster};
use crate::dice::{DiceError, DiceType};
use crate::roster::{Roster, RosterError};
use crate::stats::{Attributes, Fortune, Stats};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Fortune catalog file name inside a game-data folder.
pub const FORTUNES_FILE: &str = "fortunes.csv";

/// Monster catalog file name inside a game-data folder.
pub const MONSTERS_FILE: &str = "monsters.csv";

/// Current JSON snapshot version.
const SAVE_VERSION: u32 = 1;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Invalid roster: {0}")]
    Roster(#[from] RosterError),
}

/// What is wrong with a single record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: &'static str, found: usize },

    #[error("{field} is not an integer: {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("name is empty")]
    EmptyName,

    #[error(transparent)]
    Dice(#[from] DiceError),
}

// ============================================================================
// Records
// ============================================================================

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn int_field(field: &'static str, value: &str) -> Result<i32, RecordError> {
    value.parse().map_err(|_| RecordError::NotANumber {
        field,
        value: value.to_string(),
    })
}

fn name_field(value: &str) -> Result<&str, RecordError> {
    if value.is_empty() {
        Err(RecordError::EmptyName)
    } else {
        Ok(value)
    }
}

/// Parse `maxHP,armor,accuracy,die` starting at `fields[1]`.
fn stats_fields(fields: &[&str]) -> Result<Stats, RecordError> {
    Ok(Stats::new(
        int_field("max HP", fields[1])?,
        int_field("armor", fields[2])?,
        int_field("accuracy", fields[3])?,
        fields[4].parse::<DiceType>()?,
    ))
}

/// Parse a monster record.
pub fn parse_monster(line: &str) -> Result<Monster, RecordError> {
    let fields = split_fields(line);
    if fields.len() != 5 {
        return Err(RecordError::FieldCount {
            expected: "5",
            found: fields.len(),
        });
    }
    Ok(Monster::new(name_field(fields[0])?, stats_fields(&fields)?))
}

/// Parse a fortune record.
///
/// Older data files carry a damage modifier column before the die
/// (`name,hp,armor,accuracy,damage,die`). It has no effect and is dropped.
pub fn parse_fortune(line: &str) -> Result<Fortune, RecordError> {
    let mut fields = split_fields(line);
    match fields.len() {
        5 => {}
        6 => {
            int_field("damage", fields[4])?;
            fields.remove(4);
        }
        found => {
            return Err(RecordError::FieldCount {
                expected: "5 or 6",
                found,
            })
        }
    }

    Ok(Fortune::new(
        name_field(fields[0])?,
        int_field("hp", fields[1])?,
        int_field("armor", fields[2])?,
        int_field("accuracy", fields[3])?,
        fields[4].parse::<DiceType>()?,
    ))
}

/// Parse a knight record under the given roster ID.
pub fn parse_knight(id: KnightId, line: &str) -> Result<Knight, RecordError> {
    let fields = split_fields(line);
    if fields.len() != 6 {
        return Err(RecordError::FieldCount {
            expected: "6",
            found: fields.len(),
        });
    }

    let xp = fields[5].parse::<u32>().map_err(|_| RecordError::NotANumber {
        field: "xp",
        value: fields[5].to_string(),
    })?;
    Ok(Knight::new(id, name_field(fields[0])?, stats_fields(&fields)?, xp))
}

fn stats_record(name: &str, stats: Stats) -> String {
    format!(
        "{},{},{},{},{}",
        name, stats.max_hp, stats.armor, stats.accuracy, stats.damage_die
    )
}

/// Knight record with base stats, never the fortune-adjusted ones.
pub fn knight_record(knight: &Knight) -> String {
    format!("{},{}", stats_record(knight.name(), knight.base_stats()), knight.xp())
}

pub fn monster_record(monster: &Monster) -> String {
    stats_record(monster.name(), monster.base_stats())
}

pub fn fortune_record(fortune: &Fortune) -> String {
    stats_record(fortune.name(), fortune.stats())
}

/// Non-blank lines with their 1-based line numbers.
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn at_line<T>(line: usize, result: Result<T, RecordError>) -> Result<T, PersistError> {
    result.map_err(|source| PersistError::Record { line, source })
}

/// Parse a knight save. IDs are assigned from 1 in file order.
pub fn parse_knights(content: &str) -> Result<Vec<Knight>, PersistError> {
    records(content)
        .enumerate()
        .map(|(index, (line, record))| {
            at_line(line, parse_knight(KnightId(index as u32 + 1), record))
        })
        .collect()
}

pub fn parse_monsters(content: &str) -> Result<Vec<Monster>, PersistError> {
    records(content)
        .map(|(line, record)| at_line(line, parse_monster(record)))
        .collect()
}

pub fn parse_fortunes(content: &str) -> Result<Vec<Fortune>, PersistError> {
    records(content)
        .map(|(line, record)| at_line(line, parse_fortune(record)))
        .collect()
}

/// Both catalogs, as loaded from game data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameData {
    pub fortunes: Vec<Fortune>,
    pub monsters: Vec<Monster>,
}

/// Parse a tagged catalog where each line starts with `MOB` or `FORTUNE`.
/// Lines with any other tag are logged and skipped.
pub fn parse_tagged_catalog(content: &str) -> Result<GameData, PersistError> {
    let mut data = GameData::default();
    for (line, record) in records(content) {
        let (tag, rest) = record.split_once(',').unwrap_or((record, ""));
        match tag.trim().to_ascii_uppercase().as_str() {
            "MOB" => data.monsters.push(at_line(line, parse_monster(rest))?),
            "FORTUNE" => data.fortunes.push(at_line(line, parse_fortune(rest))?),
            other => tracing::warn!(line, tag = other, "skipping catalog line with unknown tag"),
        }
    }
    Ok(data)
}

/// Render knights as a save file, one record per line.
pub fn format_knights(knights: &[Knight]) -> String {
    let mut out = String::new();
    for knight in knights {
        out.push_str(&knight_record(knight));
        out.push('\n');
    }
    out
}

// ============================================================================
// Files
// ============================================================================

/// Load a knight save file.
pub async fn load_knights(path: impl AsRef<Path>) -> Result<Vec<Knight>, PersistError> {
    let content = fs::read_to_string(path).await?;
    parse_knights(&content)
}

/// Save knights as records. The output loads back through [`load_knights`].
pub async fn save_knights(path: impl AsRef<Path>, knights: &[Knight]) -> Result<(), PersistError> {
    fs::write(path, format_knights(knights)).await?;
    Ok(())
}

/// Read a catalog file, treating an unreadable file as empty.
async fn read_catalog(path: &Path) -> Option<String> {
    match fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "catalog unavailable; leaving it empty");
            None
        }
    }
}

/// Load a fortune catalog. A missing or unreadable file yields an empty catalog.
pub async fn load_fortunes(path: impl AsRef<Path>) -> Result<Vec<Fortune>, PersistError> {
    match read_catalog(path.as_ref()).await {
        Some(content) => parse_fortunes(&content),
        None => Ok(Vec::new()),
    }
}

/// Load a monster catalog. A missing or unreadable file yields an empty catalog.
pub async fn load_monsters(path: impl AsRef<Path>) -> Result<Vec<Monster>, PersistError> {
    match read_catalog(path.as_ref()).await {
        Some(content) => parse_monsters(&content),
        None => Ok(Vec::new()),
    }
}

/// Load [`FORTUNES_FILE`] and [`MONSTERS_FILE`] from a game-data folder.
pub async fn load_game_folder(dir: impl AsRef<Path>) -> Result<GameData, PersistError> {
    let dir = dir.as_ref();
    let fortunes = load_fortunes(dir.join(FORTUNES_FILE)).await?;
    let monsters = load_monsters(dir.join(MONSTERS_FILE)).await?;
    tracing::debug!(
        dir = %dir.display(),
        fortunes = fortunes.len(),
        monsters = monsters.len(),
        "game data loaded"
    );
    Ok(GameData { fortunes, monsters })
}

/// Load a tagged catalog file. A missing or unreadable file yields empty catalogs.
pub async fn load_tagged_catalog(path: impl AsRef<Path>) -> Result<GameData, PersistError> {
    match read_catalog(path.as_ref()).await {
        Some(content) => parse_tagged_catalog(&content),
        None => Ok(GameData::default()),
    }
}

// ============================================================================
// JSON snapshot
// ============================================================================

/// A saved roster: every knight plus the active party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRoster {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created.
    pub saved_at: String,

    pub knights: Vec<Knight>,

    #[serde(default)]
    pub active: Vec<KnightId>,
}

impl SavedRoster {
    /// Snapshot a roster's knights. Catalogs are game data and are not saved.
    pub fn new(roster: &Roster) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: unix_timestamp(),
            knights: roster.knights().to_vec(),
            active: roster.active_ids().to_vec(),
        }
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }

    /// Rebuild a roster around the given catalogs. Active entries that no
    /// longer fit are logged and dropped.
    pub fn into_roster(self, data: GameData) -> Result<Roster, PersistError> {
        let mut roster = Roster::from_parts(self.knights, data.fortunes, data.monsters)?;
        for id in self.active {
            if let Err(err) = roster.activate(id) {
                tracing::warn!(%id, error = %err, "dropping saved party member");
            }
        }
        Ok(roster)
    }
}

/// Whether a path names a JSON snapshot rather than a record file.
pub fn is_json_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Current time as seconds since the Unix epoch.
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", now.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_monster() {
        let mob = parse_monster(" Orc , 15, 13 ,3, D8").unwrap();
        assert_eq!(mob.name(), "Orc");
        assert_eq!(mob.base_stats(), Stats::new(15, 13, 3, DiceType::D8));
        assert_eq!(mob.damage(), 0);
    }

    #[test]
    fn test_parse_fortune_both_layouts() {
        let short = parse_fortune("Merlin Luck,10,5,2,-").unwrap();
        let legacy = parse_fortune("Merlin Luck,10,5,2,0,-").unwrap();
        assert_eq!(short, legacy);
        assert_eq!(short.stats(), Stats::new(10, 5, 2, DiceType::None));
    }

    #[test]
    fn test_parse_knight() {
        let knight = parse_knight(KnightId(3), "Sir Bors,22,6,1,D10,14").unwrap();
        assert_eq!(knight.id(), KnightId(3));
        assert_eq!(knight.name(), "Sir Bors");
        assert_eq!(knight.base_stats(), Stats::new(22, 6, 1, DiceType::D10));
        assert_eq!(knight.xp(), 14);
    }

    #[test]
    fn test_record_errors() {
        assert_eq!(
            parse_monster("Orc,15,13,3"),
            Err(RecordError::FieldCount {
                expected: "5",
                found: 4
            })
        );
        assert!(matches!(
            parse_monster("Orc,lots,13,3,D8"),
            Err(RecordError::NotANumber { field: "max HP", .. })
        ));
        assert!(matches!(
            parse_monster("Orc,15,13,3,D7"),
            Err(RecordError::Dice(_))
        ));
        assert_eq!(parse_monster(",15,13,3,D8"), Err(RecordError::EmptyName));
        assert!(matches!(
            parse_knight(KnightId(1), "A,1,1,1,D4,-2"),
            Err(RecordError::NotANumber { field: "xp", .. })
        ));
    }

    #[test]
    fn test_knight_ids_follow_file_order() {
        let content = "\nArthur,30,8,3,D12,5\n\n  \nGawain,25,7,2,D8,0\n";
        let knights = parse_knights(content).unwrap();
        let ids: Vec<_> = knights.iter().map(|k| k.id()).collect();
        assert_eq!(ids, vec![KnightId(1), KnightId(2)]);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let content = "Arthur,30,8,3,D12,5\n\nGawain,25,7\n";
        match parse_knights(content) {
            Err(PersistError::Record { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected a record error, got {other:?}"),
        }
    }

    #[test]
    fn test_knight_record_uses_base_stats() {
        let mut knight = Knight::new(KnightId(1), "Kay", Stats::new(20, 5, 1, DiceType::D6), 9);
        knight.set_fortune(Fortune::new("Luck", 10, 10, 10, DiceType::D20));
        knight.add_damage(4);
        assert_eq!(knight_record(&knight), "Kay,20,5,1,D6,9");
    }

    #[test]
    fn test_catalog_records_round_trip() {
        let fortune = Fortune::new("Curse of Horus", -5, 0, -2, DiceType::None);
        assert_eq!(fortune_record(&fortune), "Curse of Horus,-5,0,-2,-");
        assert_eq!(parse_fortune(&fortune_record(&fortune)), Ok(fortune));

        let mob = Monster::new("Ogre", Stats::new(30, 9, 4, DiceType::D12));
        assert_eq!(parse_monster(&monster_record(&mob)), Ok(mob));
    }

    #[test]
    fn test_tagged_catalog() {
        let content = "MOB,Goblin,7,11,2,D6\nFORTUNE,Luck,1,1,1,-\nDRAGON,nope\nmob,Orc,15,13,3,D8\n";
        let data = parse_tagged_catalog(content).unwrap();
        assert_eq!(data.monsters.len(), 2);
        assert_eq!(data.fortunes.len(), 1);
        assert_eq!(data.monsters[1].name(), "Orc");
    }

    #[test]
    fn test_json_path_detection() {
        assert!(is_json_path(Path::new("roster.json")));
        assert!(is_json_path(Path::new("ROSTER.JSON")));
        assert!(!is_json_path(Path::new("knights.csv")));
        assert!(!is_json_path(Path::new("knights")));
    }

    #[tokio::test]
    async fn test_missing_catalog_is_empty() {
        let dir = TempDir::new().unwrap();
        let data = load_game_folder(dir.path()).await.unwrap();
        assert_eq!(data, GameData::default());
    }

    #[tokio::test]
    async fn test_save_and_load_knights() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("knights.csv");
        let knights = vec![
            Knight::new(KnightId(4), "Arthur", Stats::new(30, 8, 3, DiceType::D12), 5),
            Knight::new(KnightId(9), "Gawain", Stats::new(25, 7, 2, DiceType::None), 0),
        ];

        save_knights(&path, &knights).await.unwrap();
        let loaded = load_knights(&path).await.unwrap();

        assert_eq!(loaded.len(), 2);
        for (index, (before, after)) in knights.iter().zip(&loaded).enumerate() {
            assert_eq!(after.id(), KnightId(index as u32 + 1));
            assert_eq!(after.name(), before.name());
            assert_eq!(after.base_stats(), before.base_stats());
            assert_eq!(after.xp(), before.xp());
        }
    }

    #[tokio::test]
    async fn test_json_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roster.json");

        let mut saved = SavedRoster::new(&Roster::new());
        saved.version = SAVE_VERSION + 1;
        saved.save_json(&path).await.unwrap();

        assert!(matches!(
            SavedRoster::load_json(&path).await,
            Err(PersistError::VersionMismatch { .. })
        ));
    }
}
