//! Turn-based party combat engine.
//!
//! This crate provides:
//! - Dice with an injectable randomness source
//! - Knights, monsters and the fortunes that temporarily alter knights
//! - A roster with an active party and random encounter generation
//! - A battle state machine with batch removal and experience rewards
//! - Record and JSON persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use knights_core::{GameSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new().with_data_dir("data").with_seed(42);
//!     let mut session = GameSession::load(config).await?;
//!
//!     session.activate("Arthur")?;
//!     let report = session.adventure(|_| false)?;
//!     println!("{:?}", report.outcome);
//!
//!     session.save(None).await?;
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod combatant;
pub mod dice;
pub mod persist;
pub mod roster;
pub mod session;
pub mod stats;
pub mod testing;

// Primary public API
pub use combat::{
    AdventureOutcome, AdventureReport, BattleOutcome, BattleReport, CombatEngine, CombatError,
    CombatEvent, EngineConfig, FortunePolicy, Phase, XP_PER_DEFEAT,
};
pub use combatant::{Combatant, Knight, KnightId, Monster};
pub use dice::{Dice, DiceError, DiceRoller, DiceType};
pub use persist::{PersistError, SavedRoster};
pub use roster::{Roster, RosterError, MAX_ACTIVE};
pub use session::{GameSession, ListFilter, SessionConfig, SessionError};
pub use stats::{Attributes, Fortune, Stats};
pub use testing::{ScriptedDice, TestHarness};
