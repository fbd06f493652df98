//! Console command parsing and the interactive loop.
//!
//! Commands are line-oriented:
//! - `ls` or `list`, optionally followed by `all` or `active`
//! - `show <name or id>`
//! - `set active <name or id>`, `remove active <name or id>` (`rm` works too)
//! - `explore` (also `adventure`, `quest`)
//! - `save [file]`
//! - `help`, `exit`

use crate::view;
use knights_core::{
    BattleOutcome, Combatant, DiceRoller, GameSession, ListFilter, RosterError, SessionError,
};
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

/// One parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(ListFilter),
    Show(String),
    SetActive(String),
    RemoveActive(String),
    Explore,
    Save(Option<String>),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("No command given")]
    Empty,

    #[error("Invalid command.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Split off the first word; the remainder is trimmed.
fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

fn required(arg: &str, usage: &'static str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(arg.to_string())
    }
}

/// `active <arg>` after `set` or `remove`.
fn active_target(line: &str, rest: &str, usage: &'static str) -> Result<String, CommandError> {
    let (word, arg) = split_word(rest);
    if !word.eq_ignore_ascii_case("active") {
        return Err(CommandError::Unknown(line.to_string()));
    }
    required(arg, usage)
}

/// Parse a console line. Keywords are case-insensitive; arguments keep
/// their case.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }
    let (head, rest) = split_word(line);

    match head.to_lowercase().as_str() {
        "ls" | "list" => match rest.to_lowercase().as_str() {
            "" | "all" => Ok(Command::List(ListFilter::All)),
            "active" => Ok(Command::List(ListFilter::Active)),
            _ => Err(CommandError::Unknown(line.to_string())),
        },
        "show" => required(rest, "show <name or id>").map(Command::Show),
        "set" => active_target(line, rest, "set active <name or id>").map(Command::SetActive),
        "remove" | "rm" => {
            active_target(line, rest, "remove active <name or id>").map(Command::RemoveActive)
        }
        "explore" | "adventure" | "quest" => Ok(Command::Explore),
        "save" => Ok(Command::Save((!rest.is_empty()).then(|| rest.to_string()))),
        "help" | "?" => Ok(Command::Help),
        "exit" | "quit" | "bye" | "goodbye" => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(line.to_string())),
    }
}

/// Interactive console over any line reader and writer.
pub struct Console<R, W> {
    input: R,
    output: W,
    verbose: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            verbose: false,
        }
    }

    /// Also print attack rolls, XP gains and round summaries.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Read commands until `exit` or end of input.
    pub async fn run<D: DiceRoller>(&mut self, session: &mut GameSession<D>) -> io::Result<()> {
        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                writeln!(self.output)?;
                writeln!(self.output, "{}", view::FAREWELL)?;
                return Ok(());
            };

            let command = match parse(&line) {
                Ok(command) => command,
                Err(CommandError::Empty) => continue,
                Err(err @ CommandError::Unknown(_)) => {
                    tracing::debug!(input = %line.trim(), "unknown command");
                    writeln!(self.output, "{err}")?;
                    writeln!(self.output, "{}", view::HELP)?;
                    continue;
                }
                Err(err) => {
                    writeln!(self.output, "[ERROR] {err}")?;
                    continue;
                }
            };

            tracing::debug!(?command, "command");
            if command == Command::Quit {
                writeln!(self.output, "{}", view::FAREWELL)?;
                return Ok(());
            }
            self.execute(session, command).await?;
        }
    }

    async fn execute<D: DiceRoller>(
        &mut self,
        session: &mut GameSession<D>,
        command: Command,
    ) -> io::Result<()> {
        match command {
            Command::List(filter) => {
                writeln!(self.output, "{}", view::knight_list(&session.list(filter)))?;
            }
            Command::Show(query) => match session.find(&query) {
                Ok(knight) => writeln!(self.output, "{}", view::knight_card(knight))?,
                Err(err) => writeln!(self.output, "[ERROR] {err}")?,
            },
            Command::SetActive(query) => match session.activate(&query) {
                Ok(knight) => writeln!(self.output, "Activated {}.", knight.name())?,
                Err(SessionError::Roster(RosterError::PartyFull { .. })) => writeln!(
                    self.output,
                    "Unable to set active knight. Only four can be active at a time."
                )?,
                Err(err) => writeln!(self.output, "[ERROR] {err}")?,
            },
            Command::RemoveActive(query) => match session.deactivate(&query) {
                Ok(knight) => writeln!(self.output, "Deactivated {}.", knight.name())?,
                Err(err) => writeln!(self.output, "[ERROR] {err}")?,
            },
            Command::Explore => self.explore(session)?,
            Command::Save(path) => match session.save(path.as_deref().map(Path::new)).await {
                Ok(written) => writeln!(self.output, "Progress saved to {}", written.display())?,
                Err(err) => writeln!(self.output, "[ERROR] Save failed: {err}")?,
            },
            Command::Help => writeln!(self.output, "{}", view::HELP)?,
            Command::Quit => {}
        }
        Ok(())
    }

    /// Run an adventure, asking between won battles whether to go on.
    fn explore<D: DiceRoller>(&mut self, session: &mut GameSession<D>) -> io::Result<()> {
        let fortunes = match session.begin_adventure() {
            Ok(fortunes) => fortunes,
            Err(err) => {
                writeln!(self.output, "[ERROR] {err}")?;
                return Ok(());
            }
        };
        writeln!(self.output, "{}", view::fortunes_text(&fortunes))?;

        let result = self.fight(session);
        session.end_adventure();
        if let Some(last) = result? {
            writeln!(self.output, "{}", view::adventure_end(last))?;
        }
        Ok(())
    }

    /// Battles until the party falls, stalls or turns back. The caller
    /// clears the roster whatever happens here.
    fn fight<D: DiceRoller>(
        &mut self,
        session: &mut GameSession<D>,
    ) -> io::Result<Option<BattleOutcome>> {
        loop {
            let report = match session.next_battle() {
                Ok(report) => report,
                Err(err) => {
                    writeln!(self.output, "[ERROR] {err}")?;
                    return Ok(None);
                }
            };
            writeln!(self.output, "{}", view::battle_text(&report, self.verbose))?;

            if report.outcome != BattleOutcome::Won || !self.ask_continue()? {
                return Ok(Some(report.outcome));
            }
        }
    }

    /// The continue prompt. End of input counts as "no".
    fn ask_continue(&mut self) -> io::Result<bool> {
        loop {
            write!(self.output, "Would you like to continue on your quest (y/n)? ")?;
            self.output.flush()?;

            let Some(answer) = self.read_line()? else {
                writeln!(self.output)?;
                return Ok(false);
            };
            match answer.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Invalid response. Please try again.")?,
            }
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knights_core::testing::{sample_fortunes, sample_monsters};
    use knights_core::{DiceType, Roster, ScriptedDice, SessionConfig, Stats};
    use std::io::Cursor;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("ls"), Ok(Command::List(ListFilter::All)));
        assert_eq!(parse("  LIST all "), Ok(Command::List(ListFilter::All)));
        assert_eq!(parse("list active"), Ok(Command::List(ListFilter::Active)));
        assert_eq!(parse("show Sir Kay"), Ok(Command::Show("Sir Kay".to_string())));
        assert_eq!(parse("Set Active 3"), Ok(Command::SetActive("3".to_string())));
        assert_eq!(
            parse("remove active lance"),
            Ok(Command::RemoveActive("lance".to_string()))
        );
        assert_eq!(parse("ls active"), Ok(Command::List(ListFilter::Active)));
        assert_eq!(parse("rm active 2"), Ok(Command::RemoveActive("2".to_string())));
        assert_eq!(parse("quest"), Ok(Command::Explore));
        assert_eq!(parse("save"), Ok(Command::Save(None)));
        assert_eq!(
            parse("save backup.json"),
            Ok(Command::Save(Some("backup.json".to_string())))
        );
        assert_eq!(parse("goodbye"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("   "), Err(CommandError::Empty));
        assert_eq!(parse("dance"), Err(CommandError::Unknown("dance".to_string())));
        assert_eq!(parse("list benched"), Err(CommandError::Unknown("list benched".to_string())));
        assert_eq!(parse("set captain Kay"), Err(CommandError::Unknown("set captain Kay".to_string())));
        assert_eq!(parse("show"), Err(CommandError::Usage("show <name or id>")));
        assert_eq!(
            parse("set active"),
            Err(CommandError::Usage("set active <name or id>"))
        );
    }

    fn session() -> GameSession<ScriptedDice> {
        let mut roster = Roster::new();
        roster.set_fortunes(sample_fortunes());
        roster.set_monsters(sample_monsters());
        for name in ["Arthur", "Lancelot", "Gawain", "Percival", "Galahad"] {
            roster.add_knight(name, Stats::new(20, 5, 2, DiceType::D8), 0);
        }
        GameSession::with_dice(roster, ScriptedDice::new(), &SessionConfig::new())
    }

    async fn run_script(session: &mut GameSession<ScriptedDice>, script: &str) -> String {
        let mut console = Console::new(Cursor::new(script.to_string()), Vec::new());
        console.run(session).await.unwrap();
        String::from_utf8(console.into_output()).unwrap()
    }

    #[tokio::test]
    async fn test_party_commands() {
        let mut session = session();
        let out = run_script(
            &mut session,
            "set active 1\nset active 2\nset active 3\nset active 4\nset active Galahad\nremove active 2\nlist active\nexit\n",
        )
        .await;

        assert!(out.contains("Activated Arthur."));
        assert!(out.contains("Unable to set active knight. Only four can be active at a time."));
        assert!(out.contains("Deactivated Lancelot."));
        assert!(out.contains("1: Arthur\n3: Gawain\n4: Percival"));
        assert!(out.ends_with("Enjoy your rest! Until another adventure.\n"));
        assert_eq!(session.roster().active_len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_command_shows_help() {
        let mut session = session();
        let out = run_script(&mut session, "dance\n").await;
        assert!(out.contains("Invalid command.\nUnsure what to do"));
        // End of input leaves politely.
        assert!(out.ends_with("Until another adventure.\n"));
    }

    #[tokio::test]
    async fn test_explore_without_party() {
        let mut session = session();
        let out = run_script(&mut session, "explore\nexit\n").await;
        assert!(out.contains("[ERROR] No knights in the active party"));
    }

    #[tokio::test]
    async fn test_explore_reprompts_then_stops() {
        let mut session = session();
        // Scripted dice with nothing queued draw an empty encounter, which
        // is an immediate win.
        let out = run_script(&mut session, "set active Arthur\nexplore\nmaybe\nn\nexit\n").await;

        assert!(out.contains("For this quest, our knights drew the following fortunes!"));
        assert!(out.contains("Invalid response. Please try again."));
        assert_eq!(
            out.matches("Would you like to continue on your quest (y/n)? ").count(),
            2
        );
        assert!(out.contains("The party returns home to rest."));
        assert!(session.find("Arthur").unwrap().fortune().is_neutral());
    }
}
