//! Knights of Legend console.
//!
//! Loads game data and the knight save file, then reads commands from
//! standard input:
//!
//! ```bash
//! cargo run -p knights -- --data data --seed 42
//! echo "ls" | cargo run -p knights -- saves/tuesday.csv
//! ```

mod commands;
mod view;

use commands::Console;
use knights_core::{FortunePolicy, GameSession, SessionConfig};
use std::io;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "knights=info,knights_core=warn";

/// Options gathered from the environment and the command line.
#[derive(Debug)]
struct CliOptions {
    session: SessionConfig,
    verbose: bool,
    help: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with the game text.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_config_from_args(&args);
    if options.help {
        print_help();
        return Ok(());
    }

    println!("{}", view::SPLASH);
    tracing::debug!(config = ?options.session, "starting session");
    let mut session = GameSession::load(options.session).await?;

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout()).with_verbose(options.verbose);
    console.run(&mut session).await?;
    Ok(())
}

/// Build the session config: defaults, then `KNIGHTS_*` variables, then
/// arguments. A bare argument names the save file.
fn parse_config_from_args(args: &[String]) -> CliOptions {
    let mut session = SessionConfig::new();
    if let Ok(dir) = std::env::var("KNIGHTS_DATA") {
        session = session.with_data_dir(dir);
    }
    if let Ok(path) = std::env::var("KNIGHTS_SAVE") {
        session = session.with_save_path(path);
    }
    if let Some(seed) = std::env::var("KNIGHTS_SEED").ok().and_then(|s| s.parse().ok()) {
        session = session.with_seed(seed);
    }

    let mut verbose = false;
    let mut help = false;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        // `--flag=value` and `--flag value` are both accepted.
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg, None),
        };
        let mut value = || {
            inline.clone().or_else(|| {
                let next = args.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            })
        };

        match flag {
            "-h" | "--help" => help = true,
            "-v" | "--verbose" => verbose = true,
            "--shared-fortune" => session = session.with_fortune_policy(FortunePolicy::Shared),
            "--data" => {
                if let Some(dir) = value() {
                    session = session.with_data_dir(dir);
                }
            }
            "--catalog" => {
                if let Some(path) = value() {
                    session = session.with_catalog_file(path);
                }
            }
            "--save" => {
                if let Some(path) = value() {
                    session = session.with_save_path(path);
                }
            }
            "--seed" => match value().map(|s| s.parse::<u64>()) {
                Some(Ok(seed)) => session = session.with_seed(seed),
                Some(Err(err)) => eprintln!("Ignoring --seed: {err}"),
                None => {}
            },
            "--max-rounds" => match value().map(|s| s.parse::<u32>()) {
                Some(Ok(0)) => eprintln!("Ignoring --max-rounds: must be at least 1"),
                Some(Ok(rounds)) => session = session.with_max_rounds(rounds),
                Some(Err(err)) => eprintln!("Ignoring --max-rounds: {err}"),
                None => {}
            },
            other if other.starts_with('-') => eprintln!("Ignoring unknown option: {other}"),
            path => session = session.with_save_path(path),
        }
        i += 1;
    }

    CliOptions {
        session,
        verbose,
        help,
    }
}

fn print_help() {
    println!("Knights of Legend - a party combat simulator");
    println!();
    println!("USAGE:");
    println!("  knights [OPTIONS] [SAVE_FILE]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help            Show this help message");
    println!("  -v, --verbose         Show every attack roll during battles");
    println!("  --data <DIR>          Game data folder with fortunes.csv and monsters.csv (default: data)");
    println!("  --catalog <FILE>      Extra tagged catalog (MOB,... and FORTUNE,... lines)");
    println!("  --save <FILE>         Knight save file; .json keeps the active party (default: data/knights.csv)");
    println!("  --seed <N>            Seed the dice for a repeatable game");
    println!("  --max-rounds <N>      Rounds before a battle is called a stalemate (default: 1000)");
    println!("  --shared-fortune      Draw one fortune for the whole party");
    println!();
    println!("ENVIRONMENT:");
    println!("  KNIGHTS_DATA, KNIGHTS_SAVE, KNIGHTS_SEED   Defaults for --data, --save and --seed");
    println!("  RUST_LOG                                   Log filter (default: {DEFAULT_LOG_FILTER})");
}
