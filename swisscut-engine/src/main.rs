use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use swisscut_core::{MatchId, ParticipantId, TournamentId};
use swisscut_engine::config::ConfigError;
use swisscut_engine::store::MySqlStore;
use swisscut_engine::{logger, Config, Engine};

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Args {
    /// Path to the config file. Falls back to the environment if the file does not exist.
    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Creates all missing tables.
    Migrate,
    /// Generates the pairings of a Swiss round.
    GenerateRound { tournament: TournamentId, round: u32 },
    /// Seeds the first top cut round from the Swiss standings.
    TopCut {
        tournament: TournamentId,
        cut_size: u32,
    },
    /// Generates the next bracket round.
    Advance { tournament: TournamentId },
    /// Moves the winner of a bracket match into the following round.
    Promote { match_id: MatchId },
    /// Records the score of a match.
    Report {
        match_id: MatchId,
        score_a: u32,
        score_b: u32,
    },
    /// Withdraws a participant from the tournament.
    Drop { participant: ParticipantId },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config).await {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {}", err);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = logger::init(config.loglevel) {
        eprintln!("Failed to initialize logger: {}", err);
        return ExitCode::FAILURE;
    }

    match run(args.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match Config::from_file(path).await {
        Ok(config) => Ok(config.with_environment()),
        Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            Config::from_environment()
        }
        Err(err) => Err(err),
    }
}

async fn run(command: Command, config: Config) -> Result<(), Box<dyn Error>> {
    let store = MySqlStore::connect(&config.database).await?;

    let engine = match config.pairing.seed {
        Some(seed) => Engine::with_seed(store, seed),
        None => Engine::new(store),
    };

    match command {
        Command::Migrate => {
            engine.store().migrate().await?;
            log::info!("Migrated tables with prefix {:?}", config.database.prefix);
        }
        Command::GenerateRound { tournament, round } => {
            print(&engine.generate_swiss_round(tournament, round).await?)?;
        }
        Command::TopCut {
            tournament,
            cut_size,
        } => {
            print(&engine.generate_top_cut(tournament, cut_size).await?)?;
        }
        Command::Advance { tournament } => {
            print(&engine.advance_bracket(tournament).await?)?;
        }
        Command::Promote { match_id } => {
            engine.promote_winner_to_next_round(match_id).await?;
        }
        Command::Report {
            match_id,
            score_a,
            score_b,
        } => {
            print(&engine.record_result(match_id, score_a, score_b).await?)?;
        }
        Command::Drop { participant } => {
            print(&engine.drop_participant(participant).await?)?;
        }
    }

    Ok(())
}

fn print<T>(value: &T) -> Result<(), serde_json::Error>
where
    T: Serialize,
{
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
