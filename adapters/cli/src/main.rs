#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for the Vortex reaction game.

mod config;
mod format;
mod play;
mod simulate;

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vortex_core::Level;
use vortex_round::RoundEngine;
use vortex_session::Session;
use vortex_system_leaderboard::{JsonScoreStore, Leaderboard};
use vortex_system_progress::{level_availability, JsonProgressStore, ProgressStore};
use vortex_system_target_selection::TargetSelector;

use crate::{
    config::VortexConfig,
    play::{Terminal, WallClock},
};

/// Tap the highlighted cell before the countdown runs out.
#[derive(Debug, Parser)]
#[command(name = "vortex", version)]
struct Cli {
    /// Configuration file to read.
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play in the terminal, one cell number per line.
    Play {
        /// Level to start on; defaults to the highest unlocked level.
        #[arg(long, value_parser = parse_level)]
        level: Option<Level>,
        /// Name recorded for qualifying scores instead of prompting.
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the leaderboard of one level, or the hall of fame.
    Scores {
        /// Level to show; every level when omitted.
        #[arg(long, value_parser = parse_level)]
        level: Option<Level>,
    },
    /// List which levels are unlocked.
    Levels,
    /// Run a reproducible round that taps every target after a fixed delay.
    Simulate {
        /// Level to play.
        #[arg(long, value_parser = parse_level)]
        level: Level,
        /// Seed for target selection.
        #[arg(long)]
        seed: u64,
        /// Milliseconds between a target appearing and the tap.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        reaction_ms: u64,
        /// Offer the result to the leaderboard under this name.
        #[arg(long)]
        name: Option<String>,
    },
}

fn parse_level(raw: &str) -> Result<Level, String> {
    let value: u32 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a level number"))?;
    Level::new(value).map_err(|error| error.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(io::stderr),
        )
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = config::load(&cli.config)?;
    init_logging(&config.logging.filter);
    debug!(
        config = %cli.config.display(),
        data_dir = %config.storage.data_dir.display(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Play { level, name } => cmd_play(&config, level, name.as_deref()),
        Commands::Scores { level } => cmd_scores(&config, level, &mut io::stdout().lock()),
        Commands::Levels => cmd_levels(&config, &mut io::stdout().lock()),
        Commands::Simulate {
            level,
            seed,
            reaction_ms,
            name,
        } => cmd_simulate(
            &config,
            level,
            seed,
            reaction_ms,
            name.as_deref(),
            &mut io::stdout().lock(),
        ),
    }
}

fn open_scores(config: &VortexConfig) -> Result<Leaderboard<JsonScoreStore>> {
    let path = config.storage.scores_path();
    let store = JsonScoreStore::open(&path)
        .with_context(|| format!("failed to open score table {}", path.display()))?;
    debug!(path = %store.path().display(), "score table ready");
    Ok(Leaderboard::new(store))
}

fn open_progress(config: &VortexConfig) -> Result<JsonProgressStore> {
    let path = config.storage.progress_path();
    let store = JsonProgressStore::open(&path)
        .with_context(|| format!("failed to open progress {}", path.display()))?;
    debug!(path = %store.path().display(), "progress ready");
    Ok(store)
}

fn cmd_play(config: &VortexConfig, level: Option<Level>, name: Option<&str>) -> Result<()> {
    let progress = open_progress(config)?;
    let level = match level {
        Some(level) => level,
        None => progress.unlocked_level()?,
    };
    let selector = TargetSelector::from_config(config.round.selector_config(None));
    let mut session = Session::new(open_scores(config)?, progress, RoundEngine::new(selector));

    let mut terminal = Terminal {
        clock: WallClock::new(),
        input: io::stdin().lock(),
        output: io::stdout().lock(),
        name,
    };
    play::run(&mut session, level, &mut terminal)
}

fn cmd_scores(config: &VortexConfig, level: Option<Level>, out: &mut impl Write) -> Result<()> {
    let leaderboard = open_scores(config)?;
    let rows = leaderboard.top_default(level)?;

    writeln!(out, "{}", format::scores_title(level))?;
    if rows.is_empty() {
        writeln!(out, "no scores yet")?;
    }
    for row in &rows {
        writeln!(out, "{}", format::score_row(row, level.is_none()))?;
    }
    Ok(())
}

fn cmd_levels(config: &VortexConfig, out: &mut impl Write) -> Result<()> {
    let progress = open_progress(config)?;
    for availability in level_availability(&progress)? {
        writeln!(out, "{}", format::level_label(availability))?;
    }
    Ok(())
}

fn cmd_simulate(
    config: &VortexConfig,
    level: Level,
    seed: u64,
    reaction_ms: u64,
    name: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let selector = config.round.selector_config(Some(seed));
    let simulation = simulate::run_script(level, selector, Duration::from_millis(reaction_ms))?;
    for event in &simulation.events {
        writeln!(out, "{}", format::event(event))?;
    }

    let result = simulation.result;
    writeln!(
        out,
        "{}",
        format::level_complete(result.level, result.hits_this_level, result.total_score)
    )?;

    let Some(name) = name else {
        return Ok(());
    };
    let mut leaderboard = open_scores(config)?;
    if !leaderboard.qualifies(level, result.total_score)? {
        writeln!(out, "score does not qualify for LEVEL {level}")?;
        return Ok(());
    }
    match leaderboard.submit(level, name, result.total_score)? {
        Some(rank) => writeln!(out, "ranked #{rank}")?,
        None => writeln!(out, "score did not make the table")?,
    }
    Ok(())
}
