//! Line-based terminal play loop.

use std::{
    io::{BufRead, Write},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use rand::Rng;
use tracing::warn;
use vortex_core::{CellIndex, Level};
use vortex_session::{LevelReport, Session};
use vortex_system_leaderboard::ScoreStore;
use vortex_system_progress::ProgressStore;

use crate::format;

const QUIT: &str = "q";

/// Source of elapsed time between player inputs.
pub(crate) trait Clock {
    /// Time elapsed since the previous call.
    fn lap(&mut self) -> Duration;
}

/// Wall-clock stopwatch.
#[derive(Debug)]
pub(crate) struct WallClock {
    last: Instant,
}

impl WallClock {
    /// Starts the stopwatch now.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Clock for WallClock {
    fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed
    }
}

/// Terminal endpoints and player preferences for one play-through.
pub(crate) struct Terminal<'a, C, I, O> {
    /// Time source for the countdown.
    pub(crate) clock: C,
    /// Player input, one command per line.
    pub(crate) input: I,
    /// Screen output.
    pub(crate) output: O,
    /// Name submitted for qualifying scores without prompting.
    pub(crate) name: Option<&'a str>,
}

/// Plays from `level` until the player stops, quits or clears the final level.
pub(crate) fn run<S, P, R, C, I, O>(
    session: &mut Session<S, P, R>,
    level: Level,
    terminal: &mut Terminal<'_, C, I, O>,
) -> Result<()>
where
    S: ScoreStore,
    P: ProgressStore,
    R: Rng,
    C: Clock,
    I: BufRead,
    O: Write,
{
    let _ = session
        .begin(level)
        .with_context(|| format!("cannot start level {level}"))?;

    loop {
        let Some(report) = play_level(session, terminal)? else {
            session.abandon();
            writeln!(terminal.output, "bye")?;
            return Ok(());
        };

        writeln!(
            terminal.output,
            "{}",
            format::level_complete(
                report.result.level,
                report.result.hits_this_level,
                report.result.total_score
            )
        )?;
        if let Some(unlocked) = report.newly_unlocked {
            writeln!(terminal.output, "LEVEL {unlocked} unlocked")?;
        }
        if report.qualifies {
            submit(session, terminal)?;
        }
        if !continue_requested(&report, terminal)? {
            break;
        }
        let _ = session.continue_play_through()?;
    }

    let summary = session.finish()?;
    writeln!(
        terminal.output,
        "FINISH GAME: level {} with {} points",
        summary.final_level, summary.total_score
    )?;
    Ok(())
}

/// Runs the current round. `None` means the player left mid-round.
fn play_level<S, P, R, C, I, O>(
    session: &mut Session<S, P, R>,
    terminal: &mut Terminal<'_, C, I, O>,
) -> Result<Option<LevelReport>>
where
    S: ScoreStore,
    P: ProgressStore,
    R: Rng,
    C: Clock,
    I: BufRead,
    O: Write,
{
    let _ = terminal.clock.lap();
    draw(session, terminal, None)?;

    loop {
        let line = read_line(&mut terminal.input)?;
        let tick = session.tick(terminal.clock.lap())?;
        if let Some(report) = tick.report {
            writeln!(terminal.output, "T: 0.0")?;
            return Ok(Some(report));
        }

        let Some(line) = line else {
            return Ok(None);
        };
        let command = line.trim();
        if command.eq_ignore_ascii_case(QUIT) {
            return Ok(None);
        }
        let Ok(raw) = command.parse::<u32>() else {
            writeln!(terminal.output, "enter a cell number, or {QUIT} to quit")?;
            continue;
        };

        let outcome = session.hit(CellIndex::new(raw))?;
        if !outcome.correct {
            writeln!(terminal.output, "miss")?;
        }
        draw(session, terminal, Some(format::time_line(tick.remaining, tick.low_time)))?;
    }
}

fn draw<S, P, R, C, I, O>(
    session: &Session<S, P, R>,
    terminal: &mut Terminal<'_, C, I, O>,
    time: Option<String>,
) -> Result<()>
where
    S: ScoreStore,
    P: ProgressStore,
    R: Rng,
    O: Write,
{
    let Some(state) = session.round_state() else {
        return Ok(());
    };
    let time = time.unwrap_or_else(|| format::time_line(state.remaining, false));
    writeln!(
        terminal.output,
        "{}  {time}",
        format::status_line(&state, session.accumulated_score())
    )?;
    write!(terminal.output, "{}", format::grid(&state))?;
    terminal.output.flush()?;
    Ok(())
}

fn submit<S, P, R, C, I, O>(
    session: &mut Session<S, P, R>,
    terminal: &mut Terminal<'_, C, I, O>,
) -> Result<()>
where
    S: ScoreStore,
    P: ProgressStore,
    R: Rng,
    I: BufRead,
    O: Write,
{
    writeln!(terminal.output, "NEW HIGH SCORE!")?;
    let name = match terminal.name {
        Some(name) => name.to_owned(),
        None => {
            write!(terminal.output, "Enter Name: ")?;
            terminal.output.flush()?;
            read_line(&mut terminal.input)?.unwrap_or_default()
        }
    };

    match session.submit_name(&name) {
        Ok(Some(rank)) => writeln!(terminal.output, "ranked #{rank}")?,
        Ok(None) => writeln!(terminal.output, "score did not make the table")?,
        Err(error) => {
            warn!(error = %error, "score submission failed");
            writeln!(terminal.output, "score could not be saved: {error}")?;
        }
    }
    Ok(())
}

fn continue_requested<C, I, O>(
    report: &LevelReport,
    terminal: &mut Terminal<'_, C, I, O>,
) -> Result<bool>
where
    I: BufRead,
    O: Write,
{
    if !report.can_continue {
        return Ok(false);
    }
    write!(terminal.output, "NEXT LEVEL? [Y/n] ")?;
    terminal.output.flush()?;
    let answer = read_line(&mut terminal.input)?;
    Ok(answer.is_some_and(|answer| {
        let answer = answer.trim();
        answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
    }))
}

/// Reads one line without its terminator, `None` at end of input.
fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("failed to read player input")?;
    let content = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(content);
    Ok((read > 0).then_some(line))
}
