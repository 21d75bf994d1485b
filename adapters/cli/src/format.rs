//! Text shown by the terminal screens.

use std::{fmt::Write as _, time::Duration};

use vortex_core::{CellIndex, Event, Level, RankedEntry, RoundState, Score};
use vortex_system_progress::LevelAvailability;

/// Heading of a leaderboard listing.
#[must_use]
pub(crate) fn scores_title(level: Option<Level>) -> String {
    match level {
        Some(level) => format!("LEVEL {level}"),
        None => "HALL OF FAME".to_owned(),
    }
}

/// One leaderboard row. The global view names the level of each entry.
#[must_use]
pub(crate) fn score_row(entry: &RankedEntry, global: bool) -> String {
    if global {
        format!(
            "{} | {} : {} (Lvl {})",
            entry.rank, entry.name, entry.score, entry.level
        )
    } else {
        format!("{} | {} : {}", entry.rank, entry.name, entry.score)
    }
}

/// Label of a level on the selection screen.
#[must_use]
pub(crate) fn level_label(availability: LevelAvailability) -> String {
    if availability.unlocked {
        format!("LEVEL {}", availability.level)
    } else {
        "LOCKED".to_owned()
    }
}

/// Countdown readout with one decimal, flagged while time is low.
#[must_use]
pub(crate) fn time_line(remaining: Duration, low_time: bool) -> String {
    let seconds = remaining.as_secs_f64();
    if low_time {
        format!("T: {seconds:.1} !")
    } else {
        format!("T: {seconds:.1}")
    }
}

/// Status bar above the grid.
#[must_use]
pub(crate) fn status_line(state: &RoundState, carried_score: Score) -> String {
    let points = carried_score.saturating_add(Score::from(state.hits));
    format!("LVL: {}  PTS: {points}", state.level)
}

/// Renders the grid row by row with the active target in brackets.
#[must_use]
pub(crate) fn grid(state: &RoundState) -> String {
    let mut out = String::new();
    for index in 0..state.cell_count() {
        let cell = CellIndex::new(index);
        let label = if state.target == Some(cell) {
            format!("[{cell}]")
        } else {
            format!(" {cell} ")
        };
        let _ = write!(out, "{label:>5}");
        if cell.column(state.side) + 1 == state.side {
            out.push('\n');
        }
    }
    out
}

/// Summary screen of a finished level.
#[must_use]
pub(crate) fn level_complete(level: Level, hits: u32, total_score: Score) -> String {
    format!("LEVEL {level} COMPLETE\nTOTAL SCORE: {total_score}\n(+{hits} this level)")
}

/// One line of a scripted run.
#[must_use]
pub(crate) fn event(event: &Event) -> String {
    match event {
        Event::RoundStarted { state } => format!(
            "round started: level {} ({}x{}), target {}",
            state.level,
            state.side,
            state.side,
            state
                .target
                .map_or_else(|| "-".to_owned(), |target| target.to_string())
        ),
        Event::TimeRemaining {
            remaining,
            low_time,
        } => time_line(*remaining, *low_time),
        Event::TargetHit {
            cell,
            next_target,
            hits,
        } => format!("hit {cell} -> next {next_target} (hits {hits})"),
        Event::TargetMissed { cell, target } => format!("miss {cell} (target {target})"),
        Event::RoundExpired { result } => format!(
            "time up: {} hits, total {}",
            result.hits_this_level, result.total_score
        ),
    }
}
