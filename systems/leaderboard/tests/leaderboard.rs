use vortex_core::{Level, Rank, RankedEntry, DEFAULT_PLAYER_NAME, LEADERBOARD_CAPACITY};
use vortex_system_leaderboard::{Leaderboard, MemoryScoreStore, ScoreStore};

fn level(value: u32) -> Level {
    Level::new(value).expect("valid level")
}

fn board() -> Leaderboard<MemoryScoreStore> {
    Leaderboard::new(MemoryScoreStore::new())
}

/// Fills the level with scores 1..=25, submitted in increasing order.
fn filled(level: Level) -> Leaderboard<MemoryScoreStore> {
    let mut board = board();
    for score in 1..=LEADERBOARD_CAPACITY as i64 {
        let _ = board
            .submit(level, &format!("p{score}"), score)
            .expect("submit");
    }
    board
}

fn scores(board: &Leaderboard<MemoryScoreStore>, level: Level) -> Vec<i64> {
    board
        .top_default(Some(level))
        .expect("top")
        .into_iter()
        .map(|entry| entry.score)
        .collect()
}

#[test]
fn empty_level_qualifies_anything_and_lists_nothing() {
    let board = board();
    assert!(board.qualifies(level(2), 0).expect("qualifies"));
    assert!(board.top_default(Some(level(2))).expect("top").is_empty());
    assert!(board.top_default(None).expect("top").is_empty());
    assert_eq!(board.lowest_qualifying_score(level(2)).expect("lowest"), None);
}

#[test]
fn blank_name_is_stored_as_guest_with_first_rank() {
    let mut board = board();
    let rank = board.submit(level(3), "", 10).expect("submit");

    assert_eq!(rank, Some(Rank::new(1)));
    let top = board.top_default(Some(level(3))).expect("top");
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, DEFAULT_PLAYER_NAME);
    assert_eq!(top[0].score, 10);
}

#[test]
fn qualification_uses_strict_inequality_once_full() {
    let level = level(1);
    let mut board = board();
    for _ in 0..LEADERBOARD_CAPACITY - 1 {
        let _ = board.submit(level, "low", 0).expect("submit");
        assert!(board.qualifies(level, 0).expect("qualifies"), "free slots accept any score");
    }
    let _ = board.submit(level, "low", 0).expect("submit");

    assert_eq!(board.lowest_qualifying_score(level).expect("lowest"), Some(0));
    assert!(!board.qualifies(level, 0).expect("qualifies"), "equal to lowest");
    assert!(!board.qualifies(level, -1).expect("qualifies"), "below lowest");
    assert!(board.qualifies(level, 1).expect("qualifies"), "above lowest");
}

#[test]
fn low_twenty_sixth_submission_leaves_table_unchanged() {
    let level = level(2);
    let mut board = filled(level);
    let before = board.top_default(Some(level)).expect("top");

    assert!(!board.qualifies(level, 0).expect("qualifies"));
    let rank = board.submit(level, "late", 0).expect("submit");

    assert_eq!(rank, None, "the submitted entry itself is evicted");
    assert_eq!(board.top_default(Some(level)).expect("top"), before);
    assert_eq!(board.store().count(level).expect("count"), LEADERBOARD_CAPACITY);
}

#[test]
fn tie_with_lowest_evicts_the_newcomer() {
    let level = level(2);
    let mut board = filled(level);

    let rank = board.submit(level, "tie", 1).expect("submit");

    assert_eq!(rank, None);
    let top = board.top_default(Some(level)).expect("top");
    assert_eq!(top.last().map(|entry| entry.name.as_str()), Some("p1"));
}

#[test]
fn high_submission_evicts_lowest_and_ranks_first() {
    let level = level(4);
    let mut board = filled(level);

    let rank = board.submit(level, "champion", 100).expect("submit");

    assert_eq!(rank, Some(Rank::new(1)));
    let scores = scores(&board, level);
    assert_eq!(scores.len(), LEADERBOARD_CAPACITY);
    assert_eq!(scores.first(), Some(&100));
    assert_eq!(scores.last(), Some(&2), "score 1 was evicted");
}

#[test]
fn tables_stay_sorted_and_bounded_after_many_submissions() {
    let level = level(3);
    let mut board = board();
    for step in 0..120i64 {
        let score = (step * 37) % 53;
        let _ = board.submit(level, &format!("s{step}"), score).expect("submit");
    }

    let top = board.top_default(Some(level)).expect("top");
    assert_eq!(top.len(), LEADERBOARD_CAPACITY);
    assert!(top.windows(2).all(|pair| pair[0].score >= pair[1].score));
    assert_eq!(board.store().entries().len(), LEADERBOARD_CAPACITY);
}

#[test]
fn equal_scores_rank_earliest_submission_first() {
    let level = level(1);
    let mut board = board();
    let _ = board.submit(level, "first", 5).expect("submit");
    let second = board.submit(level, "second", 5).expect("submit");
    let _ = board.submit(level, "top", 6).expect("submit");

    assert_eq!(second, Some(Rank::new(2)));
    let names: Vec<String> = board
        .top_default(Some(level))
        .expect("top")
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, ["top", "first", "second"]);
}

#[test]
fn levels_are_capacity_bounded_independently() {
    let mut board = filled(level(1));
    let rank = board.submit(level(2), "solo", 0).expect("submit");

    assert_eq!(rank, Some(Rank::new(1)));
    assert_eq!(board.store().count(level(1)).expect("count"), LEADERBOARD_CAPACITY);
    assert_eq!(board.store().count(level(2)).expect("count"), 1);
}

#[test]
fn global_view_interleaves_levels_by_score() {
    let mut board = board();
    let _ = board.submit(level(1), "A", 10).expect("submit");
    let _ = board.submit(level(1), "B", 5).expect("submit");
    let _ = board.submit(level(2), "C", 8).expect("submit");

    let top = board.top_default(None).expect("top");

    let expected = vec![
        RankedEntry {
            rank: Rank::new(1),
            name: "A".to_owned(),
            score: 10,
            level: level(1),
        },
        RankedEntry {
            rank: Rank::new(2),
            name: "C".to_owned(),
            score: 8,
            level: level(2),
        },
        RankedEntry {
            rank: Rank::new(3),
            name: "B".to_owned(),
            score: 5,
            level: level(1),
        },
    ];
    assert_eq!(top, expected);
}

#[test]
fn global_view_is_capped_and_limit_respected() {
    let mut board = board();
    for lvl in Level::all() {
        for score in 0..20i64 {
            let _ = board.submit(lvl, "p", score).expect("submit");
        }
    }

    assert_eq!(board.top_default(None).expect("top").len(), LEADERBOARD_CAPACITY);
    assert_eq!(board.top(None, 100).expect("top").len(), LEADERBOARD_CAPACITY);
    let three = board.top(Some(level(1)), 3).expect("top");
    assert_eq!(three.len(), 3);
    assert_eq!(three[2].rank, Rank::new(3));
}

#[test]
fn names_are_kept_verbatim_unless_blank() {
    let mut board = board();
    let _ = board.submit(level(1), "  Ada ", 9).expect("submit");
    let _ = board.submit(level(1), " \t ", 4).expect("submit");

    let names: Vec<String> = board
        .top_default(Some(level(1)))
        .expect("top")
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, ["  Ada ", DEFAULT_PLAYER_NAME]);
}
