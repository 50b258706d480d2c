//! Tournament standings computation
//!
//! Pure aggregation over played matches: win 1 point, draw half a
//! point. Display belongs to the UI; this module only computes.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{MatchOutcome, MatchResult};

/// Points awarded per win, counted in half-points to stay exact.
const HALF_POINTS_PER_WIN: u32 = 2;
const HALF_POINTS_PER_DRAW: u32 = 1;

/// Achievement thresholds recognized by the club
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstWin,
    FivePoints,
    TenPoints,
}

/// One player's line in the standings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingsRow {
    pub student_id: Uuid,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: f64,
    pub achievements: Vec<Achievement>,
}

#[derive(Default)]
struct Tally {
    wins: u32,
    losses: u32,
    draws: u32,
}

impl Tally {
    fn half_points(&self) -> u32 {
        self.wins * HALF_POINTS_PER_WIN + self.draws * HALF_POINTS_PER_DRAW
    }

    fn achievements(&self) -> Vec<Achievement> {
        let mut achievements = Vec::new();
        if self.wins >= 1 {
            achievements.push(Achievement::FirstWin);
        }
        if self.half_points() >= 10 {
            achievements.push(Achievement::FivePoints);
        }
        if self.half_points() >= 20 {
            achievements.push(Achievement::TenPoints);
        }
        achievements
    }
}

/// Fold match results into standings, sorted by points descending, then
/// wins descending, then student id for a stable order.
pub fn compute_standings(matches: &[MatchResult]) -> Vec<StandingsRow> {
    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();

    for result in matches {
        let (white, black) = (result.white_id, result.black_id);
        match result.outcome {
            MatchOutcome::WhiteWins => {
                tallies.entry(white).or_default().wins += 1;
                tallies.entry(black).or_default().losses += 1;
            }
            MatchOutcome::BlackWins => {
                tallies.entry(black).or_default().wins += 1;
                tallies.entry(white).or_default().losses += 1;
            }
            MatchOutcome::Draw => {
                tallies.entry(white).or_default().draws += 1;
                tallies.entry(black).or_default().draws += 1;
            }
        }
    }

    let mut rows: Vec<StandingsRow> = tallies
        .into_iter()
        .map(|(student_id, tally)| StandingsRow {
            student_id,
            games: tally.wins + tally.losses + tally.draws,
            wins: tally.wins,
            losses: tally.losses,
            draws: tally.draws,
            points: f64::from(tally.half_points()) / 2.0,
            achievements: tally.achievements(),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.points
            .total_cmp(&a.points)
            .then_with(|| b.wins.cmp(&a.wins))
            .then_with(|| a.student_id.cmp(&b.student_id))
    });

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn result(white: Uuid, black: Uuid, outcome: MatchOutcome) -> MatchResult {
        MatchResult {
            id: Uuid::new_v4(),
            white_id: white,
            black_id: black,
            outcome,
            played_at: Utc.with_ymd_and_hms(2026, 3, 4, 21, 45, 0).unwrap(),
        }
    }

    #[test]
    fn empty_input_yields_empty_standings() {
        assert!(compute_standings(&[]).is_empty());
    }

    #[test]
    fn points_and_order_follow_results() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let matches = vec![
            result(a, b, MatchOutcome::WhiteWins),
            result(a, c, MatchOutcome::WhiteWins),
            result(b, c, MatchOutcome::Draw),
        ];

        let rows = compute_standings(&matches);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].student_id, a);
        assert_eq!(rows[0].points, 2.0);
        assert_eq!(rows[0].wins, 2);
        assert_eq!(rows[0].games, 2);

        // b and c each drew once and lost once
        assert_eq!(rows[1].points, 0.5);
        assert_eq!(rows[2].points, 0.5);
        assert_eq!(rows[1].draws, 1);
    }

    #[test]
    fn achievements_unlock_at_thresholds() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let one_win = compute_standings(&[result(a, b, MatchOutcome::WhiteWins)]);
        assert_eq!(one_win[0].achievements, vec![Achievement::FirstWin]);
        assert!(one_win[1].achievements.is_empty());

        let five_wins: Vec<MatchResult> = (0..5)
            .map(|_| result(a, b, MatchOutcome::WhiteWins))
            .collect();
        let rows = compute_standings(&five_wins);
        assert_eq!(
            rows[0].achievements,
            vec![Achievement::FirstWin, Achievement::FivePoints]
        );

        let ten_wins: Vec<MatchResult> = (0..10)
            .map(|_| result(a, b, MatchOutcome::WhiteWins))
            .collect();
        let rows = compute_standings(&ten_wins);
        assert_eq!(
            rows[0].achievements,
            vec![
                Achievement::FirstWin,
                Achievement::FivePoints,
                Achievement::TenPoints
            ]
        );
    }

    #[test]
    fn draws_split_the_point() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = compute_standings(&[result(a, b, MatchOutcome::Draw)]);
        assert_eq!(rows[0].points, 0.5);
        assert_eq!(rows[1].points, 0.5);
        assert_eq!(rows[0].games, 1);
    }
}
