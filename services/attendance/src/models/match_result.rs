//! Tournament match result model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of a single club match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl MatchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchOutcome::WhiteWins => "white_wins",
            MatchOutcome::BlackWins => "black_wins",
            MatchOutcome::Draw => "draw",
        }
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white_wins" => Ok(MatchOutcome::WhiteWins),
            "black_wins" => Ok(MatchOutcome::BlackWins),
            "draw" => Ok(MatchOutcome::Draw),
            other => Err(format!("unknown match outcome: {}", other)),
        }
    }
}

/// One played match between two students
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: Uuid,
    pub white_id: Uuid,
    pub black_id: Uuid,
    pub outcome: MatchOutcome,
    pub played_at: DateTime<Utc>,
}
