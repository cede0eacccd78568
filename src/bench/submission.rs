//! Leaderboard submission record and local ranking

use serde::{Deserialize, Serialize};

use super::score::Score;
use crate::core::types::Result;

const ANONYMOUS: &str = "anonymous";

/// Record sent to the leaderboard service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub username: String,
    pub gpu: String,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
}

impl Submission {
    /// Submission for a scored run; a blank username becomes "anonymous"
    pub fn new(username: &str, gpu: impl Into<String>, score: &Score) -> Self {
        let username = username.trim();
        Self {
            username: if username.is_empty() { ANONYMOUS.to_string() } else { username.to_string() },
            gpu: gpu.into(),
            score: score.score,
            fps: Some(score.fps),
        }
    }

    /// Drop the optional fps field
    pub fn without_fps(mut self) -> Self {
        self.fps = None;
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One row of a ranked leaderboard (rank starts at 1)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub submission: Submission,
}

/// Rank by descending score and keep the first `top_n`
///
/// Equal scores keep their submission order.
pub fn rank_entries(submissions: &[Submission], top_n: usize) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&Submission> = submissions.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));
    sorted
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, s)| LeaderboardEntry {
            rank: i + 1,
            submission: s.clone(),
        })
        .collect()
}
