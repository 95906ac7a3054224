//! Leaderboard Entries
//!
//! One row per player and the merge rule that keeps only their best run.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// A player's best run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Normalized player name
    pub username: String,
    /// Best score
    pub score: u64,
    /// Level reached on the best run
    pub level: u64,
    /// When the best score was recorded, as Unix milliseconds on the wire
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// What a merge did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First score for this player
    Inserted,
    /// Beat the stored score
    Improved {
        /// Score that was replaced
        previous: u64,
    },
    /// Did not beat the stored score; nothing changed
    Kept {
        /// Score that stays
        best: u64,
    },
}

impl MergeOutcome {
    /// Did the table change?
    pub fn changed(&self) -> bool {
        !matches!(self, MergeOutcome::Kept { .. })
    }
}

/// Merge a run into the table.
///
/// The stored row is replaced only if `score` is strictly greater; score,
/// level and timestamp change together. Unknown players are appended.
pub fn merge_score(
    entries: &mut Vec<LeaderboardEntry>,
    username: &str,
    score: u64,
    level: u64,
    now: DateTime<Utc>,
) -> MergeOutcome {
    match entries.iter_mut().find(|e| e.username == username) {
        Some(entry) if score > entry.score => {
            let previous = entry.score;
            entry.score = score;
            entry.level = level;
            entry.timestamp = now;
            MergeOutcome::Improved { previous }
        }
        Some(entry) => MergeOutcome::Kept { best: entry.score },
        None => {
            entries.push(LeaderboardEntry {
                username: username.to_string(),
                score,
                level,
                timestamp: now,
            });
            MergeOutcome::Inserted
        }
    }
}

/// Sort for display: highest score first, earlier timestamp wins ties.
pub fn rank(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.timestamp.cmp(&b.timestamp))
            .then(a.username.cmp(&b.username))
    });
}
