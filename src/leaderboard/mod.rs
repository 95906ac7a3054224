//! Leaderboard
//!
//! Best-score-per-player table behind a proof check.
//!
//! ```text
//!  SubmitScoreRequest
//!        │
//!        ▼
//!  service.rs  validate fields ─► verify proof ─► merge-if-higher
//!        │                                             │
//!        ▼                                             ▼
//!  store.rs    exclusive read-modify-write of the JSON table
//!        │
//!        ▼
//!  entry.rs    LeaderboardEntry + pure merge rule
//! ```

pub mod entry;
pub mod service;
pub mod store;

use serde::{Serialize, Deserialize};

// Re-export key types
pub use entry::{merge_score, LeaderboardEntry, MergeOutcome};
pub use service::{LeaderboardService, SubmitError};
pub use store::{LeaderboardStore, StoreError};

/// Message returned for an accepted score.
pub const SCORE_ACCEPTED_MESSAGE: &str = "Your Score is proved";

/// Message returned after the table was emptied.
pub const CLEARED_MESSAGE: &str = "Leaderboard cleared successfully";

/// A finished run's score with its proof, as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitScoreRequest {
    /// Raw player name; normalized by the service
    pub username: String,
    /// Final score
    pub score: i64,
    /// Final level
    pub level: i64,
    /// Opaque proof payload
    pub proof: String,
    /// `[score, level]` the proof commits to
    pub public_inputs: Vec<i64>,
}

/// Reply to an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitScoreResponse {
    /// Human-readable confirmation
    pub message: String,
}
