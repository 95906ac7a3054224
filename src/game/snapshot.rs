//! Render Snapshot
//!
//! Owned, read-only copy of everything a renderer draws. Built after each
//! frame; it shares no storage with the live run, so painting it can never
//! observe a half-applied step.

use serde::{Serialize, Deserialize};

use crate::game::object::FallingObject;
use crate::game::state::{GameOverReason, Phase};

/// Drawable state at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current phase
    pub phase: Phase,
    /// Active-clock time the snapshot was taken at
    pub now_ms: u64,
    /// Normalized player name, once a run has started
    pub player: Option<String>,
    /// Objects on the field, oldest first (draw order)
    pub objects: Vec<FallingObject>,
    /// Score
    pub score: u32,
    /// Level
    pub level: u32,
    /// Missed crabs
    pub missed: u32,
    /// Misses allowed before the run ends
    pub miss_limit: u32,
    /// Active time played this run, for the run timer
    pub run_elapsed_ms: u64,
    /// Manual clear-bombs still available this level
    pub can_clear_bombs: bool,
    /// Level-up banner should be shown
    pub show_level_up: bool,
    /// When the banner goes away, on the active clock
    pub level_up_until: Option<u64>,
    /// Why the run ended
    pub game_over_reason: Option<GameOverReason>,
    /// Game-over screen text
    pub game_over_message: Option<String>,
    /// Score submission progress text
    pub submission_status: Option<String>,
}

impl Snapshot {
    /// Empty menu-screen snapshot.
    pub fn idle(now_ms: u64, miss_limit: u32) -> Self {
        Self {
            phase: Phase::Idle,
            now_ms,
            player: None,
            objects: Vec::new(),
            score: 0,
            level: 1,
            missed: 0,
            miss_limit,
            run_elapsed_ms: 0,
            can_clear_bombs: true,
            show_level_up: false,
            level_up_until: None,
            game_over_reason: None,
            game_over_message: None,
            submission_status: None,
        }
    }
}
