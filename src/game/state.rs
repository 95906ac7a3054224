//! Run State Definitions
//!
//! The per-run aggregate mutated by the simulation step and the tap
//! resolver, plus the phase enum and player identity type the run state
//! machine works with.

use serde::{Serialize, Deserialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::rng::DeterministicRng;
use crate::game::events::GameEvent;
use crate::game::object::ObjectStore;
use crate::game::tick::RunConfig;

// =============================================================================
// PHASE
// =============================================================================

/// Top-level state of the run state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Menu, collecting the player name.
    Idle,
    /// Instructions screen.
    HowToPlay,
    /// Objects falling, taps resolved.
    Playing,
    /// Frozen run.
    Paused,
    /// Run finished, score submitted once.
    GameOver,
}

impl Phase {
    /// Short name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::HowToPlay => "how_to_play",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
            Phase::GameOver => "game_over",
        }
    }
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// Miss counter reached the limit.
    TooManyMissed,
    /// A big bomb was tapped.
    HitBigBomb,
    /// The player ended the run and submitted.
    Submitted,
}

impl GameOverReason {
    /// Text shown on the game-over screen.
    pub fn message(self) -> &'static str {
        match self {
            GameOverReason::TooManyMissed => "Game Over: Too Many Missed Crabs!",
            GameOverReason::HitBigBomb => "Game Over: Hit Big Bomb!",
            GameOverReason::Submitted => "Game Over: Score Submitted!",
        }
    }
}

// =============================================================================
// PLAYER NAME
// =============================================================================

/// Longest accepted player name, in characters, after normalization.
pub const MAX_PLAYER_NAME_LEN: usize = 20;

/// Rejected player names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Nothing left after trimming and stripping `@`.
    #[error("player name is empty")]
    Empty,
    /// Longer than [`MAX_PLAYER_NAME_LEN`].
    #[error("player name is {len} characters, limit is {MAX_PLAYER_NAME_LEN}")]
    TooLong {
        /// Normalized length.
        len: usize,
    },
}

/// Normalized player identity.
///
/// Trimmed, one leading `@` removed, lower-cased. `"@CrabKing "` and
/// `"crabking"` are the same player on the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    /// Normalize and validate a raw name.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        let trimmed = raw.trim();
        let stripped = trimmed.strip_prefix('@').unwrap_or(trimmed).trim();
        let normalized = stripped.to_lowercase();

        if normalized.is_empty() {
            return Err(NameError::Empty);
        }

        let len = normalized.chars().count();
        if len > MAX_PLAYER_NAME_LEN {
            return Err(NameError::TooLong { len });
        }

        Ok(Self(normalized))
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PlayerName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PlayerName> for String {
    fn from(name: PlayerName) -> Self {
        name.0
    }
}

// =============================================================================
// RUN STATE
// =============================================================================

/// Everything one run mutates.
///
/// Created on `Idle → Playing`, dropped on restart. Only the simulation step
/// (`game::tick`) and the tap resolver (`game::input`) write to it.
#[derive(Clone, Debug)]
pub struct RunState {
    /// Unique run id
    pub run_id: Uuid,

    /// Run generation; deferred effects from other generations are ignored
    pub generation: u64,

    /// Seed the RNG was created from
    pub seed: u64,

    /// Points, floored at 0
    pub score: u32,

    /// Difficulty level, starts at 1
    pub level: u32,

    /// Crabs that fell past the bottom uncaught
    pub missed: u32,

    /// Applied to every object's base speed
    pub fall_speed_multiplier: f32,

    /// Probability that a spawn is a bomb (capped)
    pub bomb_spawn_chance: f32,

    /// Spawn gate occupancy limit
    pub max_concurrent_objects: u32,

    /// Active-clock time the run started
    pub run_started_at: u64,

    /// Active-clock time the current level started
    pub level_started_at: u64,

    /// Active-clock time of the last spawn
    pub last_spawn_at: Option<u64>,

    /// Manual clear-bombs action still available this level
    pub can_clear_bombs: bool,

    /// Level-up banner visible until this active-clock time
    pub level_up_until: Option<u64>,

    /// Set once a terminal condition fires
    pub game_over: Option<GameOverReason>,

    /// Objects on the field
    pub objects: ObjectStore,

    /// Run RNG
    pub rng: DeterministicRng,

    /// Events produced since the last drain
    events: Vec<GameEvent>,
}

impl RunState {
    /// Fresh run state with the configured starting values.
    pub fn new(config: &RunConfig, generation: u64, seed: u64, now: u64) -> Self {
        Self::with_run_id(Uuid::new_v4(), config, generation, seed, now)
    }

    /// Fresh run state for a known run id.
    pub fn with_run_id(
        run_id: Uuid,
        config: &RunConfig,
        generation: u64,
        seed: u64,
        now: u64,
    ) -> Self {
        Self {
            run_id,
            generation,
            seed,
            score: 0,
            level: 1,
            missed: 0,
            fall_speed_multiplier: config.initial_fall_speed_multiplier,
            bomb_spawn_chance: config.initial_bomb_spawn_chance,
            max_concurrent_objects: config.initial_max_objects,
            run_started_at: now,
            level_started_at: now,
            last_spawn_at: None,
            can_clear_bombs: true,
            level_up_until: None,
            game_over: None,
            objects: ObjectStore::new(),
            rng: DeterministicRng::new(seed),
            events: Vec::new(),
        }
    }

    /// Add points.
    #[inline]
    pub fn add_points(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Remove points, never going below zero.
    #[inline]
    pub fn apply_penalty(&mut self, points: u32) {
        self.score = self.score.saturating_sub(points);
    }

    /// Has a terminal condition fired?
    #[inline]
    pub fn is_over(&self) -> bool {
        self.game_over.is_some()
    }

    /// Is the level-up banner visible at `now`?
    pub fn level_up_visible(&self, now: u64) -> bool {
        self.level_up_until.is_some_and(|until| now < until)
    }

    /// Active time played this run.
    pub fn elapsed_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.run_started_at)
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Record an event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_name_normalization() {
        let a = PlayerName::parse("@CrabKing").unwrap();
        let b = PlayerName::parse("  crabking ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "crabking");
    }

    #[test]
    fn test_player_name_only_one_at_stripped() {
        let name = PlayerName::parse("@@crab").unwrap();
        assert_eq!(name.as_str(), "@crab");
    }

    #[test]
    fn test_player_name_rejects_empty() {
        assert_eq!(PlayerName::parse(""), Err(NameError::Empty));
        assert_eq!(PlayerName::parse("   "), Err(NameError::Empty));
        assert_eq!(PlayerName::parse("@"), Err(NameError::Empty));
    }

    #[test]
    fn test_player_name_length_cap() {
        let twenty = "a".repeat(20);
        assert!(PlayerName::parse(&twenty).is_ok());

        // The @ does not count toward the limit
        assert!(PlayerName::parse(&format!("@{}", twenty)).is_ok());

        let long = "a".repeat(21);
        assert_eq!(PlayerName::parse(&long), Err(NameError::TooLong { len: 21 }));
    }

    #[test]
    fn test_player_name_serde() {
        let name: PlayerName = serde_json::from_str("\"@Crab\"").unwrap();
        assert_eq!(name.as_str(), "crab");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"crab\"");

        assert!(serde_json::from_str::<PlayerName>("\"\"").is_err());
    }

    #[test]
    fn test_new_run_defaults() {
        let config = RunConfig::default();
        let state = RunState::new(&config, 1, 42, 1000);

        assert_eq!(state.score, 0);
        assert_eq!(state.level, 1);
        assert_eq!(state.missed, 0);
        assert_eq!(state.max_concurrent_objects, 5);
        assert_eq!(state.fall_speed_multiplier, 0.5);
        assert_eq!(state.bomb_spawn_chance, 0.2);
        assert!(state.can_clear_bombs);
        assert!(state.objects.is_empty());
        assert_eq!(state.run_started_at, 1000);
        assert_eq!(state.level_started_at, 1000);
        assert!(!state.is_over());
    }

    #[test]
    fn test_penalty_floors_at_zero() {
        let config = RunConfig::default();
        let mut state = RunState::new(&config, 1, 42, 0);

        state.add_points(2);
        state.apply_penalty(4);
        assert_eq!(state.score, 0);

        state.add_points(10);
        state.apply_penalty(4);
        assert_eq!(state.score, 6);
    }

    #[test]
    fn test_level_up_visibility() {
        let config = RunConfig::default();
        let mut state = RunState::new(&config, 1, 42, 0);
        assert!(!state.level_up_visible(0));

        state.level_up_until = Some(2000);
        assert!(state.level_up_visible(1999));
        assert!(!state.level_up_visible(2000));
    }
}
