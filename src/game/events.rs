//! Game Events
//!
//! Everything that happened during a frame, in the order it happened.
//! Presentation and audio layers consume these instead of diffing snapshots.

use serde::{Serialize, Deserialize};

use crate::game::object::{ObjectId, ObjectKind, Point};
use crate::game::state::{GameOverReason, Phase};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventData {
    /// A new object entered at the top of the field
    ObjectSpawned {
        object_id: ObjectId,
        kind: ObjectKind,
        position: Point,
        speed: f32,
    },

    /// An object left the bottom of the field
    ObjectExited {
        object_id: ObjectId,
        kind: ObjectKind,
        /// Whether it counted toward the miss limit
        counted_as_miss: bool,
        missed: u32,
    },

    /// A tap resolved against an object
    ObjectTapped {
        object_id: ObjectId,
        kind: ObjectKind,
        new_score: u32,
    },

    /// Bombs removed by a clear power-up or the manual action
    BombsCleared {
        removed: usize,
        /// True for the once-per-level manual action
        manual: bool,
    },

    /// Slow power-up applied or reverted
    SpeedChanged {
        old_multiplier: f32,
        new_multiplier: f32,
    },

    /// Difficulty went up
    LevelUp {
        level: u32,
        fall_speed_multiplier: f32,
        bomb_spawn_chance: f32,
        max_concurrent_objects: u32,
    },

    /// Run state machine moved
    PhaseChanged {
        old_phase: Phase,
        new_phase: Phase,
    },

    /// Run ended
    GameOver {
        reason: GameOverReason,
        score: u32,
        level: u32,
    },
}

/// A game event stamped with the active-clock time it happened at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Active-clock milliseconds
    pub at_ms: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(at_ms: u64, data: GameEventData) -> Self {
        Self { at_ms, data }
    }

    /// Create object spawned event.
    pub fn object_spawned(
        at_ms: u64,
        object_id: ObjectId,
        kind: ObjectKind,
        position: Point,
        speed: f32,
    ) -> Self {
        Self::new(
            at_ms,
            GameEventData::ObjectSpawned {
                object_id,
                kind,
                position,
                speed,
            },
        )
    }

    /// Create object exited event.
    pub fn object_exited(
        at_ms: u64,
        object_id: ObjectId,
        kind: ObjectKind,
        counted_as_miss: bool,
        missed: u32,
    ) -> Self {
        Self::new(
            at_ms,
            GameEventData::ObjectExited {
                object_id,
                kind,
                counted_as_miss,
                missed,
            },
        )
    }

    /// Create object tapped event.
    pub fn object_tapped(at_ms: u64, object_id: ObjectId, kind: ObjectKind, new_score: u32) -> Self {
        Self::new(
            at_ms,
            GameEventData::ObjectTapped {
                object_id,
                kind,
                new_score,
            },
        )
    }

    /// Create bombs cleared event.
    pub fn bombs_cleared(at_ms: u64, removed: usize, manual: bool) -> Self {
        Self::new(at_ms, GameEventData::BombsCleared { removed, manual })
    }

    /// Create speed changed event.
    pub fn speed_changed(at_ms: u64, old_multiplier: f32, new_multiplier: f32) -> Self {
        Self::new(
            at_ms,
            GameEventData::SpeedChanged {
                old_multiplier,
                new_multiplier,
            },
        )
    }

    /// Create level up event.
    pub fn level_up(
        at_ms: u64,
        level: u32,
        fall_speed_multiplier: f32,
        bomb_spawn_chance: f32,
        max_concurrent_objects: u32,
    ) -> Self {
        Self::new(
            at_ms,
            GameEventData::LevelUp {
                level,
                fall_speed_multiplier,
                bomb_spawn_chance,
                max_concurrent_objects,
            },
        )
    }

    /// Create phase changed event.
    pub fn phase_changed(at_ms: u64, old_phase: Phase, new_phase: Phase) -> Self {
        Self::new(at_ms, GameEventData::PhaseChanged { old_phase, new_phase })
    }

    /// Create game over event.
    pub fn game_over(at_ms: u64, reason: GameOverReason, score: u32, level: u32) -> Self {
        Self::new(at_ms, GameEventData::GameOver { reason, score, level })
    }

    /// Is this the terminal event of a run?
    pub fn is_game_over(&self) -> bool {
        matches!(self.data, GameEventData::GameOver { .. })
    }
}
