//! # Falling Crabs
//!
//! Falling-object arcade simulation with a proof-checked leaderboard.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FALLING CRABS                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  └── clock.rs    - Active-play clock (frozen while paused)   │
//! │                                                              │
//! │  game/           - Simulation and run state machine          │
//! │  ├── object.rs   - Object kinds and the object arena         │
//! │  ├── spawn.rs    - Spawn gate and kind selection             │
//! │  ├── state.rs    - Run state, phases, player names           │
//! │  ├── tick.rs     - Per-frame simulation step                 │
//! │  ├── input.rs    - Tap hit-testing and effects               │
//! │  ├── timers.rs   - Generation-tagged deferred effects        │
//! │  ├── events.rs   - Per-frame event log                       │
//! │  ├── snapshot.rs - Read-only view for renderers              │
//! │  └── run.rs      - Idle/HowToPlay/Playing/Paused/GameOver    │
//! │                                                              │
//! │  proof/          - Placeholder proof of computation          │
//! │  leaderboard/    - Best-score-per-player table               │
//! │  network/        - WebSocket leaderboard server and client   │
//! │  report.rs       - Fire-and-forget score submission          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frame Model
//!
//! The simulation is single-threaded and advanced one frame at a time by
//! [`game::run::Game::frame`]. Every timer in a run (spawn interval, level
//! duration, power-up revert, level-up banner) reads the active-play clock,
//! which only moves while the run is in `Playing`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod leaderboard;
pub mod network;
pub mod proof;
pub mod report;

// Re-export commonly used types
pub use core::clock::ActiveClock;
pub use core::rng::DeterministicRng;
pub use game::object::{FallingObject, ObjectId, ObjectKind, ObjectStore, Point};
pub use game::run::{Game, RunError, ScoreReport};
pub use game::snapshot::Snapshot;
pub use game::state::{GameOverReason, Phase, PlayerName, RunState};
pub use game::tick::RunConfig;
pub use leaderboard::{LeaderboardEntry, LeaderboardService, LeaderboardStore};
pub use report::{LeaderboardClient, LocalLeaderboard, ScoreReporter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal render rate (Hz) used by the headless demo.
pub const FRAME_RATE: u32 = 60;

/// Play-field width in abstract units.
pub const FIELD_WIDTH: f32 = 600.0;

/// Play-field height in abstract units. Objects past this line have exited.
pub const FIELD_HEIGHT: f32 = 450.0;

/// Fixed screen regions the presentation layer draws and the run state
/// machine hit-tests against.
pub mod layout {
    use crate::game::input::HitRegion;

    /// "Back" button on the how-to-play screen.
    pub const BACK_BUTTON: HitRegion = HitRegion::new(225.0, 352.5, 375.0, 397.5);
}
