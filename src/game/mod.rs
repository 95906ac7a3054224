//! Game Logic Module
//!
//! Everything that runs inside a frame.
//!
//! ## Module Structure
//!
//! - `object`: Object kinds and the per-run object arena
//! - `spawn`: Spawn gate and kind/size/speed selection
//! - `state`: Run state, phases, player names
//! - `tick`: Per-frame simulation step and level gating
//! - `input`: Tap hit-testing and tap effects
//! - `timers`: Generation-tagged deferred effects
//! - `events`: Events emitted during a frame
//! - `snapshot`: Immutable view handed to renderers
//! - `run`: Run state machine that owns all of the above

pub mod events;
pub mod input;
pub mod object;
pub mod run;
pub mod snapshot;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod timers;

// Re-export key types
pub use events::{GameEvent, GameEventData};
pub use input::{HitRegion, TapOutcome};
pub use object::{CrabColor, FallingObject, ObjectId, ObjectKind, ObjectStore, Point};
pub use run::{Game, RunError, ScoreReport, SubmissionStatus, SubmissionUpdate};
pub use snapshot::Snapshot;
pub use state::{GameOverReason, Phase, PlayerName, RunState};
pub use tick::{FrameResult, RunConfig};
