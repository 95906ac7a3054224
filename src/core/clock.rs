//! Active-Play Clock
//!
//! Millisecond clock that only advances when the owner says so. The run
//! state machine advances it once per `Playing` frame, so time spent paused,
//! in menus or on the game-over screen never counts toward level duration,
//! spawn intervals or power-up expiry.

use serde::{Serialize, Deserialize};

/// Monotonic active-play clock in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveClock {
    elapsed_ms: u64,
}

impl ActiveClock {
    /// Clock at zero.
    pub const fn new() -> Self {
        Self { elapsed_ms: 0 }
    }

    /// Current reading.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Advance by one frame's worth of time and return the new reading.
    #[inline]
    pub fn advance(&mut self, dt_ms: u64) -> u64 {
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        self.elapsed_ms
    }
}
