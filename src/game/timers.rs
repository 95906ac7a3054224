//! Deferred Effects
//!
//! Effects that fire some active-play time after they were caused: the slow
//! power-up revert and the level-up banner expiry.
//!
//! Every scheduled event carries the run generation it was created in. A
//! restart bumps the generation, so an event left over from an earlier run
//! is dropped when it comes due instead of touching the fresh run.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

/// What a deferred event does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimedEffect {
    /// Add back the multiplier a slow power-up took away.
    RevertSlow {
        /// Amount to add back
        amount: f32,
    },
    /// Hide the level-up banner.
    ClearLevelUpBanner,
}

/// An effect due at a point on the active-play clock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Active-clock time the event fires at
    pub due_at: u64,
    /// Run generation that scheduled it
    pub generation: u64,
    /// What to do
    pub effect: TimedEffect,
}

/// Pending deferred events, ordered by due time then scheduling order.
#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    pending: BTreeMap<(u64, u64), ScheduledEvent>,
    next_seq: u64,
}

impl TimerQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events still waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// No events waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedule `effect` at `due_at` for `generation`.
    pub fn schedule(&mut self, due_at: u64, generation: u64, effect: TimedEffect) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            (due_at, seq),
            ScheduledEvent {
                due_at,
                generation,
                effect,
            },
        );
    }

    /// Remove and return every event due at or before `now` that belongs to
    /// `generation`, in due order. Due events from other generations are
    /// discarded.
    pub fn pop_due(&mut self, now: u64, generation: u64) -> Vec<ScheduledEvent> {
        let later = self.pending.split_off(&(now.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.pending, later);

        due.into_values()
            .filter(|event| {
                let current = event.generation == generation;
                if !current {
                    tracing::debug!(
                        stale = event.generation,
                        current = generation,
                        effect = ?event.effect,
                        "dropping deferred effect from earlier run"
                    );
                }
                current
            })
            .collect()
    }

    /// Drop everything scheduled for generations other than `generation`.
    pub fn retain_generation(&mut self, generation: u64) {
        self.pending.retain(|_, event| event.generation == generation);
    }
}
