//! Run State Machine
//!
//! [`Game`] owns the phase, the active-play clock, the current run and its
//! deferred effects. It is the only way in: taps and frames are routed by
//! phase, so the simulation and the tap resolver never run while paused,
//! in a menu or after the run ended.
//!
//! ```text
//!              show_how_to_play
//!     ┌──────────────────────────────┐
//!     ▼          back (tap/button)   │
//!  HowToPlay ─────────────────────► Idle ──start(name)──► Playing ◄──┐
//!                                    ▲                      │   │    │ toggle_pause
//!                                    │                      │   └──► Paused
//!                                    │ restart (tap)        │          │
//!                                    │                      ▼          │
//!                                 GameOver ◄────────────────┴──────────┘
//!                                          miss limit / big bomb / submit_now
//! ```

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::clock::ActiveClock;
use crate::core::rng::derive_run_seed;
use crate::game::events::GameEvent;
use crate::game::input::{self, TapOutcome};
use crate::game::object::Point;
use crate::game::snapshot::Snapshot;
use crate::game::state::{GameOverReason, NameError, Phase, PlayerName, RunState};
use crate::game::tick::{advance_frame, RunConfig};
use crate::game::timers::{TimedEffect, TimerQueue};

/// Errors from run state machine actions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    /// The start action needs a usable player name.
    #[error("invalid player name: {0}")]
    InvalidPlayerName(#[from] NameError),

    /// The action is not available in the current phase.
    #[error("cannot {action} while {}", from.as_str())]
    InvalidTransition {
        /// Phase the action was attempted in
        from: Phase,
        /// Action name
        action: &'static str,
    },
}

/// A finished run, ready to be submitted once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Who played
    pub player: PlayerName,
    /// Final score
    pub score: u32,
    /// Final level
    pub level: u32,
    /// Why the run ended
    pub reason: GameOverReason,
    /// Run id
    pub run_id: Uuid,
    /// Run generation, echoed back on status updates
    pub generation: u64,
}

/// Progress of the score submission for the current run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// Proof generation or upload underway
    InProgress(String),
    /// Leaderboard accepted the score
    Succeeded(String),
    /// Submission failed; the run stays over, nothing is retried
    Failed(String),
}

impl SubmissionStatus {
    /// Text for the status line, if any.
    pub fn display(&self) -> Option<String> {
        match self {
            SubmissionStatus::Idle => None,
            SubmissionStatus::InProgress(msg) | SubmissionStatus::Succeeded(msg) => {
                Some(msg.clone())
            }
            SubmissionStatus::Failed(msg) => Some(format!("Error: {}", msg)),
        }
    }
}

/// Status update for the run of a given generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionUpdate {
    /// Generation of the run the update is about
    pub generation: u64,
    /// New status
    pub status: SubmissionStatus,
}

/// How a tap was routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapRoute {
    /// Queued for resolution in the next frame
    Queued,
    /// Paused or in a phase that ignores taps
    Ignored,
    /// Landed on the back button of the instructions screen
    BackToMenu,
    /// Restart gesture on the game-over screen
    Restarted,
}

/// What one call to [`Game::frame`] did.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Active-clock time after the frame
    pub now_ms: u64,
    /// Everything that happened, in order
    pub events: Vec<GameEvent>,
    /// Outcome of each queued tap, in arrival order
    pub taps: Vec<TapOutcome>,
    /// Set if the run ended during this frame
    pub game_over: Option<GameOverReason>,
}

/// The game: phase, clock, current run and its deferred effects.
#[derive(Debug)]
pub struct Game {
    config: RunConfig,
    phase: Phase,
    clock: ActiveClock,
    generation: u64,
    base_seed: Option<u64>,
    player: Option<PlayerName>,
    run: Option<RunState>,
    timers: TimerQueue,
    pending_taps: VecDeque<Point>,
    pending_report: Option<ScoreReport>,
    submission: SubmissionStatus,
    events: Vec<GameEvent>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl Game {
    /// New game at the menu. Each run is seeded from the player and run id.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            clock: ActiveClock::new(),
            generation: 1,
            base_seed: None,
            player: None,
            run: None,
            timers: TimerQueue::new(),
            pending_taps: VecDeque::new(),
            pending_report: None,
            submission: SubmissionStatus::Idle,
            events: Vec::new(),
        }
    }

    /// New game whose runs are seeded from `seed`, for replays and tests.
    pub fn with_seed(config: RunConfig, seed: u64) -> Self {
        Self {
            base_seed: Some(seed),
            ..Self::new(config)
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current run generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Active-clock reading.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Gameplay constants.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The current run, if one has started.
    pub fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    /// Player of the current or last run.
    pub fn player(&self) -> Option<&PlayerName> {
        self.player.as_ref()
    }

    /// Submission progress of the current run.
    pub fn submission_status(&self) -> &SubmissionStatus {
        &self.submission
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Idle → Playing with a fresh run.
    ///
    /// An unusable name leaves everything as it was.
    pub fn start(&mut self, raw_name: &str) -> Result<(), RunError> {
        self.require(Phase::Idle, "start")?;
        let player = PlayerName::parse(raw_name)?;

        let now = self.clock.now_ms();
        let run_id = Uuid::new_v4();
        let seed = match self.base_seed {
            Some(base) => base.wrapping_add(self.generation),
            None => derive_run_seed(player.as_str(), run_id.as_bytes()),
        };

        self.run = Some(RunState::with_run_id(
            run_id,
            &self.config,
            self.generation,
            seed,
            now,
        ));
        info!(player = %player, %run_id, generation = self.generation, "run started");
        self.player = Some(player);
        self.submission = SubmissionStatus::Idle;
        self.set_phase(Phase::Playing);

        Ok(())
    }

    /// Idle → HowToPlay.
    pub fn show_how_to_play(&mut self) -> Result<(), RunError> {
        self.require(Phase::Idle, "show instructions")?;
        self.set_phase(Phase::HowToPlay);
        Ok(())
    }

    /// HowToPlay → Idle.
    pub fn back_to_menu(&mut self) -> Result<(), RunError> {
        self.require(Phase::HowToPlay, "go back")?;
        self.set_phase(Phase::Idle);
        Ok(())
    }

    /// Playing ⇄ Paused. Nothing else changes.
    pub fn toggle_pause(&mut self) -> Result<Phase, RunError> {
        match self.phase {
            Phase::Playing => {
                self.pending_taps.clear();
                self.set_phase(Phase::Paused);
            }
            Phase::Paused => self.set_phase(Phase::Playing),
            from => {
                return Err(RunError::InvalidTransition {
                    from,
                    action: "toggle pause",
                })
            }
        }
        Ok(self.phase)
    }

    /// Player ends the run early; it counts as a completed run.
    pub fn submit_now(&mut self) -> Result<(), RunError> {
        match self.phase {
            Phase::Playing | Phase::Paused => {
                self.enter_game_over(GameOverReason::Submitted);
                Ok(())
            }
            from => Err(RunError::InvalidTransition {
                from,
                action: "submit",
            }),
        }
    }

    /// GameOver → Idle. Discards the run and invalidates its deferred effects.
    pub fn restart(&mut self) -> Result<(), RunError> {
        self.require(Phase::GameOver, "restart")?;

        self.generation += 1;
        self.timers.retain_generation(self.generation);
        self.run = None;
        self.pending_taps.clear();
        self.pending_report = None;
        self.submission = SubmissionStatus::Idle;
        self.set_phase(Phase::Idle);

        debug!(generation = self.generation, "run reset");
        Ok(())
    }

    /// Manual clear-bombs action, once per level.
    pub fn clear_bombs(&mut self) -> Result<Option<usize>, RunError> {
        self.require(Phase::Playing, "clear bombs")?;
        let now = self.clock.now_ms();
        Ok(self.run.as_mut().and_then(|run| input::clear_bombs(run, now)))
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Route a tap in play-field coordinates.
    ///
    /// While playing the tap is queued and resolved at the start of the next
    /// frame, against the positions of the last snapshot. Paused taps are
    /// dropped.
    pub fn tap(&mut self, point: Point) -> TapRoute {
        match self.phase {
            Phase::Playing => {
                self.pending_taps.push_back(point);
                TapRoute::Queued
            }
            Phase::HowToPlay if crate::layout::BACK_BUTTON.contains(point) => {
                self.set_phase(Phase::Idle);
                TapRoute::BackToMenu
            }
            Phase::GameOver => match self.restart() {
                Ok(()) => TapRoute::Restarted,
                Err(_) => TapRoute::Ignored,
            },
            Phase::Idle | Phase::HowToPlay | Phase::Paused => TapRoute::Ignored,
        }
    }

    // =========================================================================
    // FRAME
    // =========================================================================

    /// Advance one rendered frame of `dt_ms` milliseconds.
    ///
    /// Outside `Playing` this only drains transition events: the clock does
    /// not move, so pause freezes spawning, falling, level timing and every
    /// deferred effect alike.
    pub fn frame(&mut self, dt_ms: u64) -> FrameReport {
        let mut report = FrameReport::default();

        if self.phase != Phase::Playing {
            report.now_ms = self.clock.now_ms();
            report.events = self.take_events();
            return report;
        }

        let now = self.clock.advance(dt_ms);
        report.now_ms = now;

        let Some(run) = self.run.as_mut() else {
            report.events = self.take_events();
            return report;
        };

        // Deferred effects first, so a revert due now applies to this frame
        for event in self.timers.pop_due(now, self.generation) {
            apply_timed_effect(run, event.effect, now);
        }

        // Taps hit-test the positions the player last saw, before anything moves
        if self.resolve_pending_taps(now, &mut report) {
            report.events = self.take_events();
            return report;
        }

        let Some(run) = self.run.as_mut() else {
            report.events = self.take_events();
            return report;
        };
        let result = advance_frame(run, now, &self.config);
        self.events.extend(result.events);

        if result.leveled_up {
            self.timers.schedule(
                now + self.config.level_up_banner_ms,
                self.generation,
                TimedEffect::ClearLevelUpBanner,
            );
        }

        if let Some(reason) = result.game_over {
            self.enter_game_over(reason);
            report.game_over = Some(reason);
        }

        report.events = self.take_events();
        report
    }

    /// Resolve every queued tap in arrival order. Returns `true` if a tap
    /// ended the run; the remaining taps are dropped.
    fn resolve_pending_taps(&mut self, now: u64, report: &mut FrameReport) -> bool {
        while let Some(point) = self.pending_taps.pop_front() {
            let Some(run) = self.run.as_mut() else { break };
            let outcome = input::resolve_tap(run, point, now, &self.config);
            self.events.extend(run.take_events());
            report.taps.push(outcome);

            match outcome {
                TapOutcome::Slowed { amount, .. } if amount > 0.0 => {
                    self.timers.schedule(
                        now + self.config.slow_duration_ms,
                        self.generation,
                        TimedEffect::RevertSlow { amount },
                    );
                }
                TapOutcome::HitBigBomb { .. } => {
                    self.enter_game_over(GameOverReason::HitBigBomb);
                    report.game_over = Some(GameOverReason::HitBigBomb);
                    return true;
                }
                _ => {}
            }
        }
        false
    }

    /// Events from transitions made outside [`Game::frame`].
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // SCORE SUBMISSION
    // =========================================================================

    /// The finished run's report. Handed out once per game over.
    pub fn take_score_report(&mut self) -> Option<ScoreReport> {
        self.pending_report.take()
    }

    /// Apply a submission status update. Updates about any run other than
    /// the current one are ignored.
    pub fn apply_submission_update(&mut self, update: SubmissionUpdate) -> bool {
        if update.generation != self.generation || self.phase != Phase::GameOver {
            debug!(
                update = update.generation,
                current = self.generation,
                "ignoring submission update for another run"
            );
            return false;
        }

        info!(status = ?update.status, "submission status");
        self.submission = update.status;
        true
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// Owned copy of the drawable state.
    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock.now_ms();
        let mut snapshot = Snapshot::idle(now, self.config.miss_limit);
        snapshot.phase = self.phase;
        snapshot.player = self.player.as_ref().map(|p| p.to_string());
        snapshot.submission_status = self.submission.display();

        if let Some(run) = &self.run {
            snapshot.objects = run.objects.to_vec();
            snapshot.score = run.score;
            snapshot.level = run.level;
            snapshot.missed = run.missed;
            snapshot.run_elapsed_ms = run.elapsed_ms(now);
            snapshot.can_clear_bombs = run.can_clear_bombs;
            snapshot.show_level_up = run.level_up_visible(now);
            snapshot.level_up_until = run.level_up_until;
            snapshot.game_over_reason = run.game_over;
            snapshot.game_over_message = run.game_over.map(|r| r.message().to_string());
        }

        snapshot
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), RunError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(RunError::InvalidTransition {
                from: self.phase,
                action,
            })
        }
    }

    fn set_phase(&mut self, new_phase: Phase) {
        let old_phase = self.phase;
        if old_phase == new_phase {
            return;
        }
        self.phase = new_phase;
        self.events
            .push(GameEvent::phase_changed(self.clock.now_ms(), old_phase, new_phase));
        debug!(from = old_phase.as_str(), to = new_phase.as_str(), "phase changed");
    }

    fn enter_game_over(&mut self, reason: GameOverReason) {
        let now = self.clock.now_ms();
        self.pending_taps.clear();

        if let Some(run) = self.run.as_mut() {
            if run.game_over.is_none() {
                run.game_over = Some(reason);
                run.push_event(GameEvent::game_over(now, reason, run.score, run.level));
            }
            self.events.extend(run.take_events());

            if let Some(player) = &self.player {
                self.pending_report = Some(ScoreReport {
                    player: player.clone(),
                    score: run.score,
                    level: run.level,
                    reason,
                    run_id: run.run_id,
                    generation: self.generation,
                });
            }

            info!(
                reason = reason.message(),
                score = run.score,
                level = run.level,
                missed = run.missed,
                "game over"
            );
        }

        self.set_phase(Phase::GameOver);
    }

    #[cfg(test)]
    pub(crate) fn run_mut(&mut self) -> Option<&mut RunState> {
        self.run.as_mut()
    }
}

fn apply_timed_effect(run: &mut RunState, effect: TimedEffect, now: u64) {
    match effect {
        TimedEffect::RevertSlow { amount } => {
            let old = run.fall_speed_multiplier;
            run.fall_speed_multiplier += amount;
            run.push_event(GameEvent::speed_changed(now, old, run.fall_speed_multiplier));
        }
        TimedEffect::ClearLevelUpBanner => {
            if run.level_up_until.is_some_and(|until| until <= now) {
                run.level_up_until = None;
            }
        }
    }
}
