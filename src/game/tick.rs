//! Simulation Frame
//!
//! One step of the falling-object simulation. Called once per rendered
//! frame while a run is playing; never while paused.
//!
//! ```text
//!   1. spawn          (gate + Bernoulli trial + kind policy)
//!   2. advance        (y += speed * multiplier)
//!   3. exits          (remove, count neutral misses)
//!   4. miss limit     (→ GameOver, once)
//!   5. level gating   (every level_duration_ms of active time)
//! ```

use serde::{Serialize, Deserialize};

use crate::game::events::GameEvent;
use crate::game::spawn::{maybe_spawn, SpawnConfig};
use crate::game::state::{GameOverReason, RunState};

/// Result of a frame.
#[derive(Debug, Default)]
pub struct FrameResult {
    /// Events generated this frame
    pub events: Vec<GameEvent>,
    /// Set if the run ended this frame
    pub game_over: Option<GameOverReason>,
    /// Whether the level went up this frame
    pub leveled_up: bool,
}

/// Configuration for a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Spawn policy
    pub spawn: SpawnConfig,
    /// Objects whose top edge passes this are gone
    pub bottom_bound: f32,
    /// Tolerance added around every object box when hit-testing
    pub hit_margin: f32,
    /// Misses that end the run
    pub miss_limit: u32,
    /// Active time per level, in milliseconds
    pub level_duration_ms: u64,
    /// Added to the bomb chance on every level-up
    pub bomb_chance_step: f32,
    /// Bomb chance never goes past this
    pub max_bomb_chance: f32,
    /// Multiplier drop from a slow power-up
    pub slow_amount: f32,
    /// Slow power-up never takes the multiplier below this
    pub slow_floor: f32,
    /// How long a slow lasts, in active milliseconds
    pub slow_duration_ms: u64,
    /// How long the level-up banner shows, in active milliseconds
    pub level_up_banner_ms: u64,
    /// Points for catching a crab
    pub neutral_points: u32,
    /// Points lost to a small bomb (score floors at 0)
    pub small_bomb_penalty: u32,
    /// Starting fall speed multiplier
    pub initial_fall_speed_multiplier: f32,
    /// Starting bomb chance
    pub initial_bomb_spawn_chance: f32,
    /// Starting occupancy limit
    pub initial_max_objects: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnConfig::default(),
            bottom_bound: crate::FIELD_HEIGHT,
            hit_margin: 10.0,
            miss_limit: 50,
            level_duration_ms: 30_000,
            bomb_chance_step: 0.05,
            max_bomb_chance: 0.4,
            slow_amount: 0.3,
            slow_floor: 0.5,
            slow_duration_ms: 5_000,
            level_up_banner_ms: 2_000,
            neutral_points: 2,
            small_bomb_penalty: 4,
            initial_fall_speed_multiplier: 0.5,
            initial_bomb_spawn_chance: 0.2,
            initial_max_objects: 5,
        }
    }
}

/// Run one simulation frame at active-clock time `now`.
///
/// Does nothing once the run is over, so the miss-limit transition fires at
/// most once and nothing mutates the score afterwards.
pub fn advance_frame(state: &mut RunState, now: u64, config: &RunConfig) -> FrameResult {
    let mut result = FrameResult::default();

    if state.is_over() {
        result.game_over = state.game_over;
        return result;
    }

    // 1. Spawn
    maybe_spawn(state, now, &config.spawn);

    // 2. Advance
    state.objects.advance_all(state.fall_speed_multiplier);

    // 3. Exits, 4. miss limit
    process_exits(state, now, config);

    if let Some(reason) = state.game_over {
        result.game_over = Some(reason);
        result.events = state.take_events();
        return result;
    }

    // 5. Level gating
    result.leveled_up = maybe_level_up(state, now, config);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        now,
        objects = state.objects.len(),
        score = state.score,
        missed = state.missed,
        multiplier = state.fall_speed_multiplier,
        "frame"
    );

    result.events = state.take_events();
    result
}

/// Remove objects past the bottom bound and count neutral misses.
///
/// Exits are processed oldest first. Once the miss limit is reached no
/// further misses are counted, but every exited object is still removed.
fn process_exits(state: &mut RunState, now: u64, config: &RunConfig) {
    for object in state.objects.take_exited(config.bottom_bound) {
        let counted = object.kind.is_neutral() && !state.is_over();
        if counted {
            state.missed += 1;
        }

        state.push_event(GameEvent::object_exited(
            now,
            object.id,
            object.kind,
            counted,
            state.missed,
        ));

        if counted && state.missed >= config.miss_limit {
            state.game_over = Some(GameOverReason::TooManyMissed);
            state.push_event(GameEvent::game_over(
                now,
                GameOverReason::TooManyMissed,
                state.score,
                state.level,
            ));
            tracing::info!(score = state.score, level = state.level, "miss limit reached");
        }
    }
}

/// Apply a level-up if a full level duration of active time has passed.
fn maybe_level_up(state: &mut RunState, now: u64, config: &RunConfig) -> bool {
    if now.saturating_sub(state.level_started_at) < config.level_duration_ms {
        return false;
    }

    state.level += 1;
    state.fall_speed_multiplier = 0.5 * (state.level + 1) as f32;
    state.bomb_spawn_chance =
        (state.bomb_spawn_chance + config.bomb_chance_step).min(config.max_bomb_chance);
    if state.level % 3 == 0 {
        state.max_concurrent_objects += 1;
    }
    state.level_started_at = now;
    state.can_clear_bombs = true;
    state.level_up_until = Some(now + config.level_up_banner_ms);

    state.push_event(GameEvent::level_up(
        now,
        state.level,
        state.fall_speed_multiplier,
        state.bomb_spawn_chance,
        state.max_concurrent_objects,
    ));
    tracing::info!(
        level = state.level,
        multiplier = state.fall_speed_multiplier,
        bomb_chance = state.bomb_spawn_chance,
        max_objects = state.max_concurrent_objects,
        "level up"
    );

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::GameEventData;
    use crate::game::object::{CrabColor, ObjectKind, Point};
    use proptest::prelude::*;

    fn quiet_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.spawn.spawn_chance = 0.0;
        config
    }

    fn crab() -> ObjectKind {
        ObjectKind::Crab(CrabColor::Purple)
    }

    #[test]
    fn test_objects_fall_by_multiplier() {
        let config = quiet_config();
        let mut state = RunState::new(&config, 1, 1, 0);
        let id = state.objects.insert(crab(), Point::new(10.0, 0.0), 4.0);

        advance_frame(&mut state, 16, &config);

        assert_eq!(state.objects.get(id).unwrap().position.y, 2.0);
    }

    #[test]
    fn test_only_neutrals_count_as_missed() {
        let config = quiet_config();
        let mut state = RunState::new(&config, 1, 1, 0);
        state.objects.insert(crab(), Point::new(0.0, 449.5), 4.0);
        state.objects.insert(ObjectKind::BigBomb, Point::new(0.0, 449.5), 4.0);
        state.objects.insert(ObjectKind::PowerSlow, Point::new(0.0, 449.5), 4.0);

        let result = advance_frame(&mut state, 16, &config);

        assert_eq!(state.missed, 1);
        assert!(state.objects.is_empty());
        let exits = result
            .events
            .iter()
            .filter(|e| matches!(e.data, GameEventData::ObjectExited { .. }))
            .count();
        assert_eq!(exits, 3);
    }

    #[test]
    fn test_fiftieth_miss_ends_run() {
        let config = quiet_config();
        let mut state = RunState::new(&config, 1, 1, 0);
        state.missed = 48;

        state.objects.insert(crab(), Point::new(0.0, 449.5), 4.0);
        let result = advance_frame(&mut state, 16, &config);
        assert_eq!(state.missed, 49);
        assert!(result.game_over.is_none());

        state.objects.insert(crab(), Point::new(0.0, 449.5), 4.0);
        let result = advance_frame(&mut state, 32, &config);
        assert_eq!(state.missed, 50);
        assert_eq!(result.game_over, Some(GameOverReason::TooManyMissed));
    }

    #[test]
    fn test_miss_limit_caps_counter_within_frame() {
        let config = quiet_config();
        let mut state = RunState::new(&config, 1, 1, 0);
        state.missed = 49;

        for _ in 0..4 {
            state.objects.insert(crab(), Point::new(0.0, 449.5), 4.0);
        }
        let result = advance_frame(&mut state, 16, &config);

        assert_eq!(state.missed, 50);
        assert!(state.objects.is_empty());
        let overs = result.events.iter().filter(|e| e.is_game_over()).count();
        assert_eq!(overs, 1);
    }

    #[test]
    fn test_no_updates_after_game_over() {
        let config = RunConfig::default();
        let mut state = RunState::new(&config, 1, 1, 0);
        state.game_over = Some(GameOverReason::HitBigBomb);
        let id = state.objects.insert(crab(), Point::new(0.0, 100.0), 4.0);

        let result = advance_frame(&mut state, 60_000, &config);

        assert_eq!(result.game_over, Some(GameOverReason::HitBigBomb));
        assert_eq!(state.objects.get(id).unwrap().position.y, 100.0);
        assert_eq!(state.level, 1);
    }

    #[test]
    fn test_level_up_progression() {
        let config = quiet_config();
        let mut state = RunState::new(&config, 1, 1, 0);
        state.can_clear_bombs = false;

        assert!(!advance_frame(&mut state, 29_999, &config).leveled_up);

        let result = advance_frame(&mut state, 30_000, &config);
        assert!(result.leveled_up);
        assert_eq!(state.level, 2);
        assert_eq!(state.fall_speed_multiplier, 1.5);
        assert!((state.bomb_spawn_chance - 0.25).abs() < 1e-6);
        assert_eq!(state.max_concurrent_objects, 5);
        assert!(state.can_clear_bombs);
        assert_eq!(state.level_started_at, 30_000);
        assert_eq!(state.level_up_until, Some(32_000));

        advance_frame(&mut state, 60_000, &config);
        assert_eq!(state.level, 3);
        assert_eq!(state.fall_speed_multiplier, 2.0);
        assert_eq!(state.max_concurrent_objects, 6);
    }

    #[test]
    fn test_bomb_chance_capped() {
        let config = quiet_config();
        let mut state = RunState::new(&config, 1, 1, 0);

        for level in 1..=10u64 {
            advance_frame(&mut state, level * 30_000, &config);
        }

        assert_eq!(state.level, 11);
        assert_eq!(state.bomb_spawn_chance, 0.4);
    }

    #[test]
    fn test_one_level_per_window() {
        let config = quiet_config();
        let mut state = RunState::new(&config, 1, 1, 0);

        // A single late frame still only gains one level
        advance_frame(&mut state, 95_000, &config);
        assert_eq!(state.level, 2);
    }

    proptest! {
        #[test]
        fn prop_missed_and_level_monotonic(seed in any::<u64>(), frames in 1usize..3000) {
            let config = RunConfig::default();
            let mut state = RunState::new(&config, 1, seed, 0);
            let (mut missed, mut level) = (0, 1);

            for frame in 1..=frames {
                let result = advance_frame(&mut state, frame as u64 * 16, &config);
                prop_assert!(state.missed >= missed);
                prop_assert!(state.level >= level);
                prop_assert!(state.missed <= config.miss_limit);
                missed = state.missed;
                level = state.level;
                if result.game_over.is_some() {
                    prop_assert_eq!(state.missed, config.miss_limit);
                    break;
                }
            }
        }
    }
}
