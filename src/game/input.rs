//! Tap Resolution
//!
//! Maps a tap in play-field coordinates to at most one falling object and
//! applies that object's effect to the run.
//!
//! ```text
//!   tap (x, y)
//!       │
//!       ▼
//!   scan newest → oldest ──► first box (expanded by margin) containing tap
//!       │                          │
//!       │ none                     ▼
//!       ▼                   remove object, apply exactly one effect
//!   TapOutcome::Nothing
//! ```

use serde::{Serialize, Deserialize};

use crate::game::events::GameEvent;
use crate::game::object::{ObjectId, ObjectKind, ObjectStore, Point};
use crate::game::state::{GameOverReason, RunState};
use crate::game::tick::RunConfig;

// =============================================================================
// HIT REGIONS
// =============================================================================

/// Axis-aligned rectangle in play-field coordinates, edges inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitRegion {
    /// Left edge
    pub left: f32,
    /// Top edge
    pub top: f32,
    /// Right edge
    pub right: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl HitRegion {
    /// Create a region from its edges.
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Does the region contain `point`?
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.top
            && point.y <= self.bottom
    }

    /// The region grown by `margin` on every side.
    #[inline]
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            left: self.left - margin,
            top: self.top - margin,
            right: self.right + margin,
            bottom: self.bottom + margin,
        }
    }
}

// =============================================================================
// TAP OUTCOMES
// =============================================================================

/// What a single tap did to the run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TapOutcome {
    /// No object under the tap.
    Nothing,
    /// Neutral object caught.
    Scored {
        /// Object that was removed
        object_id: ObjectId,
        /// Points added
        points: u32,
    },
    /// Small bomb tapped.
    Penalized {
        /// Object that was removed
        object_id: ObjectId,
        /// Points actually removed after the zero floor
        points: u32,
    },
    /// Slow power-up tapped.
    Slowed {
        /// Object that was removed
        object_id: ObjectId,
        /// How much the multiplier actually dropped; the revert adds this back
        amount: f32,
    },
    /// Clear power-up tapped.
    ClearedBombs {
        /// Object that was removed
        object_id: ObjectId,
        /// Bombs removed alongside it
        removed: usize,
    },
    /// Big bomb tapped. The run is over.
    HitBigBomb {
        /// Object that was removed
        object_id: ObjectId,
    },
}

impl TapOutcome {
    /// The object the tap removed, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        match *self {
            TapOutcome::Nothing => None,
            TapOutcome::Scored { object_id, .. }
            | TapOutcome::Penalized { object_id, .. }
            | TapOutcome::Slowed { object_id, .. }
            | TapOutcome::ClearedBombs { object_id, .. }
            | TapOutcome::HitBigBomb { object_id } => Some(object_id),
        }
    }

    /// Did the tap end the run?
    pub fn is_terminal(&self) -> bool {
        matches!(self, TapOutcome::HitBigBomb { .. })
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Find the object a tap lands on.
///
/// Scans newest first, so on overlap the most recently spawned object (the
/// one drawn on top) wins.
pub fn find_hit(objects: &ObjectStore, point: Point, margin: f32) -> Option<ObjectId> {
    objects
        .iter_newest_first()
        .find(|object| object.bounds().expanded(margin).contains(point))
        .map(|object| object.id)
}

/// Resolve one tap against the run.
///
/// Removes at most one object and applies exactly one effect. Callers must
/// only invoke this while the run is playing; [`crate::game::Game`] routes
/// taps by phase so nothing else can reach it.
pub fn resolve_tap(state: &mut RunState, point: Point, now: u64, config: &RunConfig) -> TapOutcome {
    if state.is_over() {
        return TapOutcome::Nothing;
    }

    let Some(object_id) = find_hit(&state.objects, point, config.hit_margin) else {
        return TapOutcome::Nothing;
    };
    let Some(object) = state.objects.remove(object_id) else {
        return TapOutcome::Nothing;
    };

    let outcome = match object.kind {
        ObjectKind::BigBomb => {
            state.game_over = Some(GameOverReason::HitBigBomb);
            TapOutcome::HitBigBomb { object_id }
        }
        ObjectKind::SmallBomb => {
            let before = state.score;
            state.apply_penalty(config.small_bomb_penalty);
            TapOutcome::Penalized {
                object_id,
                points: before - state.score,
            }
        }
        ObjectKind::PowerSlow => {
            let old = state.fall_speed_multiplier;
            let new = (old - config.slow_amount).max(config.slow_floor).min(old);
            state.fall_speed_multiplier = new;
            if new != old {
                state.push_event(GameEvent::speed_changed(now, old, new));
            }
            TapOutcome::Slowed {
                object_id,
                amount: old - new,
            }
        }
        ObjectKind::PowerClear => {
            let removed = state.objects.remove_bombs();
            state.push_event(GameEvent::bombs_cleared(now, removed, false));
            TapOutcome::ClearedBombs { object_id, removed }
        }
        ObjectKind::Crab(_) => {
            state.add_points(config.neutral_points);
            TapOutcome::Scored {
                object_id,
                points: config.neutral_points,
            }
        }
    };

    state.push_event(GameEvent::object_tapped(now, object_id, object.kind, state.score));
    if let TapOutcome::HitBigBomb { .. } = outcome {
        state.push_event(GameEvent::game_over(
            now,
            GameOverReason::HitBigBomb,
            state.score,
            state.level,
        ));
    }

    outcome
}

/// Manual clear-bombs action, once per level.
///
/// Returns how many bombs were removed, or `None` if the action was already
/// used this level.
pub fn clear_bombs(state: &mut RunState, now: u64) -> Option<usize> {
    if !state.can_clear_bombs || state.is_over() {
        return None;
    }

    state.can_clear_bombs = false;
    let removed = state.objects.remove_bombs();
    state.push_event(GameEvent::bombs_cleared(now, removed, true));

    Some(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::object::CrabColor;
    use proptest::prelude::*;

    fn run() -> (RunState, RunConfig) {
        let config = RunConfig::default();
        let state = RunState::new(&config, 1, 42, 0);
        (state, config)
    }

    #[test]
    fn test_region_contains_edges() {
        let region = HitRegion::new(10.0, 10.0, 20.0, 20.0);
        assert!(region.contains(Point::new(10.0, 10.0)));
        assert!(region.contains(Point::new(20.0, 20.0)));
        assert!(!region.contains(Point::new(20.1, 15.0)));
        assert!(region.expanded(1.0).contains(Point::new(20.5, 15.0)));
    }

    #[test]
    fn test_small_bomb_scenario() {
        let (mut state, config) = run();
        state.score = 10;
        let id = state.objects.insert(ObjectKind::SmallBomb, Point::new(100.0, 100.0), 3.0);

        let outcome = resolve_tap(&mut state, Point::new(105.0, 105.0), 0, &config);

        assert_eq!(outcome, TapOutcome::Penalized { object_id: id, points: 4 });
        assert_eq!(state.score, 6);
        assert!(state.objects.is_empty());
    }

    #[test]
    fn test_small_bomb_floors_score() {
        let (mut state, config) = run();
        state.score = 3;
        state.objects.insert(ObjectKind::SmallBomb, Point::new(100.0, 100.0), 3.0);

        let outcome = resolve_tap(&mut state, Point::new(105.0, 105.0), 0, &config);

        assert!(matches!(outcome, TapOutcome::Penalized { points: 3, .. }));
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_big_bomb_ends_run() {
        let (mut state, config) = run();
        state.objects.insert(ObjectKind::BigBomb, Point::new(300.0, 200.0), 3.0);

        let outcome = resolve_tap(&mut state, Point::new(324.0, 224.0), 0, &config);

        assert!(outcome.is_terminal());
        assert_eq!(state.game_over, Some(GameOverReason::HitBigBomb));
        assert!(state.take_events().iter().any(|e| e.is_game_over()));
    }

    #[test]
    fn test_neutral_scores() {
        let (mut state, config) = run();
        state.objects.insert(ObjectKind::Crab(CrabColor::Blue), Point::new(0.0, 0.0), 3.0);

        let outcome = resolve_tap(&mut state, Point::new(18.0, 18.0), 0, &config);

        assert!(matches!(outcome, TapOutcome::Scored { points: 2, .. }));
        assert_eq!(state.score, 2);
    }

    #[test]
    fn test_margin_is_forgiving() {
        let (mut state, config) = run();
        state.objects.insert(ObjectKind::SmallBomb, Point::new(100.0, 100.0), 3.0);

        // 24-unit box plus 10 margin reaches 134
        assert_eq!(
            resolve_tap(&mut state, Point::new(135.0, 110.0), 0, &config),
            TapOutcome::Nothing
        );
        assert!(matches!(
            resolve_tap(&mut state, Point::new(133.0, 90.0), 0, &config),
            TapOutcome::Penalized { .. }
        ));
    }

    #[test]
    fn test_overlap_prefers_newest() {
        let (mut state, config) = run();
        let older = state.objects.insert(ObjectKind::Crab(CrabColor::Pink), Point::new(50.0, 50.0), 3.0);
        let newer = state.objects.insert(ObjectKind::SmallBomb, Point::new(50.0, 50.0), 3.0);

        let outcome = resolve_tap(&mut state, Point::new(55.0, 55.0), 0, &config);

        assert_eq!(outcome.object_id(), Some(newer));
        assert!(state.objects.get(older).is_some());
        assert_eq!(state.objects.len(), 1);
    }

    #[test]
    fn test_slow_floors_multiplier() {
        let (mut state, config) = run();
        state.fall_speed_multiplier = 0.7;
        state.objects.insert(ObjectKind::PowerSlow, Point::new(0.0, 0.0), 3.0);

        let outcome = resolve_tap(&mut state, Point::new(5.0, 5.0), 0, &config);

        assert_eq!(state.fall_speed_multiplier, 0.5);
        match outcome {
            TapOutcome::Slowed { amount, .. } => assert!((amount - 0.2).abs() < 1e-6),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_slow_at_floor_changes_nothing() {
        let (mut state, config) = run();
        state.objects.insert(ObjectKind::PowerSlow, Point::new(0.0, 0.0), 3.0);

        let outcome = resolve_tap(&mut state, Point::new(5.0, 5.0), 0, &config);

        assert_eq!(state.fall_speed_multiplier, 0.5);
        assert!(matches!(outcome, TapOutcome::Slowed { amount, .. } if amount == 0.0));
    }

    #[test]
    fn test_clear_power_up_keeps_neutrals() {
        let (mut state, config) = run();
        state.objects.insert(ObjectKind::SmallBomb, Point::new(300.0, 300.0), 3.0);
        state.objects.insert(ObjectKind::BigBomb, Point::new(400.0, 300.0), 3.0);
        state.objects.insert(ObjectKind::Crab(CrabColor::Green), Point::new(200.0, 300.0), 3.0);
        state.objects.insert(ObjectKind::PowerClear, Point::new(0.0, 0.0), 3.0);

        let outcome = resolve_tap(&mut state, Point::new(5.0, 5.0), 0, &config);

        assert!(matches!(outcome, TapOutcome::ClearedBombs { removed: 2, .. }));
        assert_eq!(state.objects.len(), 1);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_manual_clear_once_per_level() {
        let (mut state, _) = run();
        state.objects.insert(ObjectKind::SmallBomb, Point::new(0.0, 0.0), 3.0);

        assert_eq!(clear_bombs(&mut state, 0), Some(1));
        assert!(!state.can_clear_bombs);

        state.objects.insert(ObjectKind::SmallBomb, Point::new(0.0, 0.0), 3.0);
        assert_eq!(clear_bombs(&mut state, 0), None);
        assert_eq!(state.objects.len(), 1);
    }

    #[test]
    fn test_tap_on_empty_field() {
        let (mut state, config) = run();
        assert_eq!(resolve_tap(&mut state, Point::new(1.0, 1.0), 0, &config), TapOutcome::Nothing);
        assert!(state.take_events().is_empty());
    }

    fn kind_strategy() -> impl Strategy<Value = ObjectKind> {
        prop_oneof![
            Just(ObjectKind::Crab(CrabColor::Pink)),
            Just(ObjectKind::SmallBomb),
            Just(ObjectKind::BigBomb),
            Just(ObjectKind::PowerSlow),
            Just(ObjectKind::PowerClear),
        ]
    }

    proptest! {
        #[test]
        fn prop_one_object_per_tap_unless_cleared(
            objects in prop::collection::vec((kind_strategy(), 0.0f32..560.0, 0.0f32..450.0), 0..20),
            tap_x in 0.0f32..600.0,
            tap_y in 0.0f32..450.0,
            start_score in 0u32..20,
        ) {
            let (mut state, config) = run();
            state.score = start_score;
            for (kind, x, y) in &objects {
                state.objects.insert(*kind, Point::new(*x, *y), 3.0);
            }
            let before = state.objects.len();

            let outcome = resolve_tap(&mut state, Point::new(tap_x, tap_y), 0, &config);
            let removed = before - state.objects.len();

            match outcome {
                TapOutcome::Nothing => prop_assert_eq!(removed, 0),
                TapOutcome::ClearedBombs { removed: bombs, .. } => prop_assert_eq!(removed, bombs + 1),
                _ => prop_assert_eq!(removed, 1),
            }

            // Score only moves by the one effect that applied
            match outcome {
                TapOutcome::Scored { points, .. } => prop_assert_eq!(state.score, start_score + points),
                TapOutcome::Penalized { points, .. } => prop_assert_eq!(state.score, start_score - points),
                _ => prop_assert_eq!(state.score, start_score),
            }
        }
    }
}
