//! Object Spawning
//!
//! Spawn gate and kind/placement policy. All randomness comes from the run's
//! [`DeterministicRng`], drawn in a fixed order (gate trial, kind, x, speed)
//! so a seed and an input sequence replay the same run.

use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::events::GameEvent;
use crate::game::object::{CrabColor, ObjectId, ObjectKind, Point};
use crate::game::state::RunState;

/// Configuration for object spawning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Minimum active time between two spawns, in milliseconds
    pub min_interval_ms: u64,
    /// Per-frame Bernoulli trial once the other gates are open
    pub spawn_chance: f32,
    /// Probability that a spawn is a power-up
    pub power_up_chance: f32,
    /// Lower bound of the initial speed, inclusive
    pub min_speed: f32,
    /// Upper bound of the initial speed, exclusive
    pub max_speed: f32,
    /// Play-field width objects are placed across
    pub field_width: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 200,
            spawn_chance: 0.03,
            power_up_chance: 0.05,
            min_speed: 2.0,
            max_speed: 6.0,
            field_width: crate::FIELD_WIDTH,
        }
    }
}

/// Are the occupancy and interval gates open?
///
/// The first spawn of a run has no previous spawn to wait on.
pub fn spawn_gate_open(state: &RunState, now: u64, config: &SpawnConfig) -> bool {
    if state.objects.len() >= state.max_concurrent_objects as usize {
        return false;
    }

    match state.last_spawn_at {
        Some(last) => now.saturating_sub(last) >= config.min_interval_ms,
        None => true,
    }
}

/// Pick the kind of a new object.
///
/// Priority order: power-up, then bomb, then a neutral crab.
pub fn choose_kind(rng: &mut DeterministicRng, bomb_chance: f32, config: &SpawnConfig) -> ObjectKind {
    if rng.chance(config.power_up_chance) {
        return if rng.chance(0.5) {
            ObjectKind::PowerSlow
        } else {
            ObjectKind::PowerClear
        };
    }

    if rng.chance(bomb_chance) {
        return if rng.chance(0.5) {
            ObjectKind::SmallBomb
        } else {
            ObjectKind::BigBomb
        };
    }

    let color = rng.choose(&CrabColor::ALL).copied().unwrap_or(CrabColor::Pink);
    ObjectKind::Crab(color)
}

/// Left edge for a new object, keeping the whole box on the field.
pub fn spawn_x(rng: &mut DeterministicRng, kind: ObjectKind, config: &SpawnConfig) -> f32 {
    rng.next_f32() * (config.field_width - kind.size()).max(0.0)
}

/// Base speed for a new object, independent of kind.
pub fn initial_speed(rng: &mut DeterministicRng, config: &SpawnConfig) -> f32 {
    rng.next_f32_range(config.min_speed, config.max_speed)
}

/// Run the spawn policy for one frame.
///
/// Returns the handle of the new object if one was spawned.
pub fn maybe_spawn(state: &mut RunState, now: u64, config: &SpawnConfig) -> Option<ObjectId> {
    if !spawn_gate_open(state, now, config) {
        return None;
    }

    if !state.rng.chance(config.spawn_chance) {
        return None;
    }

    let kind = choose_kind(&mut state.rng, state.bomb_spawn_chance, config);
    let position = Point::new(spawn_x(&mut state.rng, kind, config), 0.0);
    let speed = initial_speed(&mut state.rng, config);

    let id = state.objects.insert(kind, position, speed);
    state.last_spawn_at = Some(now);
    state.push_event(GameEvent::object_spawned(now, id, kind, position, speed));

    tracing::trace!(id, kind = kind.name(), x = position.x, speed, "object spawned");

    Some(id)
}
