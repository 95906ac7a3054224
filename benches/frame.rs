//! Frame throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use falling_crabs::game::object::Point;
use falling_crabs::game::state::RunState;
use falling_crabs::game::tick::advance_frame;
use falling_crabs::{Game, RunConfig, FIELD_HEIGHT, FIELD_WIDTH};

/// One minute of play at 60 Hz.
const FRAMES: u64 = 3_600;

fn bench_advance_frame(c: &mut Criterion) {
    let config = RunConfig {
        // Keep the run alive for the whole minute
        miss_limit: u32::MAX,
        ..RunConfig::default()
    };

    c.bench_function("advance_frame_1min", |b| {
        b.iter_batched(
            || RunState::new(&config, 1, 42, 0),
            |mut state| {
                for frame in 1..=FRAMES {
                    black_box(advance_frame(&mut state, frame * 16, &config));
                }
                state
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_game_frame_with_taps(c: &mut Criterion) {
    let config = RunConfig {
        miss_limit: u32::MAX,
        ..RunConfig::default()
    };

    c.bench_function("game_frame_random_taps_1min", |b| {
        b.iter_batched(
            || {
                let mut game = Game::with_seed(config.clone(), 7);
                // Constant name, the bench never fails here
                let _ = game.start("bench");
                (game, StdRng::seed_from_u64(99))
            },
            |(mut game, mut rng)| {
                for _ in 0..FRAMES {
                    if rng.gen_bool(0.2) {
                        let x = rng.gen_range(0.0..FIELD_WIDTH);
                        let y = rng.gen_range(0.0..FIELD_HEIGHT);
                        game.tap(Point::new(x, y));
                    }
                    black_box(game.frame(16));
                }
                game
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_advance_frame, bench_game_frame_with_taps);
criterion_main!(benches);
