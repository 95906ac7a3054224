//! Falling Crabs Leaderboard Server
//!
//! Serves the proof-checked leaderboard over WebSocket. `demo [seed]` runs
//! one headless auto-tapping game instead and submits its score to an
//! in-memory leaderboard.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use falling_crabs::{
    core::rng::DeterministicRng,
    game::{
        events::GameEventData,
        object::{ObjectKind, Point},
        run::SubmissionStatus,
        state::Phase,
    },
    network::{LeaderboardServer, ServerConfig},
    Game, LeaderboardClient, LeaderboardService, LeaderboardStore, LocalLeaderboard, RunConfig,
    ScoreReporter, FRAME_RATE, VERSION,
};

/// Give up on the demo run after ten minutes of simulated play.
const DEMO_MAX_FRAMES: u64 = FRAME_RATE as u64 * 600;

/// Chance the auto-tapper goes for a crab on a given frame.
const DEMO_TAP_CHANCE: f32 = 0.04;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Falling Crabs v{}", VERSION);

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("demo") => {
            let seed = match args.next() {
                Some(raw) => raw.parse().with_context(|| format!("invalid demo seed {:?}", raw))?,
                None => 12345,
            };
            demo_run(seed).await
        }
        Some(other) => anyhow::bail!("unknown command {:?} (expected `demo [seed]`)", other),
        None => serve().await,
    }
}

async fn serve() -> Result<()> {
    let config = ServerConfig::from_env().context("reading server configuration")?;
    let store = LeaderboardStore::open(&config.leaderboard_file)
        .await
        .with_context(|| format!("opening {}", config.leaderboard_file.display()))?;

    info!("Leaderboard file: {}", config.leaderboard_file.display());
    info!("Listening on ws://{}", config.bind_addr);

    let service = Arc::new(LeaderboardService::new(store));
    let server = Arc::new(LeaderboardServer::new(config, service));

    let running = server.clone();
    let mut serving = tokio::spawn(async move { running.run().await });

    tokio::select! {
        result = &mut serving => {
            return result.context("server task panicked")?.context("server stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for ctrl-c")?;
            info!("Shutting down");
            server.shutdown();
        }
    }

    serving
        .await
        .context("server task panicked")?
        .context("server stopped")
}

/// Headless run: taps some of the crabs, steers clear of bombs, and submits
/// whatever it scored once the run is over.
async fn demo_run(seed: u64) -> Result<()> {
    info!("=== Starting Demo Run ===");
    info!("Seed: {}", seed);

    let mut game = Game::with_seed(RunConfig::default(), seed);
    game.start("@demo").context("starting demo run")?;

    let service = Arc::new(LeaderboardService::new(LeaderboardStore::in_memory()));
    let mut reporter = ScoreReporter::new(Arc::new(LocalLeaderboard::new(service)), Handle::current());

    // Separate stream so the tapper never disturbs the run's own draws
    let mut tapper = DeterministicRng::new(seed ^ 0x5eed);
    let mut frames = 0u64;
    let mut taps = 0u32;

    while game.phase() == Phase::Playing && frames < DEMO_MAX_FRAMES {
        // 60 Hz alternating 16/17 ms frames
        let dt = if frames % 3 == 0 { 16 } else { 17 };
        let report = game.frame(dt);
        frames += 1;

        for event in &report.events {
            match &event.data {
                GameEventData::LevelUp { level, .. } => {
                    info!("Level {} at {} ms", level, event.at_ms);
                }
                GameEventData::GameOver { reason, score, level } => {
                    info!("{} (score {}, level {})", reason.message(), score, level);
                }
                _ => {}
            }
        }

        if let Some(target) = pick_target(&game, &mut tapper) {
            game.tap(target);
            taps += 1;
        }

        if frames % (FRAME_RATE as u64 * 10) == 0 {
            let snapshot = game.snapshot();
            info!(
                "{} ms: score {}, level {}, missed {}/{}, {} objects",
                snapshot.now_ms,
                snapshot.score,
                snapshot.level,
                snapshot.missed,
                snapshot.miss_limit,
                snapshot.objects.len()
            );
        }
    }

    if game.phase() == Phase::Playing {
        warn!("Demo reached its frame cap, submitting early");
        game.submit_now().context("ending demo run")?;
    }

    info!("=== Run Results ===");
    let snapshot = game.snapshot();
    info!("Frames: {}, taps: {}", frames, taps);
    info!("Score: {}, level: {}, missed: {}", snapshot.score, snapshot.level, snapshot.missed);

    if reporter.report_pending(&mut game).is_none() {
        anyhow::bail!("finished run produced no score report");
    }

    // Follow the submission until it settles
    while let Some(update) = reporter.next_update().await {
        let settled = match &update.status {
            SubmissionStatus::InProgress(step) => {
                info!("{}", step);
                false
            }
            _ => true,
        };
        game.apply_submission_update(update);
        if settled {
            break;
        }
    }

    match game.submission_status() {
        SubmissionStatus::Succeeded(message) => info!("Submission: {}", message),
        other => warn!("Submission: {}", other.display().unwrap_or_default()),
    }

    info!("=== Leaderboard ===");
    for (place, entry) in reporter.client().fetch_leaderboard().await?.iter().enumerate() {
        info!("#{}: {} - score {}, level {}", place + 1, entry.username, entry.score, entry.level);
    }

    Ok(())
}

/// Center of the lowest crab or power-up as last drawn, some of the time.
/// The tap resolves at the start of the next frame, before anything moves.
fn pick_target(game: &Game, rng: &mut DeterministicRng) -> Option<Point> {
    if !rng.chance(DEMO_TAP_CHANCE) {
        return None;
    }

    game.snapshot()
        .objects
        .iter()
        .filter(|o| !o.kind.is_bomb())
        .filter(|o| o.kind != ObjectKind::PowerClear || rng.chance(0.5))
        .max_by(|a, b| a.position.y.total_cmp(&b.position.y))
        .map(|o| {
            let half = o.size() / 2.0;
            Point::new(o.position.x + half, o.position.y + half)
        })
}
