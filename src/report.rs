//! Score Reporting
//!
//! Hands a finished run to a leaderboard without blocking the frame loop.
//! [`ScoreReporter::report`] spawns one task per run; the task walks the
//! submission through its stages and sends a [`SubmissionUpdate`] tagged with
//! the run's generation at each step. The frame loop drains the updates with
//! [`ScoreReporter::pump`], and [`Game`] drops any that belong to a run that
//! has since been restarted.
//!
//! ```text
//!  Game::take_score_report ──► ScoreReporter::report ──► tokio task
//!                                                          │ check report
//!                                                          │ generate proof
//!                                                          │ client.submit_score
//!                                                          ▼
//!  Game::apply_submission_update ◄── pump ◄── mpsc ◄── SubmissionUpdate
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::game::run::{Game, ScoreReport, SubmissionStatus, SubmissionUpdate};
use crate::leaderboard::{
    LeaderboardEntry, LeaderboardService, StoreError, SubmitScoreRequest, SubmitScoreResponse,
};
use crate::network::protocol::{ErrorCode, ServerError};
use crate::proof::generate_proof;
use crate::proof::verify::{MockProofVerifier, ProofVerifier};

/// Status text while the proof is produced.
pub const GENERATING_PROOF: &str = "Generating proof...";

/// Status text while the leaderboard is contacted.
pub const SUBMITTING_SCORE: &str = "Submitting score...";

/// Why a submission did not go through.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report failed the client-side checks.
    #[error("{0}")]
    InvalidReport(String),

    /// The leaderboard could not be reached.
    #[error("connection failed: {0}")]
    Transport(String),

    /// No reply within the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The leaderboard refused the submission.
    #[error("{}", .0.message)]
    Rejected(ServerError),

    /// The reply did not fit the request.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// A message could not be encoded or decoded.
    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ReportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ReportError::Transport(err.to_string())
    }
}

/// A leaderboard the reporter can submit to.
pub trait LeaderboardClient: Send + Sync + 'static {
    /// Submit a score with its proof.
    fn submit_score(
        &self,
        request: SubmitScoreRequest,
    ) -> impl Future<Output = Result<SubmitScoreResponse, ReportError>> + Send;

    /// The table, highest score first.
    fn fetch_leaderboard(
        &self,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, ReportError>> + Send;
}

/// In-process leaderboard, for the headless demo and tests.
#[derive(Debug)]
pub struct LocalLeaderboard<V = MockProofVerifier> {
    service: Arc<LeaderboardService<V>>,
}

impl<V> LocalLeaderboard<V> {
    /// Client backed by `service`.
    pub fn new(service: Arc<LeaderboardService<V>>) -> Self {
        Self { service }
    }

    /// Backing service.
    pub fn service(&self) -> &Arc<LeaderboardService<V>> {
        &self.service
    }
}

impl<V> Clone for LocalLeaderboard<V> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<V: ProofVerifier + 'static> LeaderboardClient for LocalLeaderboard<V> {
    fn submit_score(
        &self,
        request: SubmitScoreRequest,
    ) -> impl Future<Output = Result<SubmitScoreResponse, ReportError>> + Send {
        async move {
            self.service
                .submit(&request)
                .await
                .map_err(|e| ReportError::Rejected(ServerError::from(&e)))
        }
    }

    fn fetch_leaderboard(
        &self,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, ReportError>> + Send {
        async move { self.service.fetch().await.map_err(storage_rejection) }
    }
}

fn storage_rejection(err: StoreError) -> ReportError {
    ReportError::Rejected(ServerError::new(ErrorCode::StorageError, err.to_string()))
}

/// Fire-and-forget score submission with generation-tagged status updates.
#[derive(Debug)]
pub struct ScoreReporter<C> {
    client: Arc<C>,
    runtime: Handle,
    updates_tx: mpsc::UnboundedSender<SubmissionUpdate>,
    updates_rx: mpsc::UnboundedReceiver<SubmissionUpdate>,
}

impl<C: LeaderboardClient> ScoreReporter<C> {
    /// Reporter whose tasks run on `runtime`.
    pub fn new(client: Arc<C>, runtime: Handle) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            client,
            runtime,
            updates_tx,
            updates_rx,
        }
    }

    /// Leaderboard this reporter submits to.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Submit a finished run in the background.
    ///
    /// Failures end as a [`SubmissionStatus::Failed`] update. Nothing is
    /// retried.
    pub fn report(&self, report: ScoreReport) -> JoinHandle<()> {
        let client = self.client.clone();
        let updates = self.updates_tx.clone();

        self.runtime.spawn(async move {
            let generation = report.generation;
            let send = |status: SubmissionStatus| {
                if updates.send(SubmissionUpdate { generation, status }).is_err() {
                    debug!(generation, "reporter dropped, status update discarded");
                }
            };

            match submit(&*client, &report, &send).await {
                Ok(response) => {
                    info!(
                        player = %report.player,
                        score = report.score,
                        level = report.level,
                        run_id = %report.run_id,
                        "score submitted"
                    );
                    send(SubmissionStatus::Succeeded(response.message));
                }
                Err(e) => {
                    warn!(player = %report.player, run_id = %report.run_id, error = %e, "score submission failed");
                    send(SubmissionStatus::Failed(e.to_string()));
                }
            }
        })
    }

    /// Take the game's pending report, if any, and submit it.
    pub fn report_pending(&self, game: &mut Game) -> Option<JoinHandle<()>> {
        game.take_score_report().map(|report| self.report(report))
    }

    /// Every update received so far, without waiting.
    pub fn poll_updates(&mut self) -> Vec<SubmissionUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.updates_rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    /// Wait for the next update.
    pub async fn next_update(&mut self) -> Option<SubmissionUpdate> {
        self.updates_rx.recv().await
    }

    /// Apply every received update to `game`. Returns how many were applied.
    pub fn pump(&mut self, game: &mut Game) -> usize {
        self.poll_updates()
            .into_iter()
            .filter(|update| game.apply_submission_update(update.clone()))
            .count()
    }
}

async fn submit<C, F>(
    client: &C,
    report: &ScoreReport,
    send: &F,
) -> Result<SubmitScoreResponse, ReportError>
where
    C: LeaderboardClient,
    F: Fn(SubmissionStatus) + Sync,
{
    check_report(report)?;

    send(SubmissionStatus::InProgress(GENERATING_PROOF.to_string()));
    let proof = generate_proof(report.score, report.level);

    send(SubmissionStatus::InProgress(SUBMITTING_SCORE.to_string()));
    let request = SubmitScoreRequest {
        username: report.player.as_str().to_string(),
        score: report.score.into(),
        level: report.level.into(),
        proof: proof.proof,
        public_inputs: proof.public_inputs.to_vec(),
    };

    client.submit_score(request).await
}

/// Checks made before a proof is produced.
fn check_report(report: &ScoreReport) -> Result<(), ReportError> {
    if report.player.as_str().is_empty() {
        return Err(ReportError::InvalidReport("Invalid username".into()));
    }
    if report.level < 1 {
        return Err(ReportError::InvalidReport("Invalid level".into()));
    }
    Ok(())
}
