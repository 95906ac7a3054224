//! Leaderboard Service
//!
//! Validates a submission, checks its proof and merges it into the store.
//! Field checks run in a fixed order and the first failure is reported.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::game::state::{NameError, PlayerName, MAX_PLAYER_NAME_LEN};
use crate::leaderboard::entry::{merge_score, rank, LeaderboardEntry, MergeOutcome};
use crate::leaderboard::store::{LeaderboardStore, StoreError};
use crate::leaderboard::{
    SubmitScoreRequest, SubmitScoreResponse, CLEARED_MESSAGE, SCORE_ACCEPTED_MESSAGE,
};
use crate::proof::public_inputs::PUBLIC_INPUT_COUNT;
use crate::proof::verify::{MockProofVerifier, ProofVerifier};

/// Why a submission was refused.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// A field is missing or out of range.
    #[error("{0}")]
    InvalidField(String),

    /// The proof does not back the claimed score.
    #[error("Invalid SP1 proof or public inputs")]
    ProofRejected,

    /// The table could not be read or written.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Leaderboard with its proof verifier.
#[derive(Debug)]
pub struct LeaderboardService<V = MockProofVerifier> {
    store: LeaderboardStore,
    verifier: V,
}

impl LeaderboardService<MockProofVerifier> {
    /// Service using the mock verifier.
    pub fn new(store: LeaderboardStore) -> Self {
        Self::with_verifier(store, MockProofVerifier)
    }
}

impl<V: ProofVerifier> LeaderboardService<V> {
    /// Service using a custom verifier.
    pub fn with_verifier(store: LeaderboardStore, verifier: V) -> Self {
        Self { store, verifier }
    }

    /// Underlying store.
    pub fn store(&self) -> &LeaderboardStore {
        &self.store
    }

    /// Validate, verify and merge a submission.
    pub async fn submit(&self, request: &SubmitScoreRequest) -> Result<SubmitScoreResponse, SubmitError> {
        let player = validate(request)?;

        match self.verifier.verify_score(
            &request.proof,
            &request.public_inputs,
            request.score,
            request.level,
        ) {
            Ok(true) => {}
            Ok(false) => {
                warn!(player = %player, score = request.score, level = request.level, "proof rejected");
                return Err(SubmitError::ProofRejected);
            }
            Err(e) => {
                warn!(player = %player, error = %e, "proof check failed");
                return Err(SubmitError::ProofRejected);
            }
        }

        // validate() guarantees both are non-negative
        let score = request.score as u64;
        let level = request.level as u64;
        let username = player.as_str().to_string();

        let outcome = self
            .store
            .update(move |entries| {
                let outcome = merge_score(entries, &username, score, level, Utc::now());
                (outcome, outcome.changed())
            })
            .await?;

        match outcome {
            MergeOutcome::Inserted => info!(player = %player, score, level, "new leaderboard entry"),
            MergeOutcome::Improved { previous } => {
                info!(player = %player, score, previous, level, "leaderboard entry improved")
            }
            MergeOutcome::Kept { best } => info!(player = %player, score, best, "score below best, kept"),
        }

        Ok(SubmitScoreResponse {
            message: SCORE_ACCEPTED_MESSAGE.to_string(),
        })
    }

    /// Every entry, highest score first.
    pub async fn fetch(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut entries = self.store.load().await?;
        rank(&mut entries);
        Ok(entries)
    }

    /// Empty the table.
    pub async fn clear(&self) -> Result<String, StoreError> {
        self.store.clear().await?;
        Ok(CLEARED_MESSAGE.to_string())
    }
}

/// Field checks, in order. Returns the normalized player on success.
fn validate(request: &SubmitScoreRequest) -> Result<PlayerName, SubmitError> {
    const USERNAME: &str = "Missing or invalid field: username (must be a non-empty string)";

    if request.username.trim().is_empty() {
        return Err(invalid(USERNAME));
    }
    if request.score < 0 {
        return Err(invalid("Missing or invalid field: score (must be a non-negative integer)"));
    }
    if request.level < 1 {
        return Err(invalid("Missing or invalid field: level (must be a positive integer)"));
    }
    if request.proof.is_empty() {
        return Err(invalid("Missing or invalid field: proof (must be a string)"));
    }
    if request.public_inputs.len() != PUBLIC_INPUT_COUNT {
        return Err(invalid(
            "Missing or invalid field: public_inputs (must be an array of two integers)",
        ));
    }

    match PlayerName::parse(&request.username) {
        Ok(player) => Ok(player),
        Err(NameError::Empty) => Err(invalid(USERNAME)),
        Err(NameError::TooLong { .. }) => Err(SubmitError::InvalidField(format!(
            "Invalid field: username (exceeds {} characters)",
            MAX_PLAYER_NAME_LEN
        ))),
    }
}

fn invalid(message: &str) -> SubmitError {
    SubmitError::InvalidField(message.to_string())
}
