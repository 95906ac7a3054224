//! Proof Verification
//!
//! Interface the leaderboard calls before accepting a score, and the mock
//! implementation used until a real prover is wired in.

use thiserror::Error;

use crate::proof::public_inputs::PublicInputs;
use crate::proof::PROOF_TAG;

/// Errors that can occur while checking a proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// Proof payload is malformed.
    #[error("invalid proof format")]
    InvalidProofFormat,

    /// Wrong number of public inputs.
    #[error("expected {expected} public inputs, got {got}")]
    PublicInputArity {
        /// Required count
        expected: usize,
        /// Supplied count
        got: usize,
    },

    /// The verifier backend could not be reached.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Proof verification interface.
pub trait ProofVerifier: Send + Sync {
    /// Check that `proof` proves `public_inputs` and that they match the
    /// submitted `score` and `level`.
    ///
    /// `Ok(false)` is a well-formed but rejected proof.
    fn verify_score(
        &self,
        proof: &str,
        public_inputs: &[i64],
        score: i64,
        level: i64,
    ) -> Result<bool, ProofError>;
}

/// Mock verifier: accepts the fixed proof tag when the public inputs equal
/// `[score, level]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockProofVerifier;

impl ProofVerifier for MockProofVerifier {
    fn verify_score(
        &self,
        proof: &str,
        public_inputs: &[i64],
        score: i64,
        level: i64,
    ) -> Result<bool, ProofError> {
        if proof.trim().is_empty() {
            return Err(ProofError::InvalidProofFormat);
        }
        let inputs = PublicInputs::from_slice(public_inputs)?;
        Ok(proof == PROOF_TAG && inputs.matches(score, level))
    }
}
