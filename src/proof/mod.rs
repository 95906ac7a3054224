//! Score Proof Placeholder
//!
//! Stands in for a proof-of-computation system: the client attaches a proof
//! to each submitted score and the leaderboard checks it before merging.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF PLACEHOLDER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  public_inputs.rs - [score, level] as claimed by the proof  │
//! │  verify.rs        - ProofVerifier seam + mock verifier      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The mock proof is a fixed tag. Swapping in a real prover means
//! replacing [`generate_proof`] and providing another [`ProofVerifier`].

pub mod public_inputs;
pub mod verify;

use serde::{Serialize, Deserialize};

// Re-export key types
pub use public_inputs::PublicInputs;
pub use verify::{MockProofVerifier, ProofError, ProofVerifier};

/// Tag the mock prover emits and the mock verifier expects.
pub const PROOF_TAG: &str = "sp1_proof_data";

/// A proof together with the public inputs it commits to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreProof {
    /// Opaque proof payload
    pub proof: String,
    /// What the proof claims
    pub public_inputs: PublicInputs,
}

/// Produce the proof for a finished run.
pub fn generate_proof(score: u32, level: u32) -> ScoreProof {
    let public_inputs = PublicInputs::new(score.into(), level.into());
    tracing::debug!(score, level, digest = %public_inputs.digest_hex(), "generated score proof");

    ScoreProof {
        proof: PROOF_TAG.to_string(),
        public_inputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_proof_verifies() {
        let proof = generate_proof(120, 4);
        assert_eq!(proof.proof, PROOF_TAG);
        assert_eq!(proof.public_inputs.to_vec(), vec![120, 4]);

        let verifier = MockProofVerifier;
        assert!(verifier
            .verify_score(&proof.proof, &proof.public_inputs.to_vec(), 120, 4)
            .unwrap());
    }
}
