//! Public Inputs
//!
//! The values a score proof commits to: `[score, level]`, in that order.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use crate::proof::verify::ProofError;

/// Number of public inputs a score proof carries.
pub const PUBLIC_INPUT_COUNT: usize = 2;

/// Claimed outcome of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<i64>", try_from = "Vec<i64>")]
pub struct PublicInputs {
    /// Final score
    pub score: i64,
    /// Final level
    pub level: i64,
}

impl PublicInputs {
    /// Create public inputs.
    pub const fn new(score: i64, level: i64) -> Self {
        Self { score, level }
    }

    /// Parse the wire form. Exactly two values are required.
    pub fn from_slice(values: &[i64]) -> Result<Self, ProofError> {
        match values {
            [score, level] => Ok(Self::new(*score, *level)),
            _ => Err(ProofError::PublicInputArity {
                expected: PUBLIC_INPUT_COUNT,
                got: values.len(),
            }),
        }
    }

    /// Wire form, `[score, level]`.
    pub fn to_vec(&self) -> Vec<i64> {
        vec![self.score, self.level]
    }

    /// Does this claim match the submitted score and level?
    pub fn matches(&self, score: i64, level: i64) -> bool {
        self.score == score && self.level == level
    }

    /// SHA-256 of the little-endian encoding, hex encoded. Used to tag log
    /// lines so a submission can be traced through client and server.
    pub fn digest_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"FALLING_CRABS_INPUTS_V1");
        hasher.update(self.score.to_le_bytes());
        hasher.update(self.level.to_le_bytes());
        hex::encode(&hasher.finalize()[..8])
    }
}

impl From<PublicInputs> for Vec<i64> {
    fn from(inputs: PublicInputs) -> Self {
        inputs.to_vec()
    }
}

impl TryFrom<Vec<i64>> for PublicInputs {
    type Error = ProofError;

    fn try_from(values: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}
