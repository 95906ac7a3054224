//! Protocol Messages
//!
//! Wire format for leaderboard traffic over WebSocket. Every message is a
//! JSON object with a `type` tag.

use serde::{Serialize, Deserialize};

use crate::leaderboard::{LeaderboardEntry, SubmitError, SubmitScoreRequest};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Submit a finished run's score with its proof.
    SubmitScore(SubmitScoreRequest),

    /// Request the whole table.
    FetchLeaderboard,

    /// Empty the table.
    ClearLeaderboard,

    /// Ping for latency measurement.
    Ping {
        /// Client clock, echoed back
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Submission accepted (whether or not it beat the stored best).
    ScoreAccepted {
        /// Confirmation text
        message: String,
    },

    /// The table, highest score first.
    Leaderboard {
        /// Entries
        entries: Vec<LeaderboardEntry>,
    },

    /// Table emptied.
    LeaderboardCleared {
        /// Confirmation text
        message: String,
    },

    /// Reply to a ping.
    Pong {
        /// Client timestamp from the ping
        timestamp: u64,
        /// Server clock, Unix milliseconds
        server_time: u64,
    },

    /// The request failed.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Why
        reason: String,
    },
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed message or invalid field.
    InvalidInput,
    /// Proof did not back the claimed score.
    ProofRejected,
    /// Table could not be read or written.
    StorageError,
    /// Server refused the connection.
    ServerOverloaded,
    /// Anything else.
    InternalError,
}

impl ServerError {
    /// Create an error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&SubmitError> for ServerError {
    fn from(err: &SubmitError) -> Self {
        let code = match err {
            SubmitError::InvalidField(_) => ErrorCode::InvalidInput,
            SubmitError::ProofRejected => ErrorCode::ProofRejected,
            SubmitError::Storage(_) => ErrorCode::StorageError,
        };
        Self::new(code, err.to_string())
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Shorthand for an error reply.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError::new(code, message))
    }
}
