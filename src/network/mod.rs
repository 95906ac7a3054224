//! Network Layer
//!
//! JSON-over-WebSocket transport for the leaderboard. The simulation never
//! touches this layer; finished runs reach it through `report`.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::WsLeaderboardClient;
pub use protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};
pub use server::{LeaderboardServer, ServerConfig, LeaderboardServerError};
