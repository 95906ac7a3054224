//! WebSocket Leaderboard Client
//!
//! One short-lived connection per request: connect, send, read the first
//! reply, close. Every request is bounded by a timeout.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

use crate::leaderboard::{LeaderboardEntry, SubmitScoreRequest, SubmitScoreResponse};
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::report::{LeaderboardClient, ReportError};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a remote leaderboard server.
#[derive(Debug, Clone)]
pub struct WsLeaderboardClient {
    url: String,
    timeout: Duration,
}

impl WsLeaderboardClient {
    /// Client for `url` (e.g. `ws://localhost:3001`).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Empty the remote table.
    pub async fn clear_leaderboard(&self) -> Result<String, ReportError> {
        match self.request(ClientMessage::ClearLeaderboard).await? {
            ServerMessage::LeaderboardCleared { message } => Ok(message),
            other => Err(unexpected(other)),
        }
    }

    /// Round-trip time to the server, in milliseconds.
    pub async fn ping(&self) -> Result<u64, ReportError> {
        let sent = chrono::Utc::now().timestamp_millis().max(0) as u64;
        match self.request(ClientMessage::Ping { timestamp: sent }).await? {
            ServerMessage::Pong { timestamp, .. } => {
                let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
                Ok(now.saturating_sub(timestamp))
            }
            other => Err(unexpected(other)),
        }
    }

    async fn request(&self, msg: ClientMessage) -> Result<ServerMessage, ReportError> {
        tokio::time::timeout(self.timeout, self.exchange(msg))
            .await
            .map_err(|_| ReportError::Timeout(self.timeout))?
    }

    async fn exchange(&self, msg: ClientMessage) -> Result<ServerMessage, ReportError> {
        let (mut ws, _) = connect_async(self.url.as_str()).await?;
        ws.send(Message::Text(msg.to_json()?)).await?;

        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let reply = ServerMessage::from_json(&text)?;
                    if let Err(e) = ws.close(None).await {
                        debug!("close after reply failed: {}", e);
                    }
                    return Ok(reply);
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(ReportError::Transport(
                        "connection closed before reply".to_string(),
                    ))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}

impl LeaderboardClient for WsLeaderboardClient {
    fn submit_score(
        &self,
        request: SubmitScoreRequest,
    ) -> impl Future<Output = Result<SubmitScoreResponse, ReportError>> + Send {
        async move {
            match self.request(ClientMessage::SubmitScore(request)).await? {
                ServerMessage::ScoreAccepted { message } => Ok(SubmitScoreResponse { message }),
                ServerMessage::Error(err) => Err(ReportError::Rejected(err)),
                other => Err(unexpected(other)),
            }
        }
    }

    fn fetch_leaderboard(
        &self,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, ReportError>> + Send {
        async move {
            match self.request(ClientMessage::FetchLeaderboard).await? {
                ServerMessage::Leaderboard { entries } => Ok(entries),
                ServerMessage::Error(err) => Err(ReportError::Rejected(err)),
                other => Err(unexpected(other)),
            }
        }
    }
}

fn unexpected(reply: ServerMessage) -> ReportError {
    ReportError::UnexpectedReply(format!("{:?}", reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::leaderboard::{LeaderboardService, LeaderboardStore};
    use crate::network::server::{LeaderboardServer, ServerConfig};
    use crate::proof::generate_proof;

    async fn spawn_server() -> (Arc<LeaderboardServer>, String) {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let service = Arc::new(LeaderboardService::new(LeaderboardStore::in_memory()));
        let server = Arc::new(LeaderboardServer::new(config, service));
        let listener = server.bind().await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let serving = server.clone();
        tokio::spawn(async move { serving.serve(listener).await });

        (server, url)
    }

    fn request(username: &str, score: u32, level: u32) -> SubmitScoreRequest {
        let proof = generate_proof(score, level);
        SubmitScoreRequest {
            username: username.into(),
            score: score.into(),
            level: level.into(),
            proof: proof.proof,
            public_inputs: proof.public_inputs.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_client_against_server() {
        let (server, url) = spawn_server().await;
        let client = WsLeaderboardClient::new(url);

        let accepted = client.submit_score(request("crab", 100, 3)).await.unwrap();
        assert_eq!(accepted.message, "Your Score is proved");
        client.submit_score(request("@CRAB", 120, 4)).await.unwrap();
        client.submit_score(request("crab", 80, 5)).await.unwrap();

        let entries = client.fetch_leaderboard().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].score, 120);
        assert_eq!(entries[0].level, 4);

        let mut forged = request("crab", 999, 9);
        forged.public_inputs = vec![1, 1];
        match client.submit_score(forged).await {
            Err(ReportError::Rejected(err)) => {
                assert_eq!(err.message, "Invalid SP1 proof or public inputs")
            }
            other => panic!("unexpected result {:?}", other),
        }

        assert_eq!(
            client.clear_leaderboard().await.unwrap(),
            "Leaderboard cleared successfully"
        );
        assert!(client.fetch_leaderboard().await.unwrap().is_empty());

        server.shutdown();
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client = WsLeaderboardClient::new("ws://127.0.0.1:1")
            .with_timeout(Duration::from_secs(2));

        let result = client.fetch_leaderboard().await;
        assert!(matches!(
            result,
            Err(ReportError::Transport(_)) | Err(ReportError::Timeout(_))
        ));
    }
}
