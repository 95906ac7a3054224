//! WebSocket Leaderboard Server
//!
//! Async WebSocket server in front of a [`LeaderboardService`]. Each
//! connection gets a reader loop and a writer task joined by a channel;
//! requests on one connection are answered in order.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::leaderboard::service::LeaderboardService;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};
use crate::proof::verify::{MockProofVerifier, ProofVerifier};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3001;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle connections are closed after this long without a message.
    pub idle_timeout: Duration,
    /// Leaderboard table file.
    pub leaderboard_file: PathBuf,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            leaderboard_file: PathBuf::from("leaderboard.json"),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PORT`, `BIND_ADDR`, `LEADERBOARD_FILE` and
    /// `MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, LeaderboardServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LeaderboardServerError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|e| LeaderboardServerError::Config(format!("PORT={}: {}", port, e)))?;
            config.bind_addr.set_port(port);
        }
        if let Some(ip) = lookup("BIND_ADDR") {
            let ip = ip
                .parse::<IpAddr>()
                .map_err(|e| LeaderboardServerError::Config(format!("BIND_ADDR={}: {}", ip, e)))?;
            config.bind_addr.set_ip(ip);
        }
        if let Some(file) = lookup("LEADERBOARD_FILE") {
            config.leaderboard_file = PathBuf::from(file);
        }
        if let Some(max) = lookup("MAX_CONNECTIONS") {
            config.max_connections = max.parse::<usize>().map_err(|e| {
                LeaderboardServerError::Config(format!("MAX_CONNECTIONS={}: {}", max, e))
            })?;
        }

        Ok(config)
    }
}

/// Leaderboard server errors.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Bad configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Connected client state.
struct ConnectedClient {
    /// Connection time.
    connected_at: Instant,
    /// Last activity.
    last_activity: Instant,
    /// Requests handled.
    requests: u64,
}

type Clients = Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>;

/// The leaderboard server.
pub struct LeaderboardServer<V = MockProofVerifier> {
    /// Server configuration.
    config: ServerConfig,
    /// Leaderboard the requests go to.
    service: Arc<LeaderboardService<V>>,
    /// Connected clients.
    clients: Clients,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl<V: ProofVerifier + 'static> LeaderboardServer<V> {
    /// Create a new server.
    pub fn new(config: ServerConfig, service: Arc<LeaderboardService<V>>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            service,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, LeaderboardServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Leaderboard server v{} listening on {}", self.config.version, listener.local_addr()?);
        Ok(listener)
    }

    /// Bind and serve until [`LeaderboardServer::shutdown`].
    pub async fn run(&self) -> Result<(), LeaderboardServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    #[instrument(skip(self, listener))]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), LeaderboardServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let service = self.service.clone();
        let idle_timeout = self.config.idle_timeout;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Register client
            {
                let now = Instant::now();
                clients.write().await.insert(addr, ConnectedClient {
                    connected_at: now,
                    last_activity: now,
                    requests: 0,
                });
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = tokio::time::timeout(idle_timeout, ws_receiver.next()) => {
                        let msg = match msg {
                            Ok(msg) => msg,
                            Err(_) => {
                                debug!("Client {} idle, closing", addr);
                                break;
                            }
                        };

                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                        client.requests += 1;
                                    }
                                }

                                let reply = match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => handle_client_message(addr, client_msg, &service).await,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        ServerMessage::error(ErrorCode::InvalidInput, "Invalid message format")
                                    }
                                };

                                if msg_tx.send(reply).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued replies flush, then stop the writer
            drop(msg_tx);
            if tokio::time::timeout(Duration::from_secs(1), sender_task).await.is_err() {
                debug!("Writer for {} did not finish in time", addr);
            }

            if let Some(client) = clients.write().await.remove(&addr) {
                info!(
                    "Client {} cleaned up after {:?}, {} requests (last active {:?} ago)",
                    addr,
                    client.connected_at.elapsed(),
                    client.requests,
                    client.last_activity.elapsed()
                );
            }
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Handle a client message and produce the reply.
async fn handle_client_message<V: ProofVerifier>(
    addr: SocketAddr,
    msg: ClientMessage,
    service: &LeaderboardService<V>,
) -> ServerMessage {
    match msg {
        ClientMessage::SubmitScore(request) => {
            debug!("Score submission from {}: {} / {}", addr, request.username, request.score);
            match service.submit(&request).await {
                Ok(response) => ServerMessage::ScoreAccepted {
                    message: response.message,
                },
                Err(e) => {
                    warn!("Submission from {} refused: {}", addr, e);
                    ServerMessage::Error(ServerError::from(&e))
                }
            }
        }
        ClientMessage::FetchLeaderboard => match service.fetch().await {
            Ok(entries) => ServerMessage::Leaderboard { entries },
            Err(e) => {
                error!("Error fetching leaderboard: {}", e);
                ServerMessage::error(ErrorCode::StorageError, "Internal server error")
            }
        },
        ClientMessage::ClearLeaderboard => match service.clear().await {
            Ok(message) => ServerMessage::LeaderboardCleared { message },
            Err(e) => {
                error!("Error clearing leaderboard: {}", e);
                ServerMessage::error(ErrorCode::StorageError, "Internal server error")
            }
        },
        ClientMessage::Ping { timestamp } => ServerMessage::Pong {
            timestamp,
            server_time: chrono::Utc::now().timestamp_millis().max(0) as u64,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::store::LeaderboardStore;
    use crate::leaderboard::SubmitScoreRequest;
    use crate::proof::PROOF_TAG;
    use tokio_tungstenite::connect_async;

    fn test_server() -> Arc<LeaderboardServer> {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let service = Arc::new(LeaderboardService::new(LeaderboardStore::in_memory()));
        Arc::new(LeaderboardServer::new(config, service))
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3001);
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.leaderboard_file, PathBuf::from("leaderboard.json"));
    }

    #[test]
    fn test_server_config_from_lookup() {
        let config = ServerConfig::from_lookup(|key| match key {
            "PORT" => Some("4000".into()),
            "BIND_ADDR" => Some("127.0.0.1".into()),
            "LEADERBOARD_FILE" => Some("/tmp/board.json".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:4000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.leaderboard_file, PathBuf::from("/tmp/board.json"));
        assert_eq!(config.max_connections, 1000);

        let bad = ServerConfig::from_lookup(|key| (key == "PORT").then(|| "lots".to_string()));
        assert!(matches!(bad, Err(LeaderboardServerError::Config(_))));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = test_server();
        assert_eq!(server.connection_count().await, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_round_trip() {
        let server = test_server();
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let submit = ClientMessage::SubmitScore(SubmitScoreRequest {
            username: "@Crab".into(),
            score: 42,
            level: 2,
            proof: PROOF_TAG.into(),
            public_inputs: vec![42, 2],
        });
        ws.send(Message::Text(submit.to_json().unwrap())).await.unwrap();
        let reply = next_reply(&mut ws).await;
        assert_eq!(
            reply,
            ServerMessage::ScoreAccepted {
                message: "Your Score is proved".into()
            }
        );

        ws.send(Message::Text("not json".into())).await.unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::Error(err) => assert_eq!(err.code, ErrorCode::InvalidInput),
            other => panic!("unexpected reply {:?}", other),
        }

        ws.send(Message::Text(ClientMessage::FetchLeaderboard.to_json().unwrap()))
            .await
            .unwrap();
        match next_reply(&mut ws).await {
            ServerMessage::Leaderboard { entries } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].username, "crab");
                assert_eq!(entries[0].score, 42);
            }
            other => panic!("unexpected reply {:?}", other),
        }

        server.shutdown();
        let _ = handle.await;
    }

    async fn next_reply<S>(ws: &mut S) -> ServerMessage
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return ServerMessage::from_json(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {:?}", other),
            }
        }
    }
}
