//! `MazeDuelServer` builder and server loop.
//!
//! This is the entry point for running a Maze Duel server. It ties
//! together all the layers: transport → protocol → room.

use std::sync::Arc;
use std::time::Duration;

use mazeduel_mapgen::QuestionCatalog;
use mazeduel_protocol::JsonCodec;
use mazeduel_room::{RoomConfig, RoomManager};
use tokio::sync::Mutex;

use crate::MazeDuelError;
use crate::handler::handle_connection;
use crate::transport::WebSocketTransport;

/// How long a new connection has to send `join`.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a Maze Duel server.
///
/// # Example
///
/// ```rust,ignore
/// let server = MazeDuelServer::builder()
///     .bind("0.0.0.0:8080")
///     .catalog(QuestionCatalog::from_json(&bytes)?)
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct MazeDuelServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    catalog: Option<QuestionCatalog>,
}

impl MazeDuelServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            catalog: None,
        }
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Settings for every room the server creates.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Questions to draw from. Defaults to [`QuestionCatalog::builtin`].
    pub fn catalog(mut self, catalog: QuestionCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Binds the listener. Connections are accepted once
    /// [`MazeDuelServer::run`] is called.
    pub async fn build(self) -> Result<MazeDuelServer, MazeDuelError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let catalog = Arc::new(self.catalog.unwrap_or_else(QuestionCatalog::builtin));
        tracing::info!(
            questions = catalog.len(),
            tick_rate = self.room_config.tick_rate,
            "server configured"
        );

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomManager::new(self.room_config, catalog)),
            codec: JsonCodec,
        });

        Ok(MazeDuelServer { transport, state })
    }
}

impl Default for MazeDuelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Maze Duel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct MazeDuelServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl MazeDuelServer {
    pub fn builder() -> MazeDuelServerBuilder {
        MazeDuelServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), MazeDuelError> {
        tracing::info!("Maze Duel server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
