//! `LycanServer` builder and accept loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lycan_protocol::{JsonCodec, UserId};
use lycan_room::RoomManager;
use lycan_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{LycanError, ServerConfig};

/// State shared by every connection task.
pub(crate) struct ServerState {
    pub(crate) rooms: Mutex<RoomManager>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
    next_user_id: AtomicU64,
}

impl ServerState {
    fn new(config: ServerConfig) -> Self {
        Self {
            rooms: Mutex::new(RoomManager::new(config.room.clone())),
            codec: JsonCodec,
            config,
            // 0 is reserved for the narrator.
            next_user_id: AtomicU64::new(1),
        }
    }

    /// Hands out a process-unique participant id.
    pub(crate) fn allocate_user_id(&self) -> UserId {
        UserId(self.next_user_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Builder for configuring and starting a lycan server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn start() -> Result<(), lycan::LycanError> {
/// let server = lycan::LycanServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LycanServerBuilder {
    config: ServerConfig,
}

impl LycanServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the listen address.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.listen_addr = addr.to_string();
        self
    }

    /// Binds the WebSocket listener.
    pub async fn build(self) -> Result<LycanServer, LycanError> {
        let transport = WebSocketTransport::bind(&self.config.listen_addr).await?;
        Ok(LycanServer {
            transport,
            state: Arc::new(ServerState::new(self.config)),
        })
    }
}

/// A bound lycan server. Call [`run()`](Self::run) to start accepting.
pub struct LycanServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl LycanServer {
    pub fn builder() -> LycanServerBuilder {
        LycanServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection is served by its own task.
    pub async fn run(mut self) -> Result<(), LycanError> {
        tracing::info!(addr = %self.state.config.listen_addr, "lycan server running");

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
