//! `RelayServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → coordinator → rooms.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ludo_relay_protocol::{Codec, JsonCodec};
use ludo_relay_transport::{
    Transport, TransportError, WebSocketTransport, DEFAULT_HEALTH_BODY,
};
use tokio::sync::Mutex;

use crate::config::{DEFAULT_PING_INTERVAL, RelayConfig};
use crate::handler::handle_connection;
use crate::{RelayError, SessionCoordinator};

/// Shared server state passed to each connection task.
///
/// The coordinator sits behind a single mutex: every event is handled to
/// completion under the lock, which serializes all registry mutations.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: Mutex<SessionCoordinator>,
    pub(crate) codec: C,
    pub(crate) ping_interval: Duration,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use ludo_relay::prelude::*;
///
/// # async fn run() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:3001")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    bind_addr: String,
    ping_interval: Duration,
    health_body: String,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: RelayConfig::default().bind_addr(),
            ping_interval: DEFAULT_PING_INTERVAL,
            health_body: DEFAULT_HEALTH_BODY.to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets how often idle connections are pinged.
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Sets the body returned to plain HTTP requests.
    pub fn health_body(mut self, body: impl Into<String>) -> Self {
        self.health_body = body.into();
        self
    }

    /// Applies the bind address and ping interval from `config`.
    pub fn config(self, config: &RelayConfig) -> Self {
        self.bind(&config.bind_addr())
            .ping_interval(config.ping_interval)
    }

    /// Binds the listener and returns a server ready to [`run`](RelayServer::run).
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build(self) -> Result<RelayServer<JsonCodec>, RelayError> {
        let transport =
            WebSocketTransport::bind(&self.bind_addr, self.health_body).await?;

        let state = Arc::new(ServerState {
            coordinator: Mutex::new(SessionCoordinator::new()),
            codec: JsonCodec,
            ping_interval: self.ping_interval,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl RelayServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<C: Codec> RelayServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RelayError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then stops the
    /// transport. Connections already being served keep running.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), RelayError> {
        tracing::info!("relay server running");
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                () = &mut shutdown => None,
                accepted = self.transport.accept() => Some(accepted),
            };
            let Some(accepted) = accepted else {
                self.transport.shutdown().await?;
                tracing::info!("relay server stopped");
                return Ok(());
            };

            match accepted {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(TransportError::Shutdown) => return Ok(()),
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
