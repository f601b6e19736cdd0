//! Per-connection handler: outbound writer, inbound dispatch, cleanup.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Register an outbound channel with the coordinator
//!   2. Spawn a writer task that drains the channel and sends keepalive pings
//!   3. Loop: receive frames → decode → hand to the coordinator
//!   4. On exit, the drop guard runs the disconnect protocol

use std::sync::Arc;
use std::time::Duration;

use ludo_relay_protocol::{ClientEvent, Codec, ServerEvent};
use ludo_relay_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::server::ServerState;
use crate::RelayError;

/// How long a close handshake may take before the socket is just dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Drop guard that runs the disconnect protocol when the handler exits.
///
/// `Drop` is synchronous, so the async lock is taken in a spawned task.
struct DisconnectGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let departure = state.coordinator.lock().await.disconnect(conn_id);
            if let Some(departure) = departure {
                tracing::info!(
                    %conn_id,
                    room_code = %departure.code,
                    room_closed = departure.room_closed(),
                    "seat released"
                );
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RelayError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, "client connected");

    let (tx, rx) = mpsc::unbounded_channel();
    state.coordinator.lock().await.connect(conn_id, tx);
    let _guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    let mut writer =
        tokio::spawn(write_loop(Arc::clone(&conn), Arc::clone(&state), rx));

    let result = loop {
        let data = tokio::select! {
            incoming = conn.recv() => match incoming {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::info!(%conn_id, "client disconnected");
                    break Ok(());
                }
                Err(e) => break Err(RelayError::from(e)),
            },
            outcome = &mut writer => {
                break match outcome {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "writer task failed");
                        Ok(())
                    }
                };
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
                continue;
            }
        };

        tracing::debug!(
            %conn_id,
            event = event.name(),
            room_code = event.room_code(),
            "event received"
        );
        state.coordinator.lock().await.handle(conn_id, event);
    };

    writer.abort();
    // Aborting releases the sink lock once the writer is dropped.
    match tokio::time::timeout(CLOSE_TIMEOUT, conn.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(%conn_id, error = %e, "close failed"),
        Err(_) => tracing::debug!(%conn_id, "close timed out"),
    }
    // _guard drops here → disconnect fires.
    result
}

/// Drains the connection's outbound channel and pings on every interval.
///
/// Returns `Ok(())` once the coordinator drops the channel, or the first
/// send error (which is how a dead peer is detected).
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut outbound: mpsc::UnboundedReceiver<ServerEvent>,
) -> Result<(), RelayError> {
    let mut keepalive = tokio::time::interval(state.ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    keepalive.tick().await;

    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(event) = event else {
                    return Ok(());
                };
                tracing::trace!(conn_id = %conn.id(), event = event.name(), "sending");
                let bytes = state.codec.encode(&event)?;
                conn.send(&bytes).await?;
            }
            _ = keepalive.tick() => {
                conn.ping().await?;
            }
        }
    }
}
