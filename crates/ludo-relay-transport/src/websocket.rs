//! WebSocket transport served through `axum`.
//!
//! One HTTP server handles the whole port. `GET /` with an upgrade request
//! becomes a WebSocket connection handed to [`Transport::accept`]; a plain
//! `GET /` (load balancer health checks, `curl`) gets the liveness body. Anything
//! else is a 404.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc, watch};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Body returned to plain HTTP requests.
pub const DEFAULT_HEALTH_BODY: &str = "Hello from the Ludo relay server";

/// Upgraded sockets waiting for `accept`.
const ACCEPT_BACKLOG: usize = 128;

/// Router state shared by every HTTP request.
struct Gateway {
    health_body: String,
    upgraded: mpsc::Sender<WebSocketConnection>,
}

/// A WebSocket [`Transport`] listening on one TCP port.
///
/// The HTTP server runs in its own task from [`bind`](Self::bind) on, so
/// handshakes proceed concurrently and a stalled peer only stalls itself.
/// Dropping the transport stops the server.
pub struct WebSocketTransport {
    local_addr: SocketAddr,
    upgraded: mpsc::Receiver<WebSocketConnection>,
    stop: watch::Sender<bool>,
}

impl WebSocketTransport {
    /// Binds to `addr` and starts serving. Plain `GET /` requests are
    /// answered with `health_body`.
    pub async fn bind(
        addr: &str,
        health_body: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        let local_addr =
            listener.local_addr().map_err(TransportError::BindFailed)?;

        let (tx, upgraded) = mpsc::channel(ACCEPT_BACKLOG);
        let gateway = Arc::new(Gateway {
            health_body: health_body.into(),
            upgraded: tx,
        });
        let router = Router::new()
            .route("/", get(upgrade_or_health).fallback(not_found))
            .fallback(not_found)
            .with_state(gateway);

        let (stop, mut stopped) = watch::channel(false);
        tokio::spawn(async move {
            let signal = async move {
                // A dropped sender counts as a stop too.
                let _ = stopped.wait_for(|stop| *stop).await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await
            {
                tracing::error!(error = %e, "HTTP server failed");
            }
            tracing::debug!("HTTP server stopped");
        });

        tracing::info!(%local_addr, "WebSocket transport listening");
        Ok(Self {
            local_addr,
            upgraded,
            stop,
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let stopped = *self.stop.borrow();
        if stopped {
            return Err(TransportError::Shutdown);
        }
        self.upgraded.recv().await.ok_or(TransportError::Shutdown)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.stop.send_replace(true);
        tracing::info!(local_addr = %self.local_addr, "WebSocket transport shutting down");
        Ok(())
    }
}

async fn upgrade_or_health(
    State(gateway): State<Arc<Gateway>>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => ws
            .on_upgrade(move |socket| admit(gateway, socket))
            .into_response(),
        // A broken handshake gets axum's rejection, not the health page.
        Err(rejection) if headers.contains_key(header::UPGRADE) => {
            rejection.into_response()
        }
        Err(_) => Html(gateway.health_body.clone()).into_response(),
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn admit(gateway: Arc<Gateway>, socket: WebSocket) {
    let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    let (sink, stream) = socket.split();
    let conn = WebSocketConnection {
        id,
        sink: Mutex::new(sink),
        stream: Mutex::new(stream),
    };
    tracing::debug!(%id, "accepted WebSocket connection");
    if gateway.upgraded.send(conn).await.is_err() {
        tracing::debug!(%id, "transport closed, dropping connection");
    }
}

/// A single WebSocket connection.
///
/// The sink and stream halves are locked separately, so a task parked in
/// [`recv`](Connection::recv) never holds up outbound traffic.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// UTF-8 payloads go out as text frames, anything else as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(Bytes::copy_from_slice(data)),
        };
        self.sink.lock().await.send(msg).await.map_err(send_failed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::other(e),
                    ));
                }
            }
        }
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(send_failed)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(send_failed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

fn send_failed(e: axum::Error) -> TransportError {
    TransportError::SendFailed(std::io::Error::other(e))
}
