/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Writing a frame to the peer failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame from the peer failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The listening socket could not be bound.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// The transport was shut down and accepts no more connections.
    #[error("transport shut down")]
    Shutdown,
}
