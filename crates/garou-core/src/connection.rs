use async_trait::async_trait;
use thiserror::Error;

/// Errors observable on one agent connection. `Protocol` marks a
/// malformed outgoing request (an internal bug) and is the only kind
/// that aborts a session; the rest are absorbed per-agent.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("connection closed")]
    Closed,
    #[error("timed out waiting for agent response")]
    Timeout,
    #[error("malformed outgoing request: {0}")]
    Protocol(String),
}

impl ConnectionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConnectionError::Protocol(_))
    }
}

/// One duplex text-message transport to an external agent. The engine is
/// written against this seam so games run the same over a websocket or an
/// in-memory duplex in tests.
#[async_trait]
pub trait AgentTransport: Send {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError>;
    async fn recv(&mut self) -> Result<String, ConnectionError>;
    /// Closes the underlying socket. Idempotent.
    async fn close(&mut self);
}

/// An authenticated connection waiting for (or bound to) a game. The
/// team name and the client-reported name are learned during the NAME
/// handshake before the connection enters a waiting room.
pub struct Connection {
    pub transport: Box<dyn AgentTransport>,
    pub team_name: String,
    pub original_name: String,
}

impl Connection {
    pub fn new(
        transport: Box<dyn AgentTransport>,
        team_name: impl Into<String>,
        original_name: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            team_name: team_name.into(),
            original_name: original_name.into(),
        }
    }
}
