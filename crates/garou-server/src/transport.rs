use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use garou_core::{AgentTransport, ConnectionError};

/// [`AgentTransport`] over one accepted websocket. Control frames are
/// handled transparently; only text frames reach the engine.
pub struct WsTransport {
    socket: WebSocket,
    closed: bool,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            closed: false,
        }
    }
}

#[async_trait]
impl AgentTransport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|err| ConnectionError::Transport(err.to_string()))
    }

    async fn recv(&mut self) -> Result<String, ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Close(_))) | None => {
                    self.closed = true;
                    return Err(ConnectionError::Closed);
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => return Err(ConnectionError::Transport(err.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.socket.send(Message::Close(None)).await;
    }
}
