use std::time::{Duration, Instant};

use garou_types::{Packet, Profile, Role, TimeoutSetting};
use tokio::time::timeout;
use tracing::warn;

use crate::connection::{Connection, ConnectionError};

/// One participant of one game: identity, role, profile, and the
/// connection it answers on. Lives exactly as long as its session.
pub struct Agent {
    pub idx: u32,
    pub team_name: String,
    pub original_name: String,
    pub game_name: String,
    pub role: Role,
    pub profile: Option<Profile>,
    pub has_error: bool,
    connection: Connection,
}

impl Agent {
    pub fn new(idx: u32, role: Role, connection: Connection) -> Self {
        Self {
            idx,
            team_name: connection.team_name.clone(),
            original_name: connection.original_name.clone(),
            game_name: format!("Agent[{idx:02}]"),
            role,
            profile: None,
            has_error: false,
            connection,
        }
    }

    pub fn with_profile(idx: u32, role: Role, connection: Connection, profile: Profile) -> Self {
        let mut agent = Self::new(idx, role, connection);
        agent.game_name = profile.name.clone();
        agent.profile = Some(profile);
        agent
    }

    /// Display name as other agents and spectators see it.
    pub fn name(&self) -> &str {
        &self.game_name
    }

    pub fn voice_id(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.voice_id.as_deref())
    }

    /// Sends one request frame and, for request kinds that carry a reply,
    /// waits for it under the triple timeout:
    ///
    /// - a reply within `action_ms` is the normal case;
    /// - a reply within `(action_ms, acceptable_ms]` was merely slow and
    ///   clears the error flag;
    /// - a reply within `(acceptable_ms, response_ms]` is still used but
    ///   leaves the flag set;
    /// - nothing by `response_ms` is a timeout and sets the flag.
    pub async fn send_packet(
        &mut self,
        packet: &Packet,
        timeouts: TimeoutSetting,
    ) -> Result<String, ConnectionError> {
        let frame = serde_json::to_string(packet)
            .map_err(|err| ConnectionError::Protocol(err.to_string()))?;
        if let Err(err) = self.connection.transport.send(frame).await {
            self.has_error = true;
            return Err(err);
        }
        if !packet.request.expects_response() {
            return Ok(String::new());
        }

        let started = Instant::now();
        let received = timeout(
            Duration::from_millis(timeouts.response_ms),
            self.connection.transport.recv(),
        )
        .await;
        match received {
            Err(_) => {
                self.has_error = true;
                Err(ConnectionError::Timeout)
            }
            Ok(Err(err)) => {
                self.has_error = true;
                Err(err)
            }
            Ok(Ok(text)) => {
                let elapsed = started.elapsed();
                if elapsed > Duration::from_millis(timeouts.acceptable_ms) {
                    warn!(agent = %self.game_name, ?elapsed, "response arrived past the acceptable window");
                    self.has_error = true;
                } else if elapsed > Duration::from_millis(timeouts.action_ms) {
                    self.has_error = false;
                }
                Ok(text)
            }
        }
    }

    pub async fn close(&mut self) {
        self.connection.transport.close().await;
    }
}
