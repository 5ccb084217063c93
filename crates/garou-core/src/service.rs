use std::sync::Arc;

use garou_types::{BroadcastPacket, Packet, Role, Team};

/// Roster entry handed to the log sinks when a session begins.
#[derive(Debug, Clone)]
pub struct AgentSummary {
    pub idx: u32,
    pub team: String,
    pub name: String,
    pub role: Role,
}

/// Structured request/response sink (the JSON game record). Failures are
/// the implementation's problem; the engine never sees them.
pub trait EventSink: Send + Sync {
    fn begin_session(&self, id: &str, agents: &[AgentSummary]);
    fn record_request(&self, id: &str, agent: &str, packet: &Packet);
    fn record_response(&self, id: &str, agent: &str, response: Result<&str, &str>);
    fn end_session(&self, id: &str, winner: Team);
}

/// Line-oriented game log (`day,event,...` records).
pub trait TextLog: Send + Sync {
    fn begin_session(&self, id: &str, agents: &[AgentSummary]);
    fn append(&self, id: &str, line: String);
    fn end_session(&self, id: &str);
}

/// Realtime spectator fan-out. Must not block: a slow subscriber is the
/// implementation's problem.
pub trait LiveBroadcast: Send + Sync {
    fn emit(&self, packet: BroadcastPacket);
}

/// Text-to-speech hand-off for spoken utterances.
pub trait Speaker: Send + Sync {
    fn speak(&self, id: &str, text: &str, voice: Option<&str>);
}

/// The optional out-of-core collaborators a session reports to.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub event_sink: Option<Arc<dyn EventSink>>,
    pub text_log: Option<Arc<dyn TextLog>>,
    pub live: Option<Arc<dyn LiveBroadcast>>,
    pub speaker: Option<Arc<dyn Speaker>>,
}
