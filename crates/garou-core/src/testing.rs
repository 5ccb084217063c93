use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use garou_types::{Packet, Request, Role, Setting};

use crate::agent::Agent;
use crate::config::Config;
use crate::connection::{AgentTransport, Connection, ConnectionError};
use crate::service::{AgentSummary, TextLog};

/// What a scripted agent does with the next request it receives.
pub enum ScriptedAction {
    Respond(String),
    RespondAfter(u64, String),
    Silent,
    Fail,
}

/// In-memory transport driven by a handler closure: every frame the engine
/// sends is parsed back into a [`Packet`] and handed to the handler, whose
/// action decides the reply. All sent packets are recorded for assertions.
pub struct ScriptedTransport {
    handler: Box<dyn FnMut(&Packet) -> ScriptedAction + Send>,
    pending: Option<ScriptedAction>,
    sent: Arc<Mutex<Vec<Packet>>>,
    closed: bool,
}

impl ScriptedTransport {
    pub fn new(handler: impl FnMut(&Packet) -> ScriptedAction + Send + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            pending: None,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: false,
        }
    }

    pub fn sent_log(&self) -> Arc<Mutex<Vec<Packet>>> {
        self.sent.clone()
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        let packet: Packet = serde_json::from_str(&text)
            .map_err(|err| ConnectionError::Transport(err.to_string()))?;
        self.sent.lock().unwrap().push(packet.clone());
        self.pending = Some((self.handler)(&packet));
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        match self.pending.take() {
            None | Some(ScriptedAction::Silent) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some(ScriptedAction::Respond(text)) => Ok(text),
            Some(ScriptedAction::RespondAfter(delay_ms, text)) => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                Ok(text)
            }
            Some(ScriptedAction::Fail) => {
                Err(ConnectionError::Transport("scripted failure".into()))
            }
        }
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

/// Default five-agent setting with timeouts tightened for tests.
pub fn fast_setting() -> Setting {
    let mut setting = Config::default().build_setting().unwrap();
    setting.timeout.action_ms = 50;
    setting.timeout.acceptable_ms = 80;
    setting.timeout.response_ms = 120;
    setting
}

pub fn scripted_agent(
    idx: u32,
    role: Role,
    handler: impl FnMut(&Packet) -> ScriptedAction + Send + 'static,
) -> (Agent, Arc<Mutex<Vec<Packet>>>) {
    let transport = ScriptedTransport::new(handler);
    let log = transport.sent_log();
    let agent = Agent::new(
        idx,
        role,
        Connection::new(
            Box::new(transport),
            format!("team{idx}"),
            format!("orig{idx}"),
        ),
    );
    (agent, log)
}

/// Agent that answers every prompt with the same text.
pub fn talker(idx: u32, role: Role, text: &str) -> (Agent, Arc<Mutex<Vec<Packet>>>) {
    let text = text.to_string();
    scripted_agent(idx, role, move |_| ScriptedAction::Respond(text.clone()))
}

/// Agent that answers a fixed target name to every targeted request and
/// `Over` to every talk prompt.
pub fn voter(idx: u32, role: Role, target: &str) -> (Agent, Arc<Mutex<Vec<Packet>>>) {
    let target = target.to_string();
    scripted_agent(idx, role, move |packet| match packet.request {
        Request::Talk | Request::Whisper => ScriptedAction::Respond("Over".into()),
        _ => ScriptedAction::Respond(target.clone()),
    })
}

/// Text log that keeps every appended line in memory.
#[derive(Default)]
pub struct RecordingLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Arc<Mutex<Vec<String>>> {
        self.lines.clone()
    }
}

impl TextLog for RecordingLog {
    fn begin_session(&self, _id: &str, _agents: &[AgentSummary]) {}

    fn append(&self, _id: &str, line: String) {
        self.lines.lock().unwrap().push(line);
    }

    fn end_session(&self, _id: &str) {}
}
