use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use garou_core::{AgentSummary, EventLogConfig, EventSink};
use garou_types::{Packet, Team};
use serde_json::{json, Value};
use tracing::warn;

use super::expand_filename;

struct EventLog {
    filename: String,
    agents: Vec<Value>,
    entries: Vec<Value>,
    pending: HashMap<String, (i64, Value)>,
    winner: Team,
}

/// Structured per-game record: the roster, every request/response pair
/// with timestamps, and the final winner. Flushed on every response.
pub struct EventLogService {
    output_dir: PathBuf,
    template: String,
    games: Mutex<HashMap<String, EventLog>>,
}

impl EventLogService {
    pub fn new(config: &EventLogConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            template: config.filename.clone(),
            games: Mutex::new(HashMap::new()),
        }
    }

    fn save(&self, id: &str, log: &EventLog) {
        let document = json!({
            "game_id": id,
            "win_side": log.winner,
            "agents": log.agents,
            "entries": log.entries,
        });
        if let Err(err) = std::fs::create_dir_all(&self.output_dir) {
            warn!("failed to create event log dir: {err}");
            return;
        }
        let path = self.output_dir.join(format!("{}.json", log.filename));
        match serde_json::to_vec(&document) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(&path, bytes) {
                    warn!(path = %path.display(), "failed to write event log: {err}");
                }
            }
            Err(err) => warn!("failed to serialize event log: {err}"),
        }
    }
}

impl EventSink for EventLogService {
    fn begin_session(&self, id: &str, agents: &[AgentSummary]) {
        let roster = agents
            .iter()
            .map(|a| {
                json!({
                    "idx": a.idx,
                    "team": a.team,
                    "name": a.name,
                    "role": a.role,
                })
            })
            .collect();
        let mut games = self.games.lock().unwrap();
        games.insert(
            id.to_string(),
            EventLog {
                filename: expand_filename(&self.template, id, agents),
                agents: roster,
                entries: Vec::new(),
                pending: HashMap::new(),
                winner: Team::None,
            },
        );
    }

    fn record_request(&self, id: &str, agent: &str, packet: &Packet) {
        let mut games = self.games.lock().unwrap();
        if let Some(log) = games.get_mut(id) {
            let serialized = serde_json::to_value(packet).unwrap_or(Value::Null);
            log.pending.insert(
                agent.to_string(),
                (chrono::Utc::now().timestamp_millis(), serialized),
            );
        }
    }

    fn record_response(&self, id: &str, agent: &str, response: Result<&str, &str>) {
        let mut games = self.games.lock().unwrap();
        let Some(log) = games.get_mut(id) else {
            return;
        };
        let now = chrono::Utc::now().timestamp_millis();
        let mut entry = json!({
            "agent": agent,
            "response_timestamp": now,
        });
        if let Some((requested_at, packet)) = log.pending.remove(agent) {
            entry["request_timestamp"] = json!(requested_at);
            entry["request"] = packet;
        }
        match response {
            Ok(text) if !text.is_empty() => entry["response"] = json!(text),
            Ok(_) => {}
            Err(error) => entry["error"] = json!(error),
        }
        log.entries.push(entry);
        self.save(id, log);
    }

    fn end_session(&self, id: &str, winner: Team) {
        let mut games = self.games.lock().unwrap();
        if let Some(mut log) = games.remove(id) {
            log.winner = winner;
            self.save(id, &log);
        }
    }
}
