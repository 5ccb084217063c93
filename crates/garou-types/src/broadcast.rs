use serde::{Deserialize, Serialize};

/// Spectator-facing event kinds carried by [`BroadcastPacket`].
pub mod event {
    pub const NONE: &str = "none";
    pub const TALK: &str = "talk";
    pub const WHISPER: &str = "whisper";
    pub const VOTE: &str = "vote";
    pub const ATTACK_VOTE: &str = "attackVote";
    pub const EXECUTE: &str = "execute";
    pub const DIVINE: &str = "divine";
    pub const GUARD: &str = "guard";
    pub const ATTACK: &str = "attack";
    pub const RESULT: &str = "result";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastAgent {
    pub idx: u32,
    pub team: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub role: String,
    pub is_alive: bool,
}

/// One realtime event pushed to spectators. `idx` is session-local and
/// strictly monotonic, so a receiver can order packets from one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BroadcastPacket {
    pub id: String,
    pub idx: u64,
    pub day: u32,
    pub is_day: bool,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_idx: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_idx: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bubble_idx: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub agents: Vec<BroadcastAgent>,
}
