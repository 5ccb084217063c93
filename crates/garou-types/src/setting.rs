use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Game configuration delivered to every agent with `INITIALIZE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Setting {
    pub agent_count: u32,
    pub role_num_map: HashMap<Role, u32>,
    pub vote_visibility: bool,
    pub talk_on_first_day: bool,
    pub talk: TalkSetting,
    pub whisper: TalkSetting,
    pub vote: VoteSetting,
    pub attack_vote: AttackVoteSetting,
    pub timeout: TimeoutSetting,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TalkSetting {
    pub max_count: MaxCountSetting,
    pub max_length: MaxLengthSetting,
    pub max_skip: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaxCountSetting {
    pub per_agent: u32,
    pub per_day: u32,
}

/// Length budgets for one communication phase. Absent fields disable the
/// corresponding limit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MaxLengthSetting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_agent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_talk: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mention_length: Option<u32>,
    #[serde(default)]
    pub count_in_word: bool,
    #[serde(default)]
    pub count_spaces: bool,
}

impl MaxLengthSetting {
    pub fn is_limited(&self) -> bool {
        self.per_agent.is_some() || self.base_length.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteSetting {
    pub max_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttackVoteSetting {
    pub max_count: u32,
    pub allow_no_target: bool,
}

/// Triple timeout of an agent request, milliseconds.
/// `action <= acceptable <= response`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutSetting {
    pub action_ms: u64,
    pub acceptable_ms: u64,
    pub response_ms: u64,
}
