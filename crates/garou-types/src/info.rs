use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{AgentStatus, Role, Species, Talk};

/// Result of a divination or medium observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Judge {
    pub day: u32,
    pub agent: String,
    pub target: String,
    pub result: Species,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    pub day: u32,
    pub agent: String,
    pub target: String,
}

/// Per-agent view of the world, filtered to what that agent is entitled
/// to see. Built fresh for every request.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Info {
    pub game_id: String,
    pub day: u32,
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium_result: Option<Judge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divine_result: Option<Judge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attacked_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_list: Option<Vec<Vote>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_vote_list: Option<Vec<Vote>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talk_list: Option<Vec<Talk>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whisper_list: Option<Vec<Talk>>,
    pub status_map: HashMap<String, AgentStatus>,
    pub role_map: HashMap<String, Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remain_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remain_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remain_skip: Option<u32>,
}
