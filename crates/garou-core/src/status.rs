use std::collections::HashMap;

use garou_types::{AgentStatus, Species, Talk};

/// A vote as the engine stores it, keyed by agent index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRecord {
    pub day: u32,
    pub agent: u32,
    pub target: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeRecord {
    pub day: u32,
    pub agent: u32,
    pub target: u32,
    pub result: Species,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardRecord {
    pub day: u32,
    pub agent: u32,
    pub target: u32,
}

/// World snapshot for one day. The session owns one per day; a snapshot
/// is sealed once the day advances. Death is recorded, never deletion:
/// every agent stays in `status_map` for the whole game.
#[derive(Debug, Clone, Default)]
pub struct GameStatus {
    pub day: u32,
    pub status_map: HashMap<u32, AgentStatus>,
    pub talks: Vec<Talk>,
    pub whispers: Vec<Talk>,
    pub votes: Vec<VoteRecord>,
    pub attack_votes: Vec<VoteRecord>,
    pub executed_agent: Option<u32>,
    pub attacked_agent: Option<u32>,
    pub divine_result: Option<JudgeRecord>,
    pub medium_result: Option<JudgeRecord>,
    pub guard: Option<GuardRecord>,
}

impl GameStatus {
    pub fn initial(agent_idxs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            day: 0,
            status_map: agent_idxs
                .into_iter()
                .map(|idx| (idx, AgentStatus::Alive))
                .collect(),
            ..Self::default()
        }
    }

    /// Rollover: carries the life/death map forward and clears every
    /// per-day field.
    pub fn next_day(&self) -> Self {
        Self {
            day: self.day + 1,
            status_map: self.status_map.clone(),
            ..Self::default()
        }
    }

    pub fn is_alive(&self, idx: u32) -> bool {
        self.status_map
            .get(&idx)
            .is_some_and(|status| status.is_alive())
    }

    pub fn mark_dead(&mut self, idx: u32) {
        self.status_map.insert(idx, AgentStatus::Dead);
    }
}
