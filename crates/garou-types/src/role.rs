use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Villager,
    Seer,
    Medium,
    Bodyguard,
    Werewolf,
    Possessed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Species {
    Human,
    Werewolf,
}

/// Winning side of a finished game. `None` marks an aborted game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Team {
    None,
    Villager,
    Werewolf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentStatus {
    Alive,
    Dead,
}

impl Role {
    pub fn species(self) -> Species {
        match self {
            Role::Werewolf => Species::Werewolf,
            _ => Species::Human,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Villager => "VILLAGER",
            Role::Seer => "SEER",
            Role::Medium => "MEDIUM",
            Role::Bodyguard => "BODYGUARD",
            Role::Werewolf => "WEREWOLF",
            Role::Possessed => "POSSESSED",
        }
    }
}

impl Species {
    pub fn as_str(self) -> &'static str {
        match self {
            Species::Human => "HUMAN",
            Species::Werewolf => "WEREWOLF",
        }
    }
}

impl Team {
    pub fn as_str(self) -> &'static str {
        match self {
            Team::None => "NONE",
            Team::Villager => "VILLAGER",
            Team::Werewolf => "WEREWOLF",
        }
    }
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Alive => "ALIVE",
            AgentStatus::Dead => "DEAD",
        }
    }

    pub fn is_alive(self) -> bool {
        matches!(self, AgentStatus::Alive)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
