use serde::{Deserialize, Serialize};

/// Public persona of an agent within one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

impl Profile {
    /// Free-text description delivered to the agent itself with
    /// `INITIALIZE`.
    pub fn description(&self) -> String {
        format!(
            "{} ({}, {}): {}",
            self.name, self.age, self.gender, self.personality
        )
    }
}
