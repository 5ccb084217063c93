use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use garou_types::{
    AttackVoteSetting, MaxCountSetting, MaxLengthSetting, Profile, Role, Setting, TalkSetting,
    TimeoutSetting, VoteSetting,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub game: GameConfig,
    pub game_log: GameLogConfig,
    pub event_log: EventLogConfig,
    pub realtime: RealtimeConfig,
    pub tts: TtsConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub authentication: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 10000,
            authentication: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub enable: bool,
    /// Shared secret; prefer `GAROU_AUTH_SECRET` over the config file.
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub agent_count: u32,
    /// Fraction of errored agents at which a game gives up.
    pub max_continue_error_ratio: f64,
    pub timeout: TimeoutSetting,
    pub talk_on_first_day: bool,
    pub vote_visibility: bool,
    pub talk: TalkSetting,
    pub whisper: TalkSetting,
    pub vote: VoteSetting,
    pub attack_vote: AttackVoteSetting,
    /// Explicit role distribution; defaults to the preset for
    /// `agent_count` when absent.
    pub role_num_map: Option<HashMap<Role, u32>>,
    pub custom_profile: CustomProfileConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            agent_count: 5,
            max_continue_error_ratio: 0.5,
            timeout: TimeoutSetting {
                action_ms: 60_000,
                acceptable_ms: 90_000,
                response_ms: 120_000,
            },
            talk_on_first_day: true,
            vote_visibility: false,
            talk: default_talk_setting(),
            whisper: default_talk_setting(),
            vote: VoteSetting { max_count: 1 },
            attack_vote: AttackVoteSetting {
                max_count: 1,
                allow_no_target: false,
            },
            role_num_map: None,
            custom_profile: CustomProfileConfig::default(),
        }
    }
}

fn default_talk_setting() -> TalkSetting {
    TalkSetting {
        max_count: MaxCountSetting {
            per_agent: 4,
            per_day: 10,
        },
        max_length: MaxLengthSetting::default(),
        max_skip: 2,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CustomProfileConfig {
    pub enable: bool,
    pub profiles: Vec<Profile>,
    pub dynamic: DynamicProfileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicProfileConfig {
    pub enable: bool,
    pub prompt: String,
    pub avatars: Vec<String>,
    pub attempts: u32,
    pub endpoint: String,
    pub model: String,
    /// Prefer `GAROU_TEXTGEN_API_KEY` over the config file.
    pub api_key: Option<String>,
}

impl Default for DynamicProfileConfig {
    fn default() -> Self {
        Self {
            enable: false,
            prompt: String::new(),
            avatars: Vec::new(),
            attempts: 3,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameLogConfig {
    pub enable: bool,
    pub output_dir: String,
    pub filename: String,
}

impl Default for GameLogConfig {
    fn default() -> Self {
        Self {
            enable: false,
            output_dir: "./log".to_string(),
            filename: "{timestamp}_{teams}_{game_id}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    pub enable: bool,
    pub output_dir: String,
    pub filename: String,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            enable: false,
            output_dir: "./json".to_string(),
            filename: "{timestamp}_{teams}_{game_id}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub enable: bool,
    pub channel_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enable: false,
            channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub enable: bool,
    pub endpoint: String,
    pub default_voice: Option<String>,
    pub queue_size: usize,
    pub timeout_ms: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enable: false,
            endpoint: String::new(),
            default_voice: None,
            queue_size: 64,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MatchingConfig {
    pub optimize: bool,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var("GAROU_AUTH_SECRET") {
            if !secret.trim().is_empty() {
                self.server.authentication.secret = secret;
            }
        }
        if let Ok(key) = std::env::var("GAROU_TEXTGEN_API_KEY") {
            if !key.trim().is_empty() {
                self.game.custom_profile.dynamic.api_key = Some(key);
            }
        }
    }

    /// The game settings delivered to agents, derived from config.
    pub fn build_setting(&self) -> anyhow::Result<Setting> {
        let game = &self.game;
        let timeout = game.timeout;
        if timeout.action_ms > timeout.acceptable_ms || timeout.acceptable_ms > timeout.response_ms
        {
            bail!("timeouts must satisfy action <= acceptable <= response");
        }
        let role_num_map = match &game.role_num_map {
            Some(map) => map.clone(),
            None => role_preset(game.agent_count)?,
        };
        let total: u32 = role_num_map.values().sum();
        if total != game.agent_count {
            bail!(
                "role distribution covers {total} agents but agent_count is {}",
                game.agent_count
            );
        }
        Ok(Setting {
            agent_count: game.agent_count,
            role_num_map,
            vote_visibility: game.vote_visibility,
            talk_on_first_day: game.talk_on_first_day,
            talk: game.talk.clone(),
            whisper: game.whisper.clone(),
            vote: game.vote.clone(),
            attack_vote: game.attack_vote.clone(),
            timeout,
        })
    }
}

fn role_preset(agent_count: u32) -> anyhow::Result<HashMap<Role, u32>> {
    let preset: &[(Role, u32)] = match agent_count {
        5 => &[
            (Role::Werewolf, 1),
            (Role::Possessed, 1),
            (Role::Seer, 1),
            (Role::Villager, 2),
        ],
        13 => &[
            (Role::Werewolf, 3),
            (Role::Possessed, 1),
            (Role::Seer, 1),
            (Role::Medium, 1),
            (Role::Bodyguard, 1),
            (Role::Villager, 6),
        ],
        _ => bail!("no role preset for {agent_count} agents; set role_num_map explicitly"),
    };
    Ok(preset.iter().copied().collect())
}
