use anyhow::{bail, Context};
use garou_core::DynamicProfileConfig;
use garou_types::Profile;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
struct GeneratedProfile {
    name: String,
    age: u32,
    gender: String,
    personality: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Generates game personas by calling an OpenAI-compatible
/// chat-completions endpoint with a strict JSON-schema response format,
/// one call per avatar, retrying until names are unique.
pub struct ProfileGenerator {
    client: reqwest::Client,
    config: DynamicProfileConfig,
}

impl ProfileGenerator {
    pub fn new(config: &DynamicProfileConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    pub async fn generate_profiles(&self, count: usize) -> anyhow::Result<Vec<Profile>> {
        if self.config.avatars.len() < count {
            bail!(
                "{} avatars configured but {count} profiles requested",
                self.config.avatars.len()
            );
        }
        let mut avatars = self.config.avatars.clone();
        avatars.shuffle(&mut rand::thread_rng());

        let mut profiles = Vec::with_capacity(count);
        let mut names: Vec<String> = Vec::with_capacity(count);
        for avatar in avatars.into_iter().take(count) {
            let profile = self.generate_unique(&avatar, &names).await?;
            names.push(profile.name.clone());
            profiles.push(profile);
        }
        Ok(profiles)
    }

    async fn generate_unique(
        &self,
        avatar: &str,
        taken_names: &[String],
    ) -> anyhow::Result<Profile> {
        for _ in 0..self.config.attempts.max(1) {
            let generated = self.generate_one(avatar).await?;
            if !taken_names.contains(&generated.name) {
                info!(name = %generated.name, avatar, "generated profile");
                return Ok(Profile {
                    name: generated.name,
                    avatar_url: avatar.to_string(),
                    age: generated.age,
                    gender: generated.gender,
                    personality: generated.personality,
                    voice_id: None,
                });
            }
        }
        bail!("could not generate a uniquely named profile for {avatar}")
    }

    async fn generate_one(&self, avatar: &str) -> anyhow::Result<GeneratedProfile> {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "age": {"type": "number"},
                "gender": {"type": "string"},
                "personality": {"type": "string"}
            },
            "required": ["name", "age", "gender", "personality"],
            "additionalProperties": false
        });
        let body = json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": self.config.prompt},
                    {"type": "image_url", "image_url": {"url": avatar}}
                ]
            }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "profile", "strict": true, "schema": schema}
            },
            "max_tokens": 300
        });

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response: ChatCompletionResponse = request
            .send()
            .await
            .context("profile generation request failed")?
            .json()
            .await
            .context("profile generation response was not json")?;
        let Some(choice) = response.choices.into_iter().next() else {
            bail!("profile generation returned no choices");
        };
        serde_json::from_str(&choice.message.content)
            .context("generated profile did not match the schema")
    }
}
