use std::time::Duration;

use garou_core::{Speaker, TtsConfig};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::warn;

struct SpeakRequest {
    game_id: String,
    text: String,
    voice: Option<String>,
}

/// Hands utterances to an external speech-synthesis endpoint through a
/// bounded queue; overflow and request failures are dropped, never felt
/// by the game.
pub struct TtsClient {
    tx: mpsc::Sender<SpeakRequest>,
    default_voice: Option<String>,
}

impl TtsClient {
    pub fn new(config: &TtsConfig) -> Self {
        let (tx, mut rx) = mpsc::channel::<SpeakRequest>(config.queue_size.max(1));
        let endpoint = config.endpoint.clone();
        let timeout = Duration::from_millis(config.timeout_ms);
        tokio::spawn(async move {
            let client = match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => client,
                Err(err) => {
                    warn!("tts client could not be built: {err}");
                    return;
                }
            };
            while let Some(request) = rx.recv().await {
                let body = json!({
                    "game_id": request.game_id,
                    "text": request.text,
                    "voice": request.voice,
                });
                if let Err(err) = client.post(&endpoint).json(&body).send().await {
                    warn!(game_id = %request.game_id, "tts request failed: {err}");
                }
            }
        });
        Self {
            tx,
            default_voice: config.default_voice.clone(),
        }
    }
}

impl Speaker for TtsClient {
    fn speak(&self, id: &str, text: &str, voice: Option<&str>) {
        let request = SpeakRequest {
            game_id: id.to_string(),
            text: text.to_string(),
            voice: voice
                .map(str::to_string)
                .or_else(|| self.default_voice.clone()),
        };
        if self.tx.try_send(request).is_err() {
            warn!(game_id = %id, "tts queue full, dropping utterance");
        }
    }
}
