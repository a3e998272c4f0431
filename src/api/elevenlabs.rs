use crate::api::{NarrationProvider, save_bytes};
use crate::config::Config;
use crate::ffmpeg;
use crate::media::AudioTrack;
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;

/// ElevenLabs text-to-speech, an alternative narration voice.
#[derive(Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.elevenlabs_key.clone(),
            voice_id: cfg.eleven_voice_id.clone(),
            model_id: cfg.eleven_model_id.clone(),
        }
    }

    fn url(&self) -> String {
        format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
            self.voice_id
        )
    }
}

#[async_trait]
impl NarrationProvider for ElevenLabsClient {
    async fn narrate(&self, text: &str, out_path: &Path) -> Result<AudioTrack> {
        logi("Generating voiceover using ElevenLabs...");
        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
        });

        let resp = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .timeout(std::time::Duration::from_secs(300))
            .send()
            .await
            .context("ElevenLabs request failed")?;

        if !resp.status().is_success() {
            let code = resp.status().as_u16();
            logw(format!("ElevenLabs TTS failed HTTP {}", code));
            anyhow::bail!("ElevenLabs TTS returned HTTP {}", code);
        }

        let bytes = resp.bytes().await.context("ElevenLabs response read failed")?;
        save_bytes(out_path, &bytes).await?;

        let duration = ffmpeg::ffprobe_duration_seconds(out_path).await?;
        Ok(AudioTrack::new(out_path, duration))
    }
}
