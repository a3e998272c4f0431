use crate::api::{ImageProvider, NarrationProvider, ScriptProvider, save_bytes};
use crate::config::Config;
use crate::ffmpeg;
use crate::media::AudioTrack;
use crate::{logi, logw};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::path::Path;

const SCRIPT_PROMPT: &str = "Write a 60-second motivational TikTok script. \
The script should be energetic, positive, and suitable for a vertical video. \
Keep it concise and inspiring.";

/// OpenAI-backed script, speech and image generation.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    script_model: String,
    script_max_tokens: u32,
    script_temperature: f64,
    tts_model: String,
    tts_voice: String,
    image_model: String,
    image_size: String,
}

impl OpenAiClient {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_key: cfg.openai_key.clone(),
            base_url: cfg.openai_base_url.trim_end_matches('/').to_string(),
            script_model: cfg.script_model.clone(),
            script_max_tokens: cfg.script_max_tokens,
            script_temperature: cfg.script_temperature,
            tts_model: cfg.tts_model.clone(),
            tts_voice: cfg.tts_voice.clone(),
            image_model: cfg.image_model.clone(),
            image_size: cfg.image_size.clone(),
        }
    }

    fn script_request(&self) -> serde_json::Value {
        json!({
            "model": self.script_model,
            "messages": [{"role": "user", "content": SCRIPT_PROMPT}],
            "max_tokens": self.script_max_tokens,
            "temperature": self.script_temperature,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn post_json(&self, endpoint: &str, body: &serde_json::Value) -> Result<String> {
        let resp = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            log_openai_error(&raw);
            anyhow::bail!("OpenAI {} returned HTTP {}", endpoint, status.as_u16());
        }
        Ok(raw)
    }
}

fn log_openai_error(resp_json: &str) {
    let root: serde_json::Value = match serde_json::from_str(resp_json) {
        Ok(value) => value,
        Err(_) => {
            if !resp_json.is_empty() {
                let snippet = resp_json.chars().take(800).collect::<String>();
                logw(format!("OpenAI raw body: {}", snippet));
            }
            return;
        }
    };

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error message: {}", msg));
        }
        if let Some(typ) = err.get("type").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error type: {}", typ));
        }
        if let Some(code) = err.get("code").and_then(|v| v.as_str()) {
            logw(format!("OpenAI error code: {}", code));
        }
    }
}

/// `choices[0].message.content`, trimmed.
fn extract_chat_content(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;
    let content = root
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?;
    Some(content.trim().to_string())
}

/// `data[0].url`, if the generation produced one.
fn extract_image_url(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;
    let url = root.get("data")?.as_array()?.first()?.get("url")?.as_str()?;
    if url.is_empty() {
        return None;
    }
    Some(url.to_string())
}

#[async_trait]
impl ScriptProvider for OpenAiClient {
    async fn generate_script(&self) -> Result<String> {
        logi("Generating motivational TikTok script...");
        let raw = self
            .post_json("chat/completions", &self.script_request())
            .await?;
        let script = match extract_chat_content(&raw) {
            Some(text) => text,
            None => {
                log_openai_error(&raw);
                String::new()
            }
        };
        logi(format!("Script generated ({} chars)", script.len()));
        Ok(script)
    }
}

#[async_trait]
impl NarrationProvider for OpenAiClient {
    async fn narrate(&self, text: &str, out_path: &Path) -> Result<AudioTrack> {
        logi("Generating voiceover using OpenAI TTS...");
        let body = json!({
            "model": self.tts_model,
            "voice": self.tts_voice,
            "input": text,
        });

        let resp = self
            .client
            .post(self.url("audio/speech"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI speech request failed")?;

        let status = resp.status();
        if !status.is_success() {
            log_openai_error(&resp.text().await.unwrap_or_default());
            anyhow::bail!("OpenAI speech returned HTTP {}", status.as_u16());
        }

        let bytes = resp
            .bytes()
            .await
            .context("OpenAI speech response read failed")?;
        save_bytes(out_path, &bytes).await?;

        let duration = ffmpeg::ffprobe_duration_seconds(out_path).await?;
        logi(format!(
            "Voiceover saved to {} ({:.2}s)",
            out_path.display(),
            duration
        ));
        Ok(AudioTrack::new(out_path, duration))
    }
}

#[async_trait]
impl ImageProvider for OpenAiClient {
    async fn generate_image(&self, prompt: &str, out_path: &Path) -> Result<bool> {
        let body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": self.image_size,
        });

        let raw = self.post_json("images/generations", &body).await?;
        let Some(image_url) = extract_image_url(&raw) else {
            logw("OpenAI image response carried no URL.");
            return Ok(false);
        };

        let resp = self
            .client
            .get(&image_url)
            .send()
            .await
            .context("Image download failed")?;
        if !resp.status().is_success() {
            logw(format!(
                "Image download failed HTTP {}",
                resp.status().as_u16()
            ));
            return Ok(false);
        }

        let bytes = resp.bytes().await.context("Image download read failed")?;
        if bytes.is_empty() {
            return Ok(false);
        }
        save_bytes(out_path, &bytes).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_content_is_trimmed() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"\n  Rise and grind!  \n"}}]}"#;
        assert_eq!(extract_chat_content(raw).as_deref(), Some("Rise and grind!"));
    }

    #[test]
    fn chat_content_missing_for_error_bodies() {
        let raw = r#"{"error":{"message":"Rate limit","type":"requests","code":"rate_limit_exceeded"}}"#;
        assert_eq!(extract_chat_content(raw), None);
        assert_eq!(extract_chat_content("not json"), None);
    }

    #[test]
    fn image_url_taken_from_first_item() {
        let raw = r#"{"created":1,"data":[{"url":"https://img.example/1.png","revised_prompt":"x"}]}"#;
        assert_eq!(
            extract_image_url(raw).as_deref(),
            Some("https://img.example/1.png")
        );
    }

    #[test]
    fn image_url_absent_or_empty_is_none() {
        assert_eq!(extract_image_url(r#"{"data":[]}"#), None);
        assert_eq!(extract_image_url(r#"{"data":[{"url":""}]}"#), None);
        assert_eq!(extract_image_url(r#"{"data":[{"b64_json":"AAAA"}]}"#), None);
    }

    #[test]
    fn script_request_sends_temperature_as_written() {
        let client = OpenAiClient::new(Client::new(), &Config::default());
        let body = client.script_request().to_string();
        assert!(body.contains(r#""temperature":0.8"#), "{body}");
        assert!(body.contains(r#""max_tokens":300"#));
        assert!(body.contains(r#""model":"gpt-3.5-turbo""#));
    }

    #[test]
    fn urls_join_without_double_slash() {
        let cfg = Config {
            openai_base_url: "https://api.openai.com/v1/".into(),
            ..Config::default()
        };
        let client = OpenAiClient::new(Client::new(), &cfg);
        assert_eq!(
            client.url("audio/speech"),
            "https://api.openai.com/v1/audio/speech"
        );
    }
}
