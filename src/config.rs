use crate::timeline::DEFAULT_VISUAL_SPAN_SECS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationBackend {
    #[default]
    OpenAi,
    ElevenLabs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "openai_api_key")]
    pub openai_key: String,
    pub openai_base_url: String,
    #[serde(rename = "elevenlabs_api_key")]
    pub elevenlabs_key: String,
    pub eleven_voice_id: String,
    pub eleven_model_id: String,
    pub narration_backend: NarrationBackend,

    pub script_model: String,
    pub script_max_tokens: u32,
    pub script_temperature: f64,
    pub tts_model: String,
    pub tts_voice: String,
    pub image_model: String,
    pub image_size: String,
    pub num_images: usize,
    /// Fail the whole image batch when any single generation fails.
    pub strict_images: bool,

    pub bind_addr: String,
    pub images_dir: PathBuf,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,

    pub video: VideoSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_key: String::new(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            elevenlabs_key: String::new(),
            eleven_voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
            eleven_model_id: "eleven_multilingual_v2".to_string(),
            narration_backend: NarrationBackend::OpenAi,
            script_model: "gpt-3.5-turbo".to_string(),
            script_max_tokens: 300,
            script_temperature: 0.8,
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1792".to_string(),
            num_images: 8,
            strict_images: false,
            bind_addr: "0.0.0.0:8000".to_string(),
            images_dir: PathBuf::from("images"),
            output_dir: PathBuf::from("output"),
            work_dir: PathBuf::from("work"),
            video: VideoSettings::default(),
        }
    }
}

/// Canvas, timing and caption styling for the composed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub visual_span_secs: f64,
    /// Stretch the slideshow over the narration instead of the fixed span.
    pub sync_visuals_to_narration: bool,
    pub font: String,
    pub font_size: u32,
    pub caption_opacity: f64,
    /// Distance in pixels from the top of the frame to the top of the caption.
    pub caption_top: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub write_srt_sidecar: bool,
    /// Program used to render; must be on `PATH` unless given as a path.
    pub ffmpeg_bin: String,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 24,
            visual_span_secs: DEFAULT_VISUAL_SPAN_SECS,
            sync_visuals_to_narration: false,
            font: "Arial".to_string(),
            font_size: 80,
            caption_opacity: 0.8,
            caption_top: 1600,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            write_srt_sidecar: true,
            ffmpeg_bin: "ffmpeg".to_string(),
        }
    }
}

impl Config {
    /// Reads `path` if it exists, then lets `OPENAI_API_KEY` and
    /// `ELEVENLABS_API_KEY` override the keys it carries.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = if fs::metadata(path).await.is_ok() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Self::from_json(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Self::default()
        };

        let config = config.with_env_keys(
            std::env::var("OPENAI_API_KEY").ok(),
            std::env::var("ELEVENLABS_API_KEY").ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_env_keys(mut self, openai: Option<String>, elevenlabs: Option<String>) -> Self {
        if let Some(key) = openai.filter(|k| !k.trim().is_empty()) {
            self.openai_key = key;
        }
        if let Some(key) = elevenlabs.filter(|k| !k.trim().is_empty()) {
            self.elevenlabs_key = key;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_key.is_empty() {
            anyhow::bail!("openai_api_key missing (set it in config.json or OPENAI_API_KEY)");
        }
        if self.narration_backend == NarrationBackend::ElevenLabs && self.elevenlabs_key.is_empty()
        {
            anyhow::bail!("elevenlabs_api_key missing while narration_backend is elevenlabs");
        }
        if self.num_images == 0 {
            anyhow::bail!("num_images must be at least 1");
        }
        let video = &self.video;
        if !video.visual_span_secs.is_finite() || video.visual_span_secs <= 0.0 {
            anyhow::bail!("video.visual_span_secs must be positive");
        }
        if video.width == 0 || video.height == 0 || video.fps == 0 {
            anyhow::bail!("video width, height and fps must be non-zero");
        }
        if video.ffmpeg_bin.trim().is_empty() {
            anyhow::bail!("video.ffmpeg_bin must not be empty");
        }
        if !(0.0..=1.0).contains(&video.caption_opacity) {
            anyhow::bail!("video.caption_opacity must be within 0..=1");
        }
        Ok(())
    }
}
