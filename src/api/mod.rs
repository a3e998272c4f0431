//! Contracts for the three generation services plus their HTTP clients.

use crate::media::AudioTrack;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

pub mod elevenlabs;
pub mod openai;

pub(crate) async fn save_bytes(out_path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    fs::write(out_path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", out_path.display()))
}

#[async_trait]
pub trait ScriptProvider: Send + Sync {
    async fn generate_script(&self) -> Result<String>;
}

#[async_trait]
pub trait NarrationProvider: Send + Sync {
    /// Writes speech for `text` to `out_path` and reports its duration.
    async fn narrate(&self, text: &str, out_path: &Path) -> Result<AudioTrack>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates one image into `out_path`. `Ok(false)` means the service
    /// answered but gave nothing usable.
    async fn generate_image(&self, prompt: &str, out_path: &Path) -> Result<bool>;
}
