use anyhow::{Context, Result};
use motivational_shorts::config::Config;
use motivational_shorts::generator::Pipeline;
use motivational_shorts::{init, init_tracing};
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let dest = std::env::args().nth(1).map(PathBuf::from);
    let cfg = Config::load("config.json").await?;
    init::ensure_directories(&cfg).await?;

    if !init::check_ffmpeg(&cfg.video.ffmpeg_bin).await {
        warn!("FFmpeg not found in PATH. Please install FFmpeg.");
    }

    let video = Pipeline::from_config(&cfg)?.run().await?;
    info!("Video written to {}", video.display());

    if let Some(dest) = dest {
        tokio::fs::copy(&video, &dest)
            .await
            .with_context(|| format!("Failed to copy video to {}", dest.display()))?;
        info!("Copied to {}", dest.display());
    }

    println!("{}", video.display());
    Ok(())
}
