use anyhow::Result;
use motivational_shorts::config::Config;
use motivational_shorts::generator::Pipeline;
use motivational_shorts::server::{self, AppState};
use motivational_shorts::{init, init_tracing};
use std::sync::Arc;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load("config.json").await?;

    init::ensure_directories(&cfg).await?;
    // Scratch files from earlier runs are never read again.
    init::clear_directory_contents(&cfg.work_dir).await?;

    if !init::check_ffmpeg(&cfg.video.ffmpeg_bin).await {
        warn!("FFmpeg not found in PATH. Please install FFmpeg.");
    }

    let state = Arc::new(AppState {
        pipeline: Arc::new(Pipeline::from_config(&cfg)?),
    });
    server::serve(&cfg.bind_addr, state).await
}
