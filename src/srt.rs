use crate::timeline::Caption;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

/// `HH:MM:SS,mmm`
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_s / 3600,
        (total_s / 60) % 60,
        total_s % 60,
        ms
    )
}

pub fn render_srt(captions: &[Caption]) -> String {
    let mut out = String::new();
    for (idx, caption) in captions.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            idx + 1,
            format_srt_timestamp(caption.start),
            format_srt_timestamp(caption.end),
            caption.word
        ));
    }
    out
}

pub async fn write_srt(captions: &[Caption], output_srt: &Path) -> Result<()> {
    fs::write(output_srt, render_srt(captions))
        .await
        .with_context(|| format!("write srt: {}", output_srt.display()))
}
