use crate::config::VideoSettings;
use crate::timeline::VisualSegment;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Runs a command to completion; the child is killed if the future is dropped.
async fn run_cmd(args: &[String], cwd: Option<&Path>) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.kill_on_drop(true);

    let output = cmd.output().await.context("Command execution failed")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let snippet = stderr.trim().chars().take(800).collect::<String>();
        return Err(anyhow::anyhow!(
            "{} exited with {}: {}",
            args[0],
            output.status,
            snippet
        ));
    }

    Ok(())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .context("ffprobe duration failed")?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffprobe failed for {}", path.display()));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.0 {
        return Err(anyhow::anyhow!(
            "Invalid duration {:?} for {}",
            text,
            path.display()
        ));
    }
    Ok(duration)
}

/// Everything ffmpeg needs to turn stills, narration and a caption track
/// into the final vertical video.
#[derive(Debug, Clone)]
pub struct SlideshowRender<'a> {
    pub images: &'a [PathBuf],
    pub segments: &'a [VisualSegment],
    pub audio: &'a Path,
    /// ASS file name, resolved against the working directory ffmpeg runs in.
    pub subtitles: &'a str,
    pub output: &'a Path,
    pub duration: f64,
    pub settings: &'a VideoSettings,
}

impl SlideshowRender<'_> {
    /// Scale-to-fill and crop each still, join them back to back, burn the
    /// captions in and mux the narration.
    pub fn filter_graph(&self) -> String {
        let (w, h, fps) = (
            self.settings.width,
            self.settings.height,
            self.settings.fps,
        );

        let mut graph = String::new();
        for seg in self.segments {
            graph.push_str(&format!(
                "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1,fps={fps},format=yuv420p[v{i}];",
                i = seg.index
            ));
        }
        for seg in self.segments {
            graph.push_str(&format!("[v{}]", seg.index));
        }
        graph.push_str(&format!(
            "concat=n={}:v=1:a=0[slides];[slides]ass={}[v]",
            self.segments.len(),
            self.subtitles
        ));
        graph
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            self.settings.ffmpeg_bin.clone(),
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];

        for seg in self.segments {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                self.settings.fps.to_string(),
                "-t".to_string(),
                format!("{:.6}", seg.duration()),
                "-i".to_string(),
                self.images[seg.index].display().to_string(),
            ]);
        }

        args.extend([
            "-i".to_string(),
            self.audio.display().to_string(),
            "-filter_complex".to_string(),
            self.filter_graph(),
            "-map".to_string(),
            "[v]".to_string(),
            "-map".to_string(),
            format!("{}:a", self.segments.len()),
            "-r".to_string(),
            self.settings.fps.to_string(),
            "-c:v".to_string(),
            self.settings.video_codec.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-crf".to_string(),
            "22".to_string(),
            "-c:a".to_string(),
            self.settings.audio_codec.clone(),
            "-b:a".to_string(),
            "192k".to_string(),
            "-t".to_string(),
            format!("{:.3}", self.duration),
            "-movflags".to_string(),
            "+faststart".to_string(),
            self.output.display().to_string(),
        ]);
        args
    }
}

pub async fn ffmpeg_render_slideshow(render: &SlideshowRender<'_>, cwd: &Path) -> Result<bool> {
    run_cmd(&render.args(), Some(cwd)).await?;
    Ok(render.output.exists())
}
