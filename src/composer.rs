use crate::config::VideoSettings;
use crate::error::ComposeError;
use crate::ffmpeg::{self, SlideshowRender};
use crate::media::{AudioTrack, ImageSet};
use crate::script::Script;
use crate::timeline::CompositionPlan;
use crate::{logi, logok, logw, srt, subtitle};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Turns stills, narration and script into one captioned video file.
#[async_trait]
pub trait VideoComposer: Send + Sync {
    async fn compose(
        &self,
        images: &ImageSet,
        audio: &AudioTrack,
        script: &Script,
        output: &Path,
    ) -> Result<PathBuf, ComposeError>;
}

pub struct FfmpegComposer {
    settings: VideoSettings,
}

impl FfmpegComposer {
    pub fn new(settings: VideoSettings) -> Self {
        Self { settings }
    }

    /// Slideshow length: the fixed span unless the settings ask to follow the
    /// narration instead.
    fn visual_span(&self, audio: &AudioTrack) -> f64 {
        if self.settings.sync_visuals_to_narration {
            audio.duration
        } else {
            self.settings.visual_span_secs
        }
    }

    pub fn plan(
        &self,
        images: &ImageSet,
        audio: &AudioTrack,
        script: &Script,
    ) -> Result<CompositionPlan, ComposeError> {
        CompositionPlan::build(
            images.len(),
            script.words(),
            audio.duration,
            self.visual_span(audio),
        )
    }
}

/// Files removed when dropped, unless released with [`ScratchFiles::keep`].
struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    fn keep(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            if path.exists() {
                if let Err(err) = std::fs::remove_file(path) {
                    logw(format!("Could not remove {}: {}", path.display(), err));
                }
            }
        }
    }
}

async fn absolute_readable(path: &Path) -> Result<PathBuf, ComposeError> {
    fs::canonicalize(path)
        .await
        .map_err(|source| ComposeError::UnreadableAsset {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl VideoComposer for FfmpegComposer {
    async fn compose(
        &self,
        images: &ImageSet,
        audio: &AudioTrack,
        script: &Script,
        output: &Path,
    ) -> Result<PathBuf, ComposeError> {
        let plan = self.plan(images, audio, script)?;
        if plan.visual_duration() != audio.duration {
            logw(format!(
                "Slideshow runs {:.2}s but narration runs {:.2}s; they will not line up.",
                plan.visual_duration(),
                audio.duration
            ));
        }

        let mut image_paths = Vec::with_capacity(images.len());
        for image in images.iter() {
            image_paths.push(absolute_readable(image).await?);
        }
        let audio_path = absolute_readable(&audio.path).await?;

        let out_dir = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&out_dir).await?;
        let out_dir = fs::canonicalize(&out_dir).await?;
        let file_name = output
            .file_name()
            .ok_or_else(|| ComposeError::RenderFailed {
                reason: format!("output path has no file name: {}", output.display()),
            })?;
        let out_abs = out_dir.join(file_name);

        // The name is spliced into the filter graph, so keep it to safe characters.
        let stem: String = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let ass_name = format!(".{stem}.captions.ass");
        let ass_path = out_dir.join(&ass_name);

        // Held across the render: if this future is dropped mid-way the
        // caption track and any half-written video go with it.
        let mut scratch = ScratchFiles::new(vec![ass_path.clone(), out_abs.clone()]);
        fs::write(&ass_path, subtitle::render_ass(&plan.captions, &self.settings)).await?;

        logi(format!(
            "Rendering {} images ({:.2}s each) and {} captions ({:.2}s each) -> {}",
            plan.segments.len(),
            plan.segments[0].duration(),
            plan.captions.len(),
            plan.captions[0].duration(),
            out_abs.display()
        ));

        let render = SlideshowRender {
            images: &image_paths,
            segments: &plan.segments,
            audio: &audio_path,
            subtitles: &ass_name,
            output: &out_abs,
            duration: plan.visual_duration(),
            settings: &self.settings,
        };

        match ffmpeg::ffmpeg_render_slideshow(&render, &out_dir).await {
            Ok(true) => scratch.keep(&out_abs),
            Ok(false) => {
                return Err(ComposeError::RenderFailed {
                    reason: format!("ffmpeg produced no file at {}", out_abs.display()),
                });
            }
            Err(err) => {
                return Err(ComposeError::RenderFailed {
                    reason: format!("{err:#}"),
                });
            }
        }
        drop(scratch);

        if self.settings.write_srt_sidecar {
            let srt_path = out_abs.with_extension("srt");
            if let Err(err) = srt::write_srt(&plan.captions, &srt_path).await {
                logw(format!("Caption sidecar not written: {err:#}"));
            }
        }

        logok(format!("Video saved to {}", out_abs.display()));
        Ok(output.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composer() -> FfmpegComposer {
        FfmpegComposer::new(VideoSettings::default())
    }

    /// Stand-in for ffmpeg: `$out` is the last argument, `body` runs after.
    #[cfg(unix)]
    fn stand_in_ffmpeg(dir: &Path, body: &str) -> FfmpegComposer {
        use std::os::unix::fs::PermissionsExt;

        let bin = dir.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let script = bin.join("ffmpeg.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\nfor arg in \"$@\"; do out=\"$arg\"; done\n{body}\n"),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        FfmpegComposer::new(VideoSettings {
            ffmpeg_bin: script.display().to_string(),
            ..VideoSettings::default()
        })
    }

    #[cfg(unix)]
    fn assets(dir: &Path) -> (ImageSet, AudioTrack) {
        let media = dir.join("media");
        std::fs::create_dir_all(&media).unwrap();
        for name in ["a.png", "b.png", "voice.mp3"] {
            std::fs::write(media.join(name), b"x").unwrap();
        }
        (
            ImageSet::new(vec![media.join("a.png"), media.join("b.png")]),
            AudioTrack::new(media.join("voice.mp3"), 4.0),
        )
    }

    #[cfg(unix)]
    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn empty_image_set_fails_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("video.mp4");
        let err = composer()
            .compose(
                &ImageSet::default(),
                &AudioTrack::new(dir.path().join("voice.mp3"), 5.0),
                &Script::new("You can do it"),
                &out,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::NoImages));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn empty_script_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = composer()
            .compose(
                &ImageSet::new(vec![dir.path().join("a.png")]),
                &AudioTrack::new(dir.path().join("voice.mp3"), 5.0),
                &Script::new("   "),
                &dir.path().join("video.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::NoWords));
    }

    #[tokio::test]
    async fn missing_image_is_an_unreadable_asset() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("voice.mp3");
        fs::write(&audio, b"mp3").await.unwrap();
        let missing = dir.path().join("nope.png");

        let err = composer()
            .compose(
                &ImageSet::new(vec![missing.clone()]),
                &AudioTrack::new(&audio, 5.0),
                &Script::new("Keep going"),
                &dir.path().join("video.mp4"),
            )
            .await
            .unwrap_err();
        match err {
            ComposeError::UnreadableAsset { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plan_uses_fixed_span_by_default() {
        let images = ImageSet::new((0..6).map(|i| PathBuf::from(format!("{i}.png"))).collect());
        let audio = AudioTrack::new("voice.mp3", 42.0);
        let plan = composer()
            .plan(&images, &audio, &Script::new("one two three"))
            .unwrap();
        assert_eq!(plan.visual_duration(), 60.0);
        assert!((plan.segments[0].duration() - 10.0).abs() < 1e-9);
        assert_eq!(plan.caption_duration(), 42.0);
    }

    #[test]
    fn plan_can_follow_narration_length() {
        let settings = VideoSettings {
            sync_visuals_to_narration: true,
            ..VideoSettings::default()
        };
        let images = ImageSet::new(vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
        let audio = AudioTrack::new("voice.mp3", 42.0);
        let plan = FfmpegComposer::new(settings)
            .plan(&images, &audio, &Script::new("one two"))
            .unwrap();
        assert_eq!(plan.visual_duration(), 42.0);
        assert!((plan.segments[0].duration() - 21.0).abs() < 1e-9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_render_keeps_video_and_sidecar_only() {
        let dir = tempfile::tempdir().unwrap();
        let (images, audio) = assets(dir.path());
        let out = dir.path().join("output/job.mp4");

        // Lists the render directory into the video so the caption track's
        // presence during the render can be checked.
        let video = stand_in_ffmpeg(dir.path(), r#"ls -a > "$out""#)
            .compose(&images, &audio, &Script::new("Dream big"), &out)
            .await
            .unwrap();

        assert_eq!(video, out);
        let listing = std::fs::read_to_string(&out).unwrap();
        assert!(listing.contains(".job.captions.ass"));
        assert_eq!(file_names(&dir.path().join("output")), ["job.mp4", "job.srt"]);

        let srt = std::fs::read_to_string(dir.path().join("output/job.srt")).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\nDream\n"));
        assert!(srt.contains("Dream") && srt.contains("big"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sidecar_can_be_switched_off() {
        let dir = tempfile::tempdir().unwrap();
        let (images, audio) = assets(dir.path());
        let out = dir.path().join("output/job.mp4");
        let mut composer = stand_in_ffmpeg(dir.path(), r#"printf mp4 > "$out""#);
        composer.settings.write_srt_sidecar = false;

        composer
            .compose(&images, &audio, &Script::new("Dream big"), &out)
            .await
            .unwrap();
        assert_eq!(file_names(&dir.path().join("output")), ["job.mp4"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_render_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let (images, audio) = assets(dir.path());
        let out = dir.path().join("output/job.mp4");

        let err = stand_in_ffmpeg(
            dir.path(),
            r#"printf partial > "$out"; echo "encoder exploded" >&2; exit 1"#,
        )
        .compose(&images, &audio, &Script::new("Dream big"), &out)
        .await
        .unwrap_err();

        match err {
            ComposeError::RenderFailed { reason } => assert!(reason.contains("encoder exploded")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(file_names(&dir.path().join("output")).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn render_without_output_file_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (images, audio) = assets(dir.path());
        let out = dir.path().join("output/job.mp4");

        let err = stand_in_ffmpeg(dir.path(), "exit 0")
            .compose(&images, &audio, &Script::new("Dream big"), &out)
            .await
            .unwrap_err();

        match err {
            ComposeError::RenderFailed { reason } => assert!(reason.contains("produced no file")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(file_names(&dir.path().join("output")).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn abandoned_render_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let (images, audio) = assets(dir.path());
        let out = dir.path().join("output/job.mp4");
        let composer = stand_in_ffmpeg(dir.path(), r#"printf partial > "$out"; exec sleep 30"#);

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(1500),
            composer.compose(&images, &audio, &Script::new("Dream big"), &out),
        )
        .await;

        assert!(outcome.is_err());
        assert!(file_names(&dir.path().join("output")).is_empty());
    }
}
