use crate::api::elevenlabs::ElevenLabsClient;
use crate::api::openai::OpenAiClient;
use crate::api::{ImageProvider, NarrationProvider, ScriptProvider};
use crate::composer::{FfmpegComposer, VideoComposer};
use crate::config::{Config, NarrationBackend};
use crate::error::PipelineError;
use crate::media::ImageSet;
use crate::progress::{ProgressEvent, Stage};
use crate::script::Script;
use crate::{logi, logok, logw};
use anyhow::{Context, Result};
use chrono::Local;
use rand::Rng;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::mpsc;

const IMAGE_PROMPT_PREFIX: &str = "Motivational, vertical, TikTok-style background for: ";
const IMAGE_PROMPT_SCRIPT_CHARS: usize = 100;

/// Unique per run: local timestamp plus a random suffix.
pub fn new_job_id() -> String {
    format!(
        "{}_{:08x}",
        Local::now().format("%Y%m%d_%H%M%S"),
        rand::thread_rng().r#gen::<u32>()
    )
}

pub fn image_prompt(script: &Script) -> String {
    format!(
        "{}{}",
        IMAGE_PROMPT_PREFIX,
        script.excerpt(IMAGE_PROMPT_SCRIPT_CHARS)
    )
}

/// Where one run's files live. Every name carries the job id so concurrent
/// runs never share a path.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub images_dir: PathBuf,
    pub work_dir: PathBuf,
    pub video: PathBuf,
}

impl Job {
    pub fn new(id: impl Into<String>, dirs: &OutputDirs) -> Self {
        let id = id.into();
        Self {
            images_dir: dirs.images.clone(),
            work_dir: dirs.work.join(&id),
            video: dirs.output.join(format!("{id}.mp4")),
            id,
        }
    }

    pub fn audio(&self) -> PathBuf {
        self.work_dir.join("narration.mp3")
    }

    pub fn image_file_name(&self, index: usize) -> String {
        format!("{}_image_{}.png", self.id, index)
    }

    pub fn image_path(&self, index: usize) -> PathBuf {
        self.images_dir.join(self.image_file_name(index))
    }
}

#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub images: PathBuf,
    pub output: PathBuf,
    pub work: PathBuf,
}

impl OutputDirs {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            images: cfg.images_dir.clone(),
            output: cfg.output_dir.clone(),
            work: cfg.work_dir.clone(),
        }
    }
}

/// The services a pipeline drives, in call order.
pub struct Providers {
    pub script: Arc<dyn ScriptProvider>,
    pub narration: Arc<dyn NarrationProvider>,
    pub images: Arc<dyn ImageProvider>,
    pub composer: Arc<dyn VideoComposer>,
}

/// Progress sink for one run; absent for the blocking endpoint.
struct Reporter<'a> {
    tx: Option<&'a mpsc::Sender<ProgressEvent>>,
}

impl Reporter<'_> {
    async fn emit(&self, event: ProgressEvent) -> Result<(), PipelineError> {
        match self.tx {
            Some(tx) => tx.send(event).await.map_err(|_| PipelineError::Cancelled),
            None => Ok(()),
        }
    }

    /// Drives `fut` unless the consumer disconnects first.
    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, PipelineError> {
        match self.tx {
            Some(tx) => tokio::select! {
                biased;
                _ = tx.closed() => Err(PipelineError::Cancelled),
                out = fut => Ok(out),
            },
            None => Ok(fut.await),
        }
    }
}

/// script -> voice -> images -> video, strictly in sequence.
pub struct Pipeline {
    providers: Providers,
    dirs: OutputDirs,
    num_images: usize,
    strict_images: bool,
}

impl Pipeline {
    pub fn new(providers: Providers, dirs: OutputDirs, num_images: usize, strict_images: bool) -> Self {
        Self {
            providers,
            dirs,
            num_images,
            strict_images,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        let openai = Arc::new(OpenAiClient::new(client.clone(), cfg));
        let narration: Arc<dyn NarrationProvider> = match cfg.narration_backend {
            NarrationBackend::OpenAi => openai.clone(),
            NarrationBackend::ElevenLabs => Arc::new(ElevenLabsClient::new(client, cfg)),
        };

        let providers = Providers {
            script: openai.clone(),
            narration,
            images: openai,
            composer: Arc::new(FfmpegComposer::new(cfg.video.clone())),
        };
        Ok(Self::new(
            providers,
            OutputDirs::from_config(cfg),
            cfg.num_images,
            cfg.strict_images,
        ))
    }

    pub fn images_dir(&self) -> &Path {
        &self.dirs.images
    }

    /// Builds one video without progress reporting.
    pub async fn run(&self) -> Result<PathBuf, PipelineError> {
        let job = Job::new(new_job_id(), &self.dirs);
        self.execute(&job, &Reporter { tx: None }).await
    }

    /// Builds one video, streaming events to `tx`. The last event sent is
    /// either `done` or `error`; dropping the receiver cancels the run.
    pub async fn run_with_progress(
        &self,
        tx: mpsc::Sender<ProgressEvent>,
    ) -> Result<PathBuf, PipelineError> {
        let job = Job::new(new_job_id(), &self.dirs);
        let reporter = Reporter { tx: Some(&tx) };

        match self.execute(&job, &reporter).await {
            Ok(video) => {
                let _ = tx.send(ProgressEvent::done(&video)).await;
                Ok(video)
            }
            Err(PipelineError::Cancelled) => {
                logw(format!("Job {} cancelled: client disconnected", job.id));
                Err(PipelineError::Cancelled)
            }
            Err(err) => {
                logw(format!("Job {} failed: {}", job.id, err));
                let _ = tx.send(ProgressEvent::error(err.to_string())).await;
                Err(err)
            }
        }
    }

    async fn execute(&self, job: &Job, reporter: &Reporter<'_>) -> Result<PathBuf, PipelineError> {
        logi(format!("=== Job {} ===", job.id));
        reporter
            .emit(ProgressEvent::status(Stage::Init, "Starting generation..."))
            .await?;

        reporter
            .emit(ProgressEvent::status(Stage::Script, "Generating script..."))
            .await?;
        let text = reporter
            .guard(self.providers.script.generate_script())
            .await?
            .map_err(|e| PipelineError::provider(Stage::Script, e))?;
        let script = Script::new(text);
        if script.is_empty() {
            return Err(PipelineError::provider(
                Stage::Script,
                anyhow::anyhow!("script provider returned no text"),
            ));
        }
        logok(format!("Script generated: {} words", script.word_count()));
        reporter
            .emit(ProgressEvent::script_generated(script.text()))
            .await?;

        reporter
            .emit(ProgressEvent::status(Stage::Voice, "Generating voiceover..."))
            .await?;
        fs::create_dir_all(&job.work_dir)
            .await
            .map_err(|e| PipelineError::resource(&job.work_dir, e))?;
        let audio = reporter
            .guard(self.providers.narration.narrate(script.text(), &job.audio()))
            .await?
            .map_err(|e| PipelineError::provider(Stage::Voice, e))?;
        logok(format!(
            "Voiceover ready: {} ({:.2}s)",
            audio.path.display(),
            audio.duration
        ));
        reporter
            .emit(ProgressEvent::voice_generated(&audio.path))
            .await?;

        reporter
            .emit(ProgressEvent::status(Stage::Images, "Generating images..."))
            .await?;
        let images = self.collect_images(job, &script, reporter).await?;
        reporter
            .emit(ProgressEvent::all_images_generated(images.paths()))
            .await?;

        reporter
            .emit(ProgressEvent::status(Stage::Video, "Creating video..."))
            .await?;
        let composed = reporter
            .guard(
                self.providers
                    .composer
                    .compose(&images, &audio, &script, &job.video),
            )
            .await;
        // Narration has been muxed (or the run is over); nothing reads it again.
        if let Err(err) = fs::remove_dir_all(&job.work_dir).await {
            logw(format!(
                "Could not remove scratch dir {}: {}",
                job.work_dir.display(),
                err
            ));
        }
        let video = composed??;
        reporter.emit(ProgressEvent::video_created(&video)).await?;

        logok(format!("Job {} done: {}", job.id, video.display()));
        Ok(video)
    }

    /// Up to `num_images` generations; failed items are skipped unless
    /// `strict_images` is set.
    async fn collect_images(
        &self,
        job: &Job,
        script: &Script,
        reporter: &Reporter<'_>,
    ) -> Result<ImageSet, PipelineError> {
        fs::create_dir_all(&job.images_dir)
            .await
            .map_err(|e| PipelineError::resource(&job.images_dir, e))?;

        let prompt = image_prompt(script);
        logi(format!("Generating {} images...", self.num_images));

        let mut paths = Vec::with_capacity(self.num_images);
        for i in 0..self.num_images {
            let out = job.image_path(i);
            let outcome = reporter
                .guard(self.providers.images.generate_image(&prompt, &out))
                .await?;

            let failure = match outcome {
                Ok(true) => {
                    let url = format!("/images/{}", job.image_file_name(i));
                    reporter
                        .emit(ProgressEvent::image_generated(paths.len(), &out, url))
                        .await?;
                    logok(format!("Image {} saved to {}", i + 1, out.display()));
                    paths.push(out);
                    continue;
                }
                Ok(false) => anyhow::anyhow!("image {} returned no usable result", i + 1),
                Err(err) => err.context(format!("image {} failed", i + 1)),
            };

            if self.strict_images {
                return Err(PipelineError::provider(Stage::Images, failure));
            }
            logw(format!("Skipping: {failure:#}"));
        }

        if paths.is_empty() {
            return Err(PipelineError::provider(
                Stage::Images,
                anyhow::anyhow!("no images were generated"),
            ));
        }
        if paths.len() < self.num_images {
            logw(format!(
                "Only {} of {} images generated",
                paths.len(),
                self.num_images
            ));
        }
        Ok(ImageSet::new(paths))
    }
}
