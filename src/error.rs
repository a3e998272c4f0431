use crate::progress::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the video composition step.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("cannot compose a video from an empty image set")]
    NoImages,

    #[error("script contains no words to caption")]
    NoWords,

    #[error("narration duration must be a positive number of seconds, got {0}")]
    InvalidDuration(f64),

    #[error("visual span must be a positive number of seconds, got {0}")]
    InvalidSpan(f64),

    #[error("unreadable asset: {}", .path.display())]
    UnreadableAsset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("video render failed: {reason}")]
    RenderFailed { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error of one pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} generation failed: {message}")]
    Provider { stage: Stage, message: String },

    #[error("composition failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("resource error at {}: {reason}", .path.display())]
    Resource { path: PathBuf, reason: String },

    #[error("generation cancelled: progress consumer went away")]
    Cancelled,
}

impl PipelineError {
    /// Wraps a provider failure, keeping the whole `anyhow` context chain in the message.
    pub fn provider(stage: Stage, err: anyhow::Error) -> Self {
        Self::Provider {
            stage,
            message: format!("{err:#}"),
        }
    }

    pub fn resource(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Resource {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_keeps_context_chain() {
        let err = anyhow::anyhow!("HTTP 429").context("OpenAI request failed");
        let wrapped = PipelineError::provider(Stage::Script, err);
        assert_eq!(
            wrapped.to_string(),
            "script generation failed: OpenAI request failed: HTTP 429"
        );
    }

    #[test]
    fn compose_errors_convert_into_pipeline_errors() {
        let err: PipelineError = ComposeError::NoImages.into();
        assert!(matches!(err, PipelineError::Compose(ComposeError::NoImages)));
        assert_eq!(
            err.to_string(),
            "composition failed: cannot compose a video from an empty image set"
        );
    }
}
