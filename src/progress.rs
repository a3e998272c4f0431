use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Pipeline section an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Init,
    Script,
    Voice,
    Images,
    Video,
    Done,
    Error,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Script => "script",
            Self::Voice => "voice",
            Self::Images => "images",
            Self::Video => "video",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status update on the progress stream.
///
/// Serialized as a flat JSON object; optional fields are omitted when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub section: Stage,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

impl ProgressEvent {
    pub fn status(section: Stage, status: impl Into<String>) -> Self {
        Self {
            section,
            status: status.into(),
            script: None,
            audio_path: None,
            image_path: None,
            image_url: None,
            image_paths: None,
            video_path: None,
        }
    }

    pub fn script_generated(script: &str) -> Self {
        Self {
            script: Some(script.to_string()),
            ..Self::status(Stage::Script, "Script generated")
        }
    }

    pub fn voice_generated(audio: &Path) -> Self {
        Self {
            audio_path: Some(path_string(audio)),
            ..Self::status(Stage::Voice, "Voiceover generated")
        }
    }

    /// `index` is zero-based; the status text counts from one.
    pub fn image_generated(index: usize, image: &Path, url: impl Into<String>) -> Self {
        Self {
            image_path: Some(path_string(image)),
            image_url: Some(url.into()),
            ..Self::status(Stage::Images, format!("Image {} generated", index + 1))
        }
    }

    pub fn all_images_generated(images: &[impl AsRef<Path>]) -> Self {
        Self {
            image_paths: Some(images.iter().map(|p| path_string(p.as_ref())).collect()),
            ..Self::status(Stage::Images, "All images generated")
        }
    }

    pub fn video_created(video: &Path) -> Self {
        Self {
            video_path: Some(path_string(video)),
            ..Self::status(Stage::Video, "Video created")
        }
    }

    pub fn done(video: &Path) -> Self {
        Self {
            video_path: Some(path_string(video)),
            ..Self::status(Stage::Done, "done")
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::status(Stage::Error, message)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"section":"error","status":"event serialization failed"}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn status_event_omits_unset_fields() {
        let ev = ProgressEvent::status(Stage::Init, "Starting generation...");
        assert_eq!(
            ev.to_json(),
            r#"{"section":"init","status":"Starting generation..."}"#
        );
    }

    #[test]
    fn image_event_counts_from_one() {
        let ev = ProgressEvent::image_generated(
            2,
            Path::new("images/job_image_2.png"),
            "/images/job_image_2.png",
        );
        let value: serde_json::Value = serde_json::from_str(&ev.to_json()).unwrap();
        assert_eq!(value["section"], "images");
        assert_eq!(value["status"], "Image 3 generated");
        assert_eq!(value["image_path"], "images/job_image_2.png");
        assert_eq!(value["image_url"], "/images/job_image_2.png");
    }

    #[test]
    fn all_images_event_lists_paths_in_order() {
        let paths = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let ev = ProgressEvent::all_images_generated(&paths);
        assert_eq!(
            ev.image_paths,
            Some(vec!["a.png".to_string(), "b.png".to_string()])
        );
    }

    #[test]
    fn done_and_error_events() {
        let done = ProgressEvent::done(Path::new("output/job.mp4"));
        assert_eq!(done.section, Stage::Done);
        assert_eq!(done.status, "done");
        assert_eq!(done.video_path.as_deref(), Some("output/job.mp4"));
        assert_eq!(
            ProgressEvent::error("boom").to_json(),
            r#"{"section":"error","status":"boom"}"#
        );
    }

    #[test]
    fn events_round_trip_through_json() {
        let ev = ProgressEvent::script_generated("Keep going.");
        let back: ProgressEvent = serde_json::from_str(&ev.to_json()).unwrap();
        assert_eq!(back, ev);
    }
}
