use crate::config::Config;
use crate::logi;
use anyhow::Result;
use std::path::Path;
use tokio::fs;
use walkdir::WalkDir;

pub async fn ensure_directories(cfg: &Config) -> Result<()> {
    for dir in [&cfg.images_dir, &cfg.output_dir, &cfg.work_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir).await?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

/// Empties `dir_path` but keeps the directory itself.
pub async fn clear_directory_contents(dir_path: &Path) -> Result<()> {
    if !dir_path.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(dir_path).min_depth(1).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_dir() {
            fs::remove_dir(path).await.ok();
        } else {
            fs::remove_file(path).await.ok();
        }
    }

    Ok(())
}

pub async fn check_ffmpeg(ffmpeg_bin: &str) -> bool {
    match tokio::process::Command::new(ffmpeg_bin)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_directories_creates_all_three() {
        let root = tempfile::tempdir().unwrap();
        let cfg = Config {
            images_dir: root.path().join("images"),
            output_dir: root.path().join("output"),
            work_dir: root.path().join("work/nested"),
            ..Config::default()
        };
        ensure_directories(&cfg).await.unwrap();
        assert!(cfg.images_dir.is_dir());
        assert!(cfg.output_dir.is_dir());
        assert!(cfg.work_dir.is_dir());
    }

    #[tokio::test]
    async fn clear_directory_contents_keeps_the_root() {
        let root = tempfile::tempdir().unwrap();
        let job = root.path().join("job1");
        fs::create_dir_all(&job).await.unwrap();
        fs::write(job.join("narration.mp3"), b"x").await.unwrap();
        fs::write(root.path().join("stray.ass"), b"x").await.unwrap();

        clear_directory_contents(root.path()).await.unwrap();

        assert!(root.path().is_dir());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_ffmpeg_binary_is_reported() {
        assert!(!check_ffmpeg("definitely-not-an-ffmpeg-binary").await);
    }

    #[tokio::test]
    async fn clearing_a_missing_directory_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        clear_directory_contents(&root.path().join("absent"))
            .await
            .unwrap();
    }
}
