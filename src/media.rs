use std::path::{Path, PathBuf};

/// Narration audio on disk with its probed length in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub path: PathBuf,
    pub duration: f64,
}

impl AudioTrack {
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

/// Ordered still images; they play in this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    paths: Vec<PathBuf>,
}

impl ImageSet {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}
