use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tempfile::TempDir;

use crate::common::paths;

/// Where one run keeps slide images, transcripts and audio.
///
/// Persistent workspaces live under the output directory. Otherwise the
/// directories sit in a temp dir that is removed when the workspace drops.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    persistent: bool,
    _temp: Option<TempDir>,
}

impl Workspace {
    pub fn prepare(output_dir: &Path, persist: bool) -> Result<Self> {
        let (root, temp) = if persist {
            (output_dir.to_path_buf(), None)
        } else {
            let temp = tempfile::Builder::new()
                .prefix("slidecast-run-")
                .tempdir()
                .context("creating temporary workspace")?;
            (temp.path().to_path_buf(), Some(temp))
        };

        let workspace = Self {
            root,
            persistent: persist,
            _temp: temp,
        };
        for dir in [workspace.images(), workspace.transcripts(), workspace.audio()] {
            paths::ensure_dir(&dir)?;
        }
        Ok(workspace)
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn transcripts(&self) -> PathBuf {
        self.root.join("transcripts")
    }

    pub fn audio(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn audio_path(&self, slide_number: usize) -> PathBuf {
        self.audio().join(format!("audio_{slide_number:03}.wav"))
    }
}

/// `<output_dir>/<deck stem>_video_<YYYYmmdd_HHMMSS>.mp4`
pub fn default_output_path(output_dir: &Path, deck: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = deck
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "presentation".to_string());
    output_dir.join(format!("{stem}_video_{}.mp4", now.format("%Y%m%d_%H%M%S")))
}
