//! Slide + narration pairs to a single video via ffmpeg.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::PipelineConfig;
use crate::ui::prelude::*;

pub mod ffmpeg;
pub mod segment;

pub use ffmpeg::{FfmpegRunOptions, FfmpegRunner, MediaProbe, SystemFfmpegRunner, SystemMediaProbe};

use segment::FadePlan;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("nothing to composite: no slides were given")]
    Empty,

    #[error("slide/audio count mismatch: {images} images but {audio} audio clips")]
    CountMismatch { images: usize, audio: usize },

    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("failed to encode segment for slide {slide}: {message}")]
    Segment { slide: usize, message: String },

    #[error("failed to concatenate segments: {0}")]
    Concat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoSettings {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    /// Fade length in seconds; zero disables fades.
    pub transition: f64,
    pub fade_in: bool,
    pub fade_out: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            fps: 24,
            width: 1920,
            height: 1080,
            transition: 0.5,
            fade_in: true,
            fade_out: true,
        }
    }
}

impl From<&PipelineConfig> for VideoSettings {
    fn from(config: &PipelineConfig) -> Self {
        let (width, height) = config.video_resolution;
        Self {
            fps: config.video_fps,
            width,
            height,
            transition: config.transition_duration,
            fade_in: config.fade_in,
            fade_out: config.fade_out,
        }
    }
}

pub struct VideoCompositor<'a> {
    runner: &'a dyn FfmpegRunner,
    probe: &'a dyn MediaProbe,
    settings: VideoSettings,
}

impl<'a> VideoCompositor<'a> {
    pub fn new(
        runner: &'a dyn FfmpegRunner,
        probe: &'a dyn MediaProbe,
        settings: VideoSettings,
    ) -> Self {
        Self {
            runner,
            probe,
            settings,
        }
    }

    /// Encode one segment per (image, audio) pair and concatenate them in
    /// order into `output`. Inputs are validated before ffmpeg runs.
    pub fn compose(
        &self,
        images: &[PathBuf],
        audio: &[PathBuf],
        output: &Path,
    ) -> Result<PathBuf, CompositeError> {
        check_inputs(images, audio)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let work_dir = tempfile::Builder::new().prefix("slidecast-video-").tempdir()?;
        let count = images.len();
        let mut segments = Vec::with_capacity(count);

        for (index, (image, clip)) in images.iter().zip(audio).enumerate() {
            let slide = index + 1;
            let duration = self.probe.duration_seconds(clip);
            let segment_path = work_dir.path().join(format!("segment_{index:03}.mp4"));
            let fades = FadePlan::for_segment(index, count, &self.settings);

            emit(
                Level::Info,
                "video.segment.encode",
                &format!("Encoding segment {slide}/{count} ({duration:.2}s)"),
                Some(serde_json::json!({ "slide": slide, "duration": duration })),
            );

            let args =
                segment::segment_args(image, clip, &segment_path, duration, &self.settings, fades);
            self.runner
                .run(
                    &args,
                    FfmpegRunOptions::new(Some(duration), format!("segment {slide}/{count}")),
                )
                .map_err(|err| CompositeError::Segment {
                    slide,
                    message: format!("{err:#}"),
                })?;
            segments.push(segment_path);
        }

        let list_path = work_dir.path().join("segments.txt");
        fs::write(&list_path, segment::concat_list(&segments))?;

        emit(
            Level::Info,
            "video.concat",
            &format!("Concatenating {count} segments into {}", output.display()),
            None,
        );
        self.runner
            .run(
                &segment::concat_args(&list_path, output),
                FfmpegRunOptions::new(None, "concat"),
            )
            .map_err(|err| CompositeError::Concat(format!("{err:#}")))?;

        Ok(output.to_path_buf())
    }
}

fn check_inputs(images: &[PathBuf], audio: &[PathBuf]) -> Result<(), CompositeError> {
    if images.len() != audio.len() {
        return Err(CompositeError::CountMismatch {
            images: images.len(),
            audio: audio.len(),
        });
    }
    if images.is_empty() {
        return Err(CompositeError::Empty);
    }
    if let Some(missing) = images.iter().chain(audio).find(|path| !path.is_file()) {
        return Err(CompositeError::MissingInput(missing.clone()));
    }
    Ok(())
}
