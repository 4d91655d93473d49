//! ffmpeg argument builders for per-slide segments and the final concat.

use std::path::Path;

use super::VideoSettings;

/// Which fades a segment carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FadePlan {
    pub fade_in: bool,
    pub fade_out: bool,
}

impl FadePlan {
    /// Fade in only the first segment and fade out only the last, never when
    /// the transition is zero.
    pub fn for_segment(index: usize, count: usize, settings: &VideoSettings) -> Self {
        if settings.transition <= 0.0 {
            return Self::default();
        }
        Self {
            fade_in: settings.fade_in && index == 0,
            fade_out: settings.fade_out && index + 1 == count,
        }
    }
}

/// Frames spent in one fade.
pub fn fade_frames(transition: f64, fps: u32) -> u64 {
    (transition * fps as f64).max(0.0) as u64
}

/// Frame at which the closing fade starts.
pub fn fade_out_start(duration: f64, transition: f64, fps: u32) -> u64 {
    ((duration - transition) * fps as f64).max(0.0) as u64
}

pub fn video_filter(settings: &VideoSettings, duration: f64, fades: FadePlan) -> String {
    let (w, h) = (settings.width, settings.height);
    let mut filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black"
    );

    let frames = fade_frames(settings.transition, settings.fps);
    if fades.fade_in {
        filter.push_str(&format!(",fade=in:0:{frames}"));
    }
    if fades.fade_out {
        let start = fade_out_start(duration, settings.transition, settings.fps);
        filter.push_str(&format!(",fade=out:{start}:{frames}"));
    }
    filter
}

pub fn segment_args(
    image: &Path,
    audio: &Path,
    output: &Path,
    duration: f64,
    settings: &VideoSettings,
    fades: FadePlan,
) -> Vec<String> {
    vec![
        "-y".into(),
        "-loop".into(),
        "1".into(),
        "-framerate".into(),
        settings.fps.to_string(),
        "-i".into(),
        image.to_string_lossy().into_owned(),
        "-i".into(),
        audio.to_string_lossy().into_owned(),
        "-c:v".into(),
        "libx264".into(),
        "-tune".into(),
        "stillimage".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "192k".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-t".into(),
        duration.to_string(),
        "-map".into(),
        "0:v".into(),
        "-map".into(),
        "1:a".into(),
        "-vf".into(),
        video_filter(settings, duration, fades),
        output.to_string_lossy().into_owned(),
    ]
}

/// Contents of a concat demuxer list. Single quotes in paths are escaped.
pub fn concat_list(segments: &[impl AsRef<Path>]) -> String {
    segments
        .iter()
        .map(|path| {
            let escaped = path.as_ref().to_string_lossy().replace('\'', r"'\''");
            format!("file '{escaped}'\n")
        })
        .collect()
}

pub fn concat_args(list_file: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_file.to_string_lossy().into_owned(),
        "-c:v".into(),
        "libx264".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "192k".into(),
        "-ar".into(),
        "44100".into(),
        "-ac".into(),
        "2".into(),
        "-movflags".into(),
        "+faststart".into(),
        output.to_string_lossy().into_owned(),
    ]
}
