use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use regex::Regex;

use crate::common::progress::create_encode_bar;
use crate::ui::is_debug_enabled;
use crate::ui::prelude::*;

/// Used when neither ffprobe nor ffmpeg can report a duration.
pub const FALLBACK_DURATION_SECONDS: f64 = 5.0;

static DURATION_BANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration: (\d+):(\d+):(\d+\.\d+)").expect("duration pattern is valid")
});

pub trait FfmpegRunner: Send + Sync {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()>;
}

/// Reports how long a media file plays.
pub trait MediaProbe: Send + Sync {
    fn duration_seconds(&self, path: &Path) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    pub total_duration: Option<f64>,
    pub label: String,
    pub verbose: bool,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, label: impl Into<String>) -> Self {
        Self {
            total_duration,
            label: label.into(),
            verbose: is_debug_enabled(),
        }
    }
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
        emit(
            Level::Debug,
            "video.ffmpeg.args",
            &format!("ffmpeg {}", args.join(" ")),
            None,
        );

        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| "Failed to spawn ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .context("Failed to capture ffmpeg stderr")?;

        let pb = options
            .total_duration
            .map(|duration| create_encode_bar(duration, &options.label));

        let mut last_line = String::new();
        let mut error_lines: Vec<String> = Vec::new();
        let result = read_ffmpeg_stderr(
            stderr,
            options.verbose,
            &pb,
            &mut last_line,
            &mut error_lines,
        );

        let status = child.wait().context("Failed to wait for ffmpeg")?;
        result?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        if !status.success() {
            let error_msg = if !error_lines.is_empty() {
                error_lines.join("\n")
            } else {
                last_line
            };
            bail!(
                "ffmpeg exited with status {:?}: {}",
                status.code(),
                error_msg.trim()
            );
        }

        Ok(())
    }
}

fn read_ffmpeg_stderr<R: Read>(
    mut stderr: R,
    verbose: bool,
    pb: &Option<ProgressBar>,
    last_line: &mut String,
    error_lines: &mut Vec<String>,
) -> Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr
            .read(&mut buffer)
            .context("Failed to read ffmpeg stderr")?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated = accumulated[pos + 1..].to_string();

            if line.is_empty() {
                continue;
            }

            if verbose {
                eprintln!("{line}");
            }

            if line.to_ascii_lowercase().contains("error") {
                error_lines.push(line.clone());
            }

            if let Some(pb) = pb
                && let Some(progress) = parse_ffmpeg_progress(&line)
            {
                pb.set_position((progress * 1000.0) as u64);
                if let Some(speed) = parse_ffmpeg_speed(&line) {
                    pb.set_message(speed);
                }
            }

            *last_line = line;
        }
    }

    Ok(())
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ').unwrap_or(time_str.len());
    parse_time_to_seconds(&time_str[..time_end])
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let speed_start = line.find("speed=")?;
    let speed_str = line[speed_start + 6..].trim_start();
    let speed_end = speed_str.find('x')?;
    Some(speed_str[..speed_end + 1].to_string())
}

/// ffprobe first, then the banner printed by `ffmpeg -i`, then a fixed default.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMediaProbe;

impl MediaProbe for SystemMediaProbe {
    fn duration_seconds(&self, path: &Path) -> f64 {
        match probe_duration_seconds(path) {
            Ok(duration) => return duration,
            Err(err) => emit(
                Level::Debug,
                "video.probe.ffprobe_failed",
                &format!("{err:#}"),
                None,
            ),
        }

        if let Some(duration) = banner_duration_seconds(path) {
            return duration;
        }

        emit(
            Level::Warn,
            "video.probe.default",
            &format!(
                "Could not determine duration of {}, using {FALLBACK_DURATION_SECONDS}s",
                path.display()
            ),
            None,
        );
        FALLBACK_DURATION_SECONDS
    }
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
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
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration: f64 = duration_str
        .trim()
        .parse()
        .context("Failed to parse ffprobe duration as f64")?;

    Ok(duration)
}

fn banner_duration_seconds(path: &Path) -> Option<f64> {
    let output = Command::new("ffmpeg")
        .arg("-i")
        .arg(path)
        .args(["-hide_banner", "-f", "null", "-"])
        .output()
        .ok()?;
    parse_duration_banner(&String::from_utf8_lossy(&output.stderr))
}

/// Seconds from a `Duration: 00:01:02.50` line in ffmpeg's stderr.
pub fn parse_duration_banner(stderr: &str) -> Option<f64> {
    let caps = DURATION_BANNER.captures(stderr)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
