use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::common::paths;
use crate::common::retry::RetryPolicy;

mod presets;

pub use presets::ConfigPreset;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported config format for {0} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

/// Speaking register requested from the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NarrationStyle {
    #[default]
    Professional,
    Casual,
    Academic,
    Storytelling,
}

impl NarrationStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            NarrationStyle::Professional => "professional",
            NarrationStyle::Casual => "casual",
            NarrationStyle::Academic => "academic",
            NarrationStyle::Storytelling => "storytelling",
        }
    }
}

impl fmt::Display for NarrationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preset voices offered by the speech gateway. Serialized with the gateway ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum VoicePreset {
    #[default]
    #[serde(rename = "中文女", alias = "zh-female")]
    #[value(name = "zh-female")]
    ZhFemale,
    #[serde(rename = "中文男", alias = "zh-male")]
    #[value(name = "zh-male")]
    ZhMale,
    #[serde(rename = "英文女", alias = "en-female")]
    #[value(name = "en-female")]
    EnFemale,
    #[serde(rename = "英文男", alias = "en-male")]
    #[value(name = "en-male")]
    EnMale,
}

impl VoicePreset {
    pub const ALL: [VoicePreset; 4] = [
        VoicePreset::ZhFemale,
        VoicePreset::ZhMale,
        VoicePreset::EnFemale,
        VoicePreset::EnMale,
    ];

    /// Identifier the gateway expects in `reference_id`.
    pub fn gateway_id(self) -> &'static str {
        match self {
            VoicePreset::ZhFemale => "中文女",
            VoicePreset::ZhMale => "中文男",
            VoicePreset::EnFemale => "英文女",
            VoicePreset::EnMale => "英文男",
        }
    }

    pub fn cli_name(self) -> &'static str {
        match self {
            VoicePreset::ZhFemale => "zh-female",
            VoicePreset::ZhMale => "zh-male",
            VoicePreset::EnFemale => "en-female",
            VoicePreset::EnMale => "en-male",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            VoicePreset::ZhFemale => "Mandarin, female",
            VoicePreset::ZhMale => "Mandarin, male",
            VoicePreset::EnFemale => "English, female",
            VoicePreset::EnMale => "English, male",
        }
    }

    pub fn speech_language(self) -> &'static str {
        match self {
            VoicePreset::ZhFemale | VoicePreset::ZhMale => "zh-cn",
            VoicePreset::EnFemale | VoicePreset::EnMale => "en-us",
        }
    }
}

impl fmt::Display for VoicePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gateway_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rasterization resolution (72-600)
    pub ppt_dpi: u32,
    pub image_format: ImageFormat,
    pub antialias: bool,

    /// Vision model used for narration
    pub ai_model: String,
    /// Token budget per model call (100-640000)
    pub max_tokens: u32,
    /// Sampling temperature (0-1)
    pub temperature: f32,
    pub transcript_style: NarrationStyle,
    /// Target language tag, e.g. zh-CN or en-US
    pub transcript_language: String,
    /// Minimum narration length in characters
    pub min_transcript_length: usize,
    /// TOML file overriding the built-in filler and fallback texts
    pub templates_path: Option<PathBuf>,

    pub voice_id: VoicePreset,
    pub speech_language: String,
    /// 0.5-2.0
    pub speech_speed: f32,
    /// 0-2.0
    pub speech_volume: f32,
    /// -20..20
    pub speech_pitch: i32,
    pub use_voice_clone: bool,
    pub reference_audio_path: Option<PathBuf>,
    pub reference_text: Option<String>,

    /// 1-60
    pub video_fps: u32,
    /// Width and height, at least 320x240
    pub video_resolution: (u32, u32),
    /// Fade length in seconds (0-5)
    pub transition_duration: f64,
    pub fade_in: bool,
    pub fade_out: bool,

    pub output_dir: PathBuf,
    pub save_intermediates: bool,
    pub max_slides: Option<usize>,
    /// Slides per narration request (1-50)
    pub batch_size: usize,
    pub api_retry_attempts: u32,
    /// Per-request timeout in seconds
    pub api_timeout: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ppt_dpi: 300,
            image_format: ImageFormat::Png,
            antialias: true,
            ai_model: "gpt-4.1".to_string(),
            max_tokens: 3000,
            temperature: 0.8,
            transcript_style: NarrationStyle::Professional,
            transcript_language: "zh-CN".to_string(),
            min_transcript_length: 200,
            templates_path: None,
            voice_id: VoicePreset::ZhFemale,
            speech_language: "zh-cn".to_string(),
            speech_speed: 1.0,
            speech_volume: 1.0,
            speech_pitch: 0,
            use_voice_clone: false,
            reference_audio_path: None,
            reference_text: None,
            video_fps: 30,
            video_resolution: (1920, 1080),
            transition_duration: 0.5,
            fade_in: true,
            fade_out: true,
            output_dir: PathBuf::from("output"),
            save_intermediates: true,
            max_slides: None,
            batch_size: 5,
            api_retry_attempts: 3,
            api_timeout: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Json,
}

fn file_format(path: &Path) -> Result<FileFormat, ConfigError> {
    match paths::lowercase_extension(path).as_deref() {
        Some("toml") => Ok(FileFormat::Toml),
        Some("json") => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

impl PipelineConfig {
    /// Load the user config, falling back to defaults when none exists yet.
    pub fn load() -> Result<Self> {
        let path = paths::default_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = file_format(path)?;
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Ok(Self::parse(&contents, format, path)?)
    }

    fn parse(contents: &str, format: FileFormat, path: &Path) -> Result<Self, ConfigError> {
        let parsed = match format {
            FileFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
            FileFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = file_format(path)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let contents = match format {
            FileFormat::Toml => {
                toml::to_string_pretty(self).context("serializing pipeline config")?
            }
            FileFormat::Json => {
                serde_json::to_string_pretty(self).context("serializing pipeline config")?
            }
        };
        fs::write(path, contents)
            .with_context(|| format!("writing pipeline config to {}", path.display()))?;
        Ok(())
    }

    /// Check every range at once so the user sees all problems together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(72..=600).contains(&self.ppt_dpi) {
            errors.push(format!("ppt_dpi must be between 72 and 600, got {}", self.ppt_dpi));
        }
        if self.ai_model.trim().is_empty() {
            errors.push("ai_model must not be empty".to_string());
        }
        if !(100..=640_000).contains(&self.max_tokens) {
            errors.push(format!(
                "max_tokens must be between 100 and 640000, got {}",
                self.max_tokens
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            errors.push(format!(
                "temperature must be between 0 and 1, got {}",
                self.temperature
            ));
        }
        if self.transcript_language.trim().is_empty() {
            errors.push("transcript_language must not be empty".to_string());
        }
        if !(0.5..=2.0).contains(&self.speech_speed) {
            errors.push(format!(
                "speech_speed must be between 0.5 and 2.0, got {}",
                self.speech_speed
            ));
        }
        if !(0.0..=2.0).contains(&self.speech_volume) {
            errors.push(format!(
                "speech_volume must be between 0 and 2.0, got {}",
                self.speech_volume
            ));
        }
        if !(-20..=20).contains(&self.speech_pitch) {
            errors.push(format!(
                "speech_pitch must be between -20 and 20, got {}",
                self.speech_pitch
            ));
        }
        if !(1..=60).contains(&self.video_fps) {
            errors.push(format!("video_fps must be between 1 and 60, got {}", self.video_fps));
        }
        let (width, height) = self.video_resolution;
        if width < 320 || height < 240 {
            errors.push(format!(
                "video_resolution must be at least 320x240, got {width}x{height}"
            ));
        }
        if !(0.0..=5.0).contains(&self.transition_duration) {
            errors.push(format!(
                "transition_duration must be between 0 and 5, got {}",
                self.transition_duration
            ));
        }
        if !(1..=50).contains(&self.batch_size) {
            errors.push(format!("batch_size must be between 1 and 50, got {}", self.batch_size));
        }
        if self.api_retry_attempts < 1 {
            errors.push("api_retry_attempts must be at least 1".to_string());
        }
        if self.api_timeout == 0 {
            errors.push("api_timeout must be at least 1 second".to_string());
        }
        if self.max_slides == Some(0) {
            errors.push("max_slides must be at least 1 when set".to_string());
        }
        if let Some(path) = &self.reference_audio_path
            && self.use_voice_clone
            && !path.exists()
        {
            errors.push(format!("reference_audio_path {} does not exist", path.display()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_attempts(self.api_retry_attempts)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout.max(1))
    }

    /// Reference audio and transcript, when both are present and non-empty.
    pub fn clone_reference(&self) -> Option<(PathBuf, String)> {
        let audio = self.reference_audio_path.as_ref()?;
        let text = self.reference_text.as_ref()?.trim();
        if audio.as_os_str().is_empty() || text.is_empty() {
            return None;
        }
        Some((audio.clone(), text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn validation_reports_every_out_of_range_field() {
        let config = PipelineConfig {
            ppt_dpi: 50,
            temperature: 1.5,
            video_fps: 0,
            video_resolution: (100, 100),
            batch_size: 51,
            ..PipelineConfig::default()
        };

        let Err(ConfigError::Invalid(errors)) = config.validate() else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.starts_with("ppt_dpi")));
        assert!(errors.iter().any(|e| e.starts_with("temperature")));
        assert!(errors.iter().any(|e| e.starts_with("video_fps")));
        assert!(errors.iter().any(|e| e.starts_with("video_resolution")));
        assert!(errors.iter().any(|e| e.starts_with("batch_size")));
    }

    #[test]
    fn toml_round_trip_keeps_voice_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = PipelineConfig {
            voice_id: VoicePreset::EnMale,
            transcript_style: NarrationStyle::Academic,
            ..PipelineConfig::default()
        };
        config.save_to_path(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("英文男"));

        let loaded = PipelineConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn json_config_accepts_partial_documents_and_aliases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"voice_id": "zh-male", "video_resolution": [1280, 720], "batch_size": 3}"#,
        )
        .unwrap();

        let loaded = PipelineConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.voice_id, VoicePreset::ZhMale);
        assert_eq!(loaded.video_resolution, (1280, 720));
        assert_eq!(loaded.batch_size, 3);
        assert_eq!(loaded.ppt_dpi, 300);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = PipelineConfig::load_from_path("/tmp/config.yaml").unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn clone_reference_requires_both_fields() {
        let mut config = PipelineConfig {
            use_voice_clone: true,
            reference_audio_path: Some(PathBuf::from("ref.wav")),
            ..PipelineConfig::default()
        };
        assert!(config.clone_reference().is_none());

        config.reference_text = Some("  ".to_string());
        assert!(config.clone_reference().is_none());

        config.reference_text = Some("hello".to_string());
        assert_eq!(
            config.clone_reference(),
            Some((PathBuf::from("ref.wav"), "hello".to_string()))
        );
    }
}
