//! Text-to-speech behind a small capability trait.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::common::retry::Retryable;
use crate::config::{PipelineConfig, VoicePreset};
use crate::ui::prelude::*;

pub mod gateway;

pub use gateway::GatewaySynthesizer;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("invalid voice: {0}")]
    InvalidVoice(String),

    #[error("refusing to synthesize empty text")]
    EmptyText,

    #[error("speech service is not configured: {0}")]
    NotConfigured(String),

    #[error("failed to read reference audio {path}: {source}")]
    ReferenceAudio {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("speech request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("speech service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("speech synthesis rejected (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("speech service returned no audio")]
    EmptyAudio,

    #[error("failed to decode speech response: {0}")]
    Decode(String),

    #[error("failed to write audio to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Retryable for SpeechError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            SpeechError::Transport(_)
                | SpeechError::Status { .. }
                | SpeechError::Rejected { .. }
                | SpeechError::EmptyAudio
        )
    }
}

/// Sample recording plus its transcript, used to clone a voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneReference {
    pub audio_path: PathBuf,
    pub transcript: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSpec {
    Preset(VoicePreset),
    Clone(CloneReference),
}

impl VoiceSpec {
    /// Exactly one of `preset` or `reference` must be given.
    pub fn from_parts(
        preset: Option<VoicePreset>,
        reference: Option<CloneReference>,
    ) -> Result<Self, SpeechError> {
        match (preset, reference) {
            (Some(preset), None) => Ok(VoiceSpec::Preset(preset)),
            (None, Some(reference)) => {
                if reference.transcript.trim().is_empty() {
                    return Err(SpeechError::InvalidVoice(
                        "clone reference needs a transcript".to_string(),
                    ));
                }
                Ok(VoiceSpec::Clone(reference))
            }
            (Some(_), Some(_)) => Err(SpeechError::InvalidVoice(
                "give either a preset voice or a clone reference, not both".to_string(),
            )),
            (None, None) => Err(SpeechError::InvalidVoice(
                "a preset voice or a clone reference is required".to_string(),
            )),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            VoiceSpec::Preset(preset) => format!("preset voice {}", preset.gateway_id()),
            VoiceSpec::Clone(reference) => {
                format!("cloned voice from {}", reference.audio_path.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechParams {
    pub speed: f32,
    pub volume: f32,
    pub pitch: i32,
    pub language: String,
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            speed: 1.0,
            volume: 1.0,
            pitch: 0,
            language: "zh-cn".to_string(),
        }
    }
}

impl From<&PipelineConfig> for SpeechParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            speed: config.speech_speed,
            volume: config.speech_volume,
            pitch: config.speech_pitch,
            language: config.speech_language.clone(),
        }
    }
}

/// "Synthesize audio given text and a voice."
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Audio bytes for `text`, which callers have already normalized.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSpec,
        params: &SpeechParams,
    ) -> Result<Vec<u8>, SpeechError>;
}

/// Collapse runs of whitespace, including newlines, into single spaces.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Synthesize `text` and write it to `path`.
pub async fn synthesize_to_file(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    voice: &VoiceSpec,
    params: &SpeechParams,
    path: &Path,
) -> Result<usize, SpeechError> {
    let text = normalize_text(text);
    if text.is_empty() {
        return Err(SpeechError::EmptyText);
    }

    let audio = synthesizer.synthesize(&text, voice, params).await?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SpeechError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, &audio).map_err(|source| SpeechError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(audio.len())
}

/// Synthesize every text with the same voice. A failed item yields an empty
/// byte vector instead of aborting the rest. With `output_dir`, results are
/// also written as `audio_000.wav`, `audio_001.wav`, ...
pub async fn batch_synthesize(
    synthesizer: &dyn SpeechSynthesizer,
    texts: &[String],
    voice: &VoiceSpec,
    params: &SpeechParams,
    output_dir: Option<&Path>,
) -> Vec<Vec<u8>> {
    let mut results = Vec::with_capacity(texts.len());

    for (index, text) in texts.iter().enumerate() {
        let normalized = normalize_text(text);
        let outcome = if normalized.is_empty() {
            Err(SpeechError::EmptyText)
        } else {
            synthesizer.synthesize(&normalized, voice, params).await
        };

        match outcome {
            Ok(audio) => {
                if let Some(dir) = output_dir {
                    let path = dir.join(format!("audio_{index:03}.wav"));
                    let written = fs::create_dir_all(dir).and_then(|_| fs::write(&path, &audio));
                    if let Err(err) = written {
                        emit(
                            Level::Warn,
                            "speech.batch.write_failed",
                            &format!("Could not write {}: {err}", path.display()),
                            None,
                        );
                    }
                }
                results.push(audio);
            }
            Err(err) => {
                emit(
                    Level::Error,
                    "speech.batch.item_failed",
                    &format!("Failed to synthesize text {index}: {err}"),
                    None,
                );
                results.push(Vec::new());
            }
        }
    }

    results
}
