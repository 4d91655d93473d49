use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{SpeechError, SpeechParams, SpeechSynthesizer, VoiceSpec};
use crate::common::retry::RetryPolicy;
use crate::ui::prelude::*;

pub const DEFAULT_SERVICE_CODE: &str = "speech_generation_service";

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub chunk_length: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 512,
            chunk_length: 150,
            temperature: 0.7,
            top_p: 0.7,
            repetition_penalty: 1.2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GatewayCredentials {
    pub developer_secret: Option<String>,
    pub open_id: Option<String>,
    pub service_code: String,
}

impl GatewayCredentials {
    /// Reads `SPEECH_DEVELOPER_SECRET`, `SPEECH_OPEN_ID` and `SPEECH_SERVICE_CODE`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            developer_secret: non_empty("SPEECH_DEVELOPER_SECRET"),
            open_id: non_empty("SPEECH_OPEN_ID"),
            service_code: non_empty("SPEECH_SERVICE_CODE")
                .unwrap_or_else(|| DEFAULT_SERVICE_CODE.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReferenceAudio {
    audio: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct GatewayRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    references: Option<Vec<ReferenceAudio>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_id: Option<String>,
    max_new_tokens: u32,
    chunk_length: u32,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
    speed: f32,
    volume: f32,
    pitch: i32,
    language: String,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    success: i64,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<GatewayAudio>,
}

#[derive(Debug, Deserialize)]
struct GatewayAudio {
    #[serde(default)]
    audio_base64: String,
}

/// Remote speech generation service speaking a small JSON protocol.
pub struct GatewaySynthesizer {
    http: Client,
    api_url: String,
    credentials: GatewayCredentials,
    generation: GenerationParams,
    retry: RetryPolicy,
}

impl GatewaySynthesizer {
    pub fn new(
        api_url: &str,
        credentials: GatewayCredentials,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, SpeechError> {
        if api_url.trim().is_empty() {
            return Err(SpeechError::NotConfigured("empty API URL".to_string()));
        }
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            api_url: api_url.trim().to_string(),
            credentials,
            generation: GenerationParams::default(),
            retry,
        })
    }

    /// Configured from `SPEECH_API_URL` and the credential variables.
    pub fn from_env(timeout: Duration, retry: RetryPolicy) -> Result<Self, SpeechError> {
        let api_url = std::env::var("SPEECH_API_URL")
            .map_err(|_| SpeechError::NotConfigured("SPEECH_API_URL is not set".to_string()))?;
        let credentials = GatewayCredentials::from_env();

        if credentials.developer_secret.is_none() {
            emit(
                Level::Warn,
                "speech.config.secret_missing",
                "No Developer-Secret provided. Set SPEECH_DEVELOPER_SECRET.",
                None,
            );
        }
        if credentials.open_id.is_none() {
            emit(
                Level::Warn,
                "speech.config.open_id_missing",
                "No Open-ID provided. Set SPEECH_OPEN_ID.",
                None,
            );
        }

        Self::new(&api_url, credentials, timeout, retry)
    }

    fn build_request(
        &self,
        text: &str,
        voice: &VoiceSpec,
        params: &SpeechParams,
    ) -> Result<GatewayRequest, SpeechError> {
        let (references, reference_id) = match voice {
            VoiceSpec::Preset(preset) => (None, Some(preset.gateway_id().to_string())),
            VoiceSpec::Clone(reference) => (
                Some(vec![ReferenceAudio {
                    audio: encode_audio(&reference.audio_path)?,
                    text: reference.transcript.clone(),
                }]),
                None,
            ),
        };

        Ok(GatewayRequest {
            text: text.to_string(),
            references,
            reference_id,
            max_new_tokens: self.generation.max_new_tokens,
            chunk_length: self.generation.chunk_length,
            temperature: self.generation.temperature,
            top_p: self.generation.top_p,
            repetition_penalty: self.generation.repetition_penalty,
            speed: params.speed,
            volume: params.volume,
            pitch: params.pitch,
            language: params.language.clone(),
        })
    }

    async fn send(&self, request: &GatewayRequest) -> Result<Vec<u8>, SpeechError> {
        let mut builder = self
            .http
            .post(&self.api_url)
            .header("Service-Code", &self.credentials.service_code)
            .json(request);
        if let Some(secret) = &self.credentials.developer_secret {
            builder = builder.header("Developer-Secret", secret);
        }
        if let Some(open_id) = &self.credentials.open_id {
            builder = builder.header("Open-ID", open_id);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        decode_response(status, &body)
    }
}

fn encode_audio(path: &Path) -> Result<String, SpeechError> {
    let bytes = std::fs::read(path).map_err(|source| SpeechError::ReferenceAudio {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(general_purpose::STANDARD.encode(bytes))
}

fn decode_response(status: u16, body: &[u8]) -> Result<Vec<u8>, SpeechError> {
    if status != 200 {
        return Err(SpeechError::Status {
            status,
            body: String::from_utf8_lossy(body).chars().take(500).collect(),
        });
    }

    let response: GatewayResponse =
        serde_json::from_slice(body).map_err(|e| SpeechError::Decode(e.to_string()))?;
    if response.success != 1 {
        return Err(SpeechError::Rejected {
            code: response.code,
            message: response.msg,
        });
    }

    let encoded = response.data.map(|d| d.audio_base64).unwrap_or_default();
    if encoded.is_empty() {
        return Err(SpeechError::EmptyAudio);
    }
    general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| SpeechError::Decode(e.to_string()))
}

#[async_trait]
impl SpeechSynthesizer for GatewaySynthesizer {
    fn name(&self) -> &'static str {
        "speech-gateway"
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceSpec,
        params: &SpeechParams,
    ) -> Result<Vec<u8>, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::EmptyText);
        }
        let request = self.build_request(text, voice, params)?;

        emit(
            Level::Debug,
            "speech.request",
            &format!(
                "Synthesizing {} chars with {}",
                text.chars().count(),
                voice.describe()
            ),
            None,
        );

        self.retry.run("speech synthesis", || self.send(&request)).await
    }
}
