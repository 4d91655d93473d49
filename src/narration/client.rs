use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::common::retry::Retryable;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("invalid proxy {url}: {source}")]
    Proxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read slide image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("vision request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("vision service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("vision service returned an empty completion")]
    EmptyResponse,

    #[error("failed to decode vision response: {0}")]
    Decode(String),

    #[error("vision service unavailable: {0}")]
    Unavailable(String),
}

impl Retryable for VisionError {
    fn is_retryable(&self) -> bool {
        match self {
            VisionError::Transport(err) => !err.is_builder(),
            VisionError::Status { status, .. } => *status == 429 || *status >= 500,
            VisionError::EmptyResponse | VisionError::Unavailable(_) => true,
            VisionError::MissingApiKey
            | VisionError::Proxy { .. }
            | VisionError::Image { .. }
            | VisionError::Decode(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Image(PathBuf),
}

/// One multimodal chat request: system prompt plus ordered user content.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionRequest {
    pub system: String,
    pub parts: Vec<ContentPart>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl VisionRequest {
    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, ContentPart::Image(_)))
            .count()
    }
}

/// "Generate text given images and a prompt."
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn complete(&self, request: &VisionRequest) -> Result<String, VisionError>;
}

/// OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiVisionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiVisionClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
        proxy: Option<&str>,
    ) -> Result<Self, VisionError> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(url) = proxy.filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(url).map_err(|source| VisionError::Proxy {
                url: url.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Reads `OPENAI_API_KEY`, `OPENAI_API` and `PROXY_SERVER`.
    pub fn from_env(model: &str, timeout: Duration) -> Result<Self, VisionError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(VisionError::MissingApiKey)?;
        let base_url =
            std::env::var("OPENAI_API").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let proxy = std::env::var("PROXY_SERVER").ok();
        Self::new(&base_url, &api_key, model, timeout, proxy.as_deref())
    }

    fn body(&self, request: &VisionRequest) -> Result<serde_json::Value, VisionError> {
        let mut content = Vec::with_capacity(request.parts.len());
        for part in &request.parts {
            match part {
                ContentPart::Text(text) => content.push(serde_json::json!({
                    "type": "text",
                    "text": text,
                })),
                ContentPart::Image(path) => content.push(serde_json::json!({
                    "type": "image_url",
                    "image_url": { "url": image_data_uri(path)? },
                })),
            }
        }

        Ok(serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": content },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        }))
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
    async fn complete(&self, request: &VisionRequest) -> Result<String, VisionError> {
        let body = self.body(request)?;
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let raw = response.bytes().await?;
        let completion: ChatCompletion =
            serde_json::from_slice(&raw).map_err(|e| VisionError::Decode(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(VisionError::EmptyResponse)
    }
}

fn mime_for(path: &Path) -> &'static str {
    match crate::common::paths::lowercase_extension(path).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

pub fn image_data_uri(path: &Path) -> Result<String, VisionError> {
    let bytes = std::fs::read(path).map_err(|source| VisionError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let encoded = general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{encoded}", mime_for(path)))
}
