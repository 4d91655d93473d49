//! Narration generation: slide images in, one spoken script per slide out.
//!
//! Slides are sent to the vision model in batches so consecutive slides stay
//! coherent. Each batch sees a short summary of what was already said. When a
//! batch call fails the slides are retried one by one, and a slide that still
//! fails gets a static fallback narration. Every result is then padded up to
//! the configured minimum length. Generation never returns an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::retry::RetryPolicy;
use crate::config::{NarrationStyle, PipelineConfig};
use crate::deck::Slide;
use crate::ui::prelude::*;

pub mod client;
pub mod context;
pub mod export;
pub mod parse;
pub mod prompts;
pub mod repair;
pub mod templates;

pub use client::{ContentPart, OpenAiVisionClient, VisionClient, VisionError, VisionRequest};
pub use context::NarrationLog;
pub use templates::NarrationTemplates;

use parse::ParseMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    pub slide_number: usize,
    pub transcript: String,
}

/// Prompt and template language, picked from a tag such as `zh-CN` or `en-US`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
}

impl Language {
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("zh") {
            Language::Chinese
        } else {
            Language::English
        }
    }
}

#[derive(Debug, Clone)]
pub struct NarrationSettings {
    pub style: NarrationStyle,
    pub language: Language,
    pub min_chars: usize,
    pub batch_size: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl From<&PipelineConfig> for NarrationSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            style: config.transcript_style,
            language: Language::from_tag(&config.transcript_language),
            min_chars: config.min_transcript_length,
            batch_size: config.batch_size.max(1),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

pub struct NarrationGenerator<'a> {
    client: &'a dyn VisionClient,
    settings: NarrationSettings,
    templates: NarrationTemplates,
    retry: RetryPolicy,
}

impl<'a> NarrationGenerator<'a> {
    pub fn new(
        client: &'a dyn VisionClient,
        settings: NarrationSettings,
        templates: NarrationTemplates,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            settings,
            templates,
            retry,
        }
    }

    pub fn settings(&self) -> &NarrationSettings {
        &self.settings
    }

    /// One narration per slide, numbered 1..=N, each at least the minimum length.
    pub async fn narrate_deck(&self, slides: &[Slide], context: Option<&str>) -> Vec<Narration> {
        let total = slides.len();
        if total == 0 {
            return Vec::new();
        }

        let language = self.settings.language;
        let base = prompts::detailed_instructions(context, language);
        let batch_size = self.settings.batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);
        let mut log = NarrationLog::new();

        for (index, batch) in slides.chunks(batch_size).enumerate() {
            let first = index * batch_size + 1;
            let last = first + batch.len() - 1;

            emit(
                Level::Info,
                "narration.batch.start",
                &format!("Narrating slides {first}-{last} (batch {}/{batch_count})", index + 1),
                Some(serde_json::json!({ "first": first, "last": last, "total": total })),
            );

            let batch_context =
                context::build_batch_context(&base, &log, first, last, total, language);

            let narrations = match self.generate_batch(batch, first, &batch_context).await {
                Ok(narrations) => narrations,
                Err(err) => {
                    emit(
                        Level::Warn,
                        "narration.batch.failed",
                        &format!(
                            "Batch {first}-{last} failed ({err}), narrating slides individually"
                        ),
                        None,
                    );
                    self.generate_individually(batch, first, total, &batch_context)
                        .await
                }
            };

            for narration in narrations {
                log.push(self.repaired(narration, total));
            }
        }

        self.complete(log.into_inner(), total)
    }

    /// One request covering `batch`, whose first slide is deck slide `first`.
    pub async fn generate_batch(
        &self,
        batch: &[Slide],
        first: usize,
        batch_context: &str,
    ) -> Result<Vec<Narration>, VisionError> {
        let language = self.settings.language;
        let mut parts = vec![ContentPart::Text(prompts::batch_user_prompt(
            batch.len(),
            Some(batch_context),
            language,
        ))];
        for (offset, slide) in batch.iter().enumerate() {
            parts.push(ContentPart::Text(prompts::slide_label(first + offset, language)));
            parts.push(ContentPart::Image(slide.image_path.clone()));
        }

        let request = VisionRequest {
            system: prompts::batch_system_prompt(self.settings.style, language),
            parts,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let label = format!("narration batch {first}-{}", first + batch.len() - 1);
        let response = self
            .retry
            .run(&label, || self.client.complete(&request))
            .await?;

        let parsed = parse::parse_batch_response(&response, first, batch.len(), &self.templates);
        if parsed.method != ParseMethod::Json {
            emit(
                Level::Warn,
                "narration.batch.unparsed",
                &format!("Response for {label} was not a JSON array, recovered what was possible"),
                Some(serde_json::json!({
                    "method": format!("{:?}", parsed.method),
                    "preview": response.chars().take(200).collect::<String>(),
                })),
            );
        }
        Ok(parsed.narrations)
    }

    /// Per-slide requests; a slide whose request fails gets its fallback text.
    pub async fn generate_individually(
        &self,
        batch: &[Slide],
        first: usize,
        total: usize,
        batch_context: &str,
    ) -> Vec<Narration> {
        let language = self.settings.language;
        let system = prompts::single_system_prompt(self.settings.style, language);
        let mut narrations = Vec::with_capacity(batch.len());

        for (offset, slide) in batch.iter().enumerate() {
            let slide_number = first + offset;
            let request = VisionRequest {
                system: system.clone(),
                parts: vec![
                    ContentPart::Text(prompts::single_user_prompt(
                        slide_number,
                        total,
                        Some(batch_context),
                        language,
                    )),
                    ContentPart::Image(slide.image_path.clone()),
                ],
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };

            let label = format!("narration slide {slide_number}");
            let transcript = match self.retry.run(&label, || self.client.complete(&request)).await {
                Ok(text) => text,
                Err(err) => {
                    emit(
                        Level::Warn,
                        "narration.slide.fallback",
                        &format!("Slide {slide_number}: {err}, using fallback narration"),
                        None,
                    );
                    self.templates.fallback(slide_number, total)
                }
            };

            narrations.push(Narration {
                slide_number,
                transcript,
            });
        }
        narrations
    }

    fn repaired(&self, narration: Narration, total: usize) -> Narration {
        let narration = if narration.transcript.trim().is_empty() {
            Narration {
                transcript: self.templates.fallback(narration.slide_number, total),
                slide_number: narration.slide_number,
            }
        } else {
            narration
        };

        let min = self.settings.min_chars;
        let length = repair::char_len(&narration.transcript);
        if length >= min {
            return narration;
        }

        emit(
            Level::Debug,
            "narration.repair",
            &format!(
                "Narration for slide {} is short ({length} < {min}), extending",
                narration.slide_number
            ),
            None,
        );
        Narration {
            transcript: repair::extend_to_minimum(
                &narration.transcript,
                narration.slide_number,
                total,
                min,
                &self.templates,
            ),
            slide_number: narration.slide_number,
        }
    }

    /// Exactly one narration per slide 1..=total, gaps filled with fallback text.
    fn complete(&self, narrations: Vec<Narration>, total: usize) -> Vec<Narration> {
        let mut by_slide: BTreeMap<usize, Narration> = BTreeMap::new();
        for narration in narrations {
            if (1..=total).contains(&narration.slide_number) {
                by_slide.entry(narration.slide_number).or_insert(narration);
            }
        }

        (1..=total)
            .map(|slide_number| {
                by_slide.remove(&slide_number).unwrap_or_else(|| {
                    self.repaired(
                        Narration {
                            slide_number,
                            transcript: self.templates.fallback(slide_number, total),
                        },
                        total,
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
