//! Deck in, narrated video out.
//!
//! Stages always run in the same order: rasterize the slides, narrate them,
//! synthesize one clip per narration, then composite the video. Every
//! external collaborator is reached through a trait object so the whole run
//! can be exercised with in-process fakes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::common::retry::RetryPolicy;
use crate::config::PipelineConfig;
use crate::deck::{OfficeRasterizer, RasterOptions, Slide, SlideRasterizer};
use crate::narration::export::{self, TranscriptFormat};
use crate::narration::{
    Language, Narration, NarrationGenerator, NarrationSettings, NarrationTemplates,
    OpenAiVisionClient, VisionClient,
};
use crate::speech::{
    self, CloneReference, GatewaySynthesizer, SpeechParams, SpeechSynthesizer, VoiceSpec,
};
use crate::ui::prelude::*;
use crate::video::{
    FfmpegRunner, MediaProbe, SystemFfmpegRunner, SystemMediaProbe, VideoCompositor,
    VideoSettings,
};

pub mod artifacts;
pub mod progress;

pub use artifacts::Workspace;
pub use progress::Stage;

/// External collaborators used by a run.
///
/// The process-driving services are shared so the blocking stages can run on
/// tokio's blocking pool.
pub struct PipelineServices {
    pub rasterizer: Arc<dyn SlideRasterizer>,
    pub vision: Box<dyn VisionClient>,
    pub synthesizer: Box<dyn SpeechSynthesizer>,
    pub runner: Arc<dyn FfmpegRunner>,
    pub probe: Arc<dyn MediaProbe>,
}

impl PipelineServices {
    /// Office rasterizer, OpenAI-compatible vision model, speech gateway and
    /// the system ffmpeg, configured from `config` and the environment.
    pub fn system(config: &PipelineConfig) -> Result<Self> {
        let vision = OpenAiVisionClient::from_env(&config.ai_model, config.api_timeout())
            .context("configuring the vision model client")?;
        let synthesizer = GatewaySynthesizer::from_env(config.api_timeout(), config.retry_policy())
            .context("configuring the speech service")?;

        Ok(Self {
            rasterizer: Arc::new(OfficeRasterizer::new(RasterOptions::from(config))),
            vision: Box::new(vision),
            synthesizer: Box::new(synthesizer),
            runner: Arc::new(SystemFfmpegRunner),
            probe: Arc::new(SystemMediaProbe),
        })
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    services: PipelineServices,
    templates: NarrationTemplates,
    retry: RetryPolicy,
}

impl Pipeline {
    /// Validates the configuration up front; nothing runs with a bad config.
    pub fn new(config: PipelineConfig, services: PipelineServices) -> Result<Self> {
        config.validate()?;
        let templates = NarrationTemplates::load(
            Language::from_tag(&config.transcript_language),
            config.templates_path.as_deref(),
        )?;
        let retry = config.retry_policy();

        Ok(Self {
            config,
            services,
            templates,
            retry,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage for `deck` and return the path of the finished video.
    ///
    /// `progress` receives `(fraction, label)` at 0.1, 0.3, 0.6, 0.8 and 1.0.
    /// Rasterizing and compositing shell out to external tools; both run on
    /// the blocking pool so the caller's runtime stays responsive.
    pub async fn process(
        &self,
        deck: &Path,
        output: Option<&Path>,
        context: Option<&str>,
        progress: &mut dyn FnMut(f64, &str),
    ) -> Result<PathBuf> {
        if !deck.exists() {
            bail!("Presentation not found: {}", deck.display());
        }

        let output = match output {
            Some(path) => path.to_path_buf(),
            None => artifacts::default_output_path(
                &self.config.output_dir,
                deck,
                chrono::Local::now(),
            ),
        };

        emit(
            Level::Info,
            "pipeline.start",
            &format!("Converting {} to {}", deck.display(), output.display()),
            None,
        );

        let workspace = Workspace::prepare(&self.config.output_dir, self.config.save_intermediates)?;

        report(Stage::Rasterize, progress);
        let slides = self.rasterize(deck, &workspace).await?;

        report(Stage::Narrate, progress);
        let narrations = self.narrate(&slides, context, &workspace).await?;

        report(Stage::Synthesize, progress);
        let audio = self.synthesize(&narrations, &workspace).await?;

        report(Stage::Composite, progress);
        let images: Vec<PathBuf> = slides.iter().map(|s| s.image_path.clone()).collect();
        let runner = Arc::clone(&self.services.runner);
        let probe = Arc::clone(&self.services.probe);
        let settings = VideoSettings::from(&self.config);
        let target = output.clone();
        let video = tokio::task::spawn_blocking(move || {
            VideoCompositor::new(runner.as_ref(), probe.as_ref(), settings)
                .compose(&images, &audio, &target)
        })
        .await
        .context("video compositing task failed")?
        .context("compositing video")?;

        report(Stage::Complete, progress);
        emit(
            Level::Success,
            "pipeline.done",
            &format!("Video created: {}", video.display()),
            Some(serde_json::json!({ "output": video, "slides": slides.len() })),
        );
        Ok(video)
    }

    async fn rasterize(&self, deck: &Path, workspace: &Workspace) -> Result<Vec<Slide>> {
        let rasterizer = Arc::clone(&self.services.rasterizer);
        let source = deck.to_path_buf();
        let images = workspace.images();
        let mut slides = tokio::task::spawn_blocking(move || rasterizer.rasterize(&source, &images))
            .await
            .context("rasterizer task failed")?
            .with_context(|| format!("rasterizing {}", deck.display()))?;

        if slides.is_empty() {
            bail!("No slides found in {}", deck.display());
        }
        if let Some(max) = self.config.max_slides
            && slides.len() > max
        {
            emit(
                Level::Info,
                "pipeline.slides.limited",
                &format!("Limiting deck to the first {max} of {} slides", slides.len()),
                None,
            );
            for dropped in slides.drain(max..) {
                if let Err(err) = fs::remove_file(&dropped.image_path) {
                    emit(
                        Level::Warn,
                        "pipeline.slides.cleanup_failed",
                        &format!("Could not remove {}: {err}", dropped.image_path.display()),
                        None,
                    );
                }
            }
        }
        Ok(slides)
    }

    async fn narrate(
        &self,
        slides: &[Slide],
        context: Option<&str>,
        workspace: &Workspace,
    ) -> Result<Vec<Narration>> {
        let settings = NarrationSettings::from(&self.config);
        let language = settings.language;
        let generator = NarrationGenerator::new(
            self.services.vision.as_ref(),
            settings,
            self.templates.clone(),
            self.retry.clone(),
        );
        let narrations = generator.narrate_deck(slides, context).await;

        if workspace.is_persistent() {
            let dir = workspace.transcripts();
            for format in [TranscriptFormat::Json, TranscriptFormat::Markdown] {
                let path = dir.join(format!("transcripts.{}", format.extension()));
                export::save(&narrations, &path, format, language)?;
            }
        }
        Ok(narrations)
    }

    async fn synthesize(
        &self,
        narrations: &[Narration],
        workspace: &Workspace,
    ) -> Result<Vec<PathBuf>> {
        let voice = resolve_voice(&self.config);
        let params = SpeechParams::from(&self.config);
        let synthesizer = self.services.synthesizer.as_ref();
        let mut clips = Vec::with_capacity(narrations.len());

        for narration in narrations {
            let slide = narration.slide_number;
            let path = workspace.audio_path(slide);
            emit(
                Level::Info,
                "speech.slide",
                &format!("Generating audio for slide {slide}/{}", narrations.len()),
                None,
            );
            speech::synthesize_to_file(synthesizer, &narration.transcript, &voice, &params, &path)
                .await
                .with_context(|| format!("synthesizing speech for slide {slide}"))?;
            clips.push(path);
        }
        Ok(clips)
    }
}

/// Clone voice when requested and fully referenced, otherwise the preset.
pub fn resolve_voice(config: &PipelineConfig) -> VoiceSpec {
    if config.use_voice_clone {
        if let Some((audio_path, transcript)) = config.clone_reference() {
            emit(
                Level::Info,
                "speech.voice.clone",
                &format!("Using voice cloning with reference {}", audio_path.display()),
                None,
            );
            return VoiceSpec::Clone(CloneReference {
                audio_path,
                transcript,
            });
        }
        emit(
            Level::Warn,
            "speech.voice.clone_fallback",
            &format!(
                "Voice cloning enabled but reference audio/text not provided, using preset voice {}",
                config.voice_id.gateway_id()
            ),
            None,
        );
    }
    VoiceSpec::Preset(config.voice_id)
}

fn report(stage: Stage, progress: &mut dyn FnMut(f64, &str)) {
    emit(
        Level::Debug,
        &format!("pipeline.stage.{}", stage.code()),
        stage.label(),
        Some(serde_json::json!({ "fraction": stage.fraction() })),
    );
    progress(stage.fraction(), stage.label());
}
