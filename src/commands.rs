use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use comfy_table::{Table, presets::UTF8_FULL};

use crate::cli::{Cli, Commands, ConfigCommands, InspectArgs, NarrateArgs, NarrationOverrides, RenderArgs};
use crate::common::paths;
use crate::common::progress::{create_spinner, finish_spinner_with_success};
use crate::config::{ConfigError, ConfigPreset, PipelineConfig, VoicePreset};
use crate::deck::{self, OfficeRasterizer, RasterOptions, SlideRasterizer};
use crate::narration::export;
use crate::narration::{
    Language, NarrationGenerator, NarrationSettings, NarrationTemplates, OpenAiVisionClient,
};
use crate::pipeline::{Pipeline, PipelineServices};
use crate::ui::prelude::*;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Render(args) => handle_render(args, config_path).await,
        Commands::Narrate(args) => handle_narrate(args, config_path).await,
        Commands::Inspect(args) => handle_inspect(args),
        Commands::Voices => handle_voices(),
        Commands::Config { command } => handle_config(command, config_path),
    }
}

/// Preset when one is named, otherwise the given file, otherwise the user config.
fn base_config(path: Option<&Path>, preset: Option<ConfigPreset>) -> Result<PipelineConfig> {
    match (preset, path) {
        (Some(preset), _) => Ok(preset.config()),
        (None, Some(path)) => PipelineConfig::load_from_path(path),
        (None, None) => PipelineConfig::load(),
    }
}

fn apply_narration_overrides(config: &mut PipelineConfig, overrides: &NarrationOverrides) {
    if let Some(style) = overrides.style {
        config.transcript_style = style;
    }
    if let Some(language) = &overrides.language {
        config.transcript_language = language.clone();
    }
    if let Some(batch_size) = overrides.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(max_slides) = overrides.max_slides {
        config.max_slides = Some(max_slides);
    }
    if let Some(model) = &overrides.model {
        config.ai_model = model.clone();
    }
}

fn render_config(args: &RenderArgs, path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = base_config(path, args.narration.preset)?;
    apply_narration_overrides(&mut config, &args.narration);

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(voice) = args.voice {
        config.voice_id = voice;
        config.use_voice_clone = false;
    }
    if args.voice_clone {
        config.use_voice_clone = true;
        config.reference_audio_path = args.reference_audio.clone();
        config.reference_text = args.reference_text.clone();
    }
    if let Some(speed) = args.speed {
        config.speech_speed = speed;
    }
    if let Some(fps) = args.fps {
        config.video_fps = fps;
    }
    if args.keep_intermediates {
        config.save_intermediates = true;
    }
    if args.no_intermediates {
        config.save_intermediates = false;
    }
    Ok(config)
}

async fn handle_render(args: RenderArgs, config_path: Option<&Path>) -> Result<()> {
    let config = render_config(&args, config_path)?;
    config.validate()?;
    let deck = paths::canonicalize_existing(&args.deck)?;

    let services = PipelineServices::system(&config)?;
    let pipeline = Pipeline::new(config, services)?;

    let mut on_progress = |fraction: f64, label: &str| {
        emit(
            Level::Info,
            "render.progress",
            &format!("[{:>3.0}%] {label}", fraction * 100.0),
            Some(serde_json::json!({ "fraction": fraction })),
        );
    };

    pipeline
        .process(
            &deck,
            args.output.as_deref(),
            args.narration.context.as_deref(),
            &mut on_progress,
        )
        .await?;
    Ok(())
}

fn default_transcript_path(deck: &Path, extension: &str) -> PathBuf {
    let stem = deck
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "presentation".to_string());
    deck.with_file_name(format!("{stem}_transcripts.{extension}"))
}

async fn handle_narrate(args: NarrateArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = base_config(config_path, args.narration.preset)?;
    apply_narration_overrides(&mut config, &args.narration);
    config.validate()?;

    let deck = paths::canonicalize_existing(&args.deck)?;
    let language = Language::from_tag(&config.transcript_language);
    let templates = NarrationTemplates::load(language, config.templates_path.as_deref())?;
    let vision = OpenAiVisionClient::from_env(&config.ai_model, config.api_timeout())
        .context("configuring the vision model client")?;

    let images = tempfile::Builder::new()
        .prefix("slidecast-narrate-")
        .tempdir()
        .context("creating temporary image directory")?;

    let pb = create_spinner(format!("Rendering slides of {}", deck.display()));
    let rasterized = OfficeRasterizer::new(RasterOptions::from(&config))
        .rasterize(&deck, images.path());
    let mut slides = match rasterized {
        Ok(slides) => slides,
        Err(err) => {
            pb.finish_and_clear();
            return Err(err).with_context(|| format!("rasterizing {}", deck.display()));
        }
    };
    finish_spinner_with_success(pb, format!("Rendered {} slides", slides.len()));

    if let Some(max) = config.max_slides {
        slides.truncate(max);
    }

    let generator = NarrationGenerator::new(
        &vision,
        NarrationSettings::from(&config),
        templates,
        config.retry_policy(),
    );
    let narrations = generator
        .narrate_deck(&slides, args.narration.context.as_deref())
        .await;

    let output = args
        .output
        .unwrap_or_else(|| default_transcript_path(&deck, args.format.extension()));
    export::save(&narrations, &output, args.format, language)?;

    emit(
        Level::Success,
        "narrate.done",
        &format!("Wrote {} narrations to {}", narrations.len(), output.display()),
        Some(serde_json::json!({ "output": output, "slides": narrations.len() })),
    );
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let info = deck::inspect(&args.deck)
        .with_context(|| format!("inspecting {}", args.deck.display()))?;

    if get_output_format() == OutputFormat::Json {
        emit(
            Level::Info,
            "inspect.deck",
            &format!("{} slides", info.slide_count),
            Some(serde_json::to_value(&info)?),
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Slide", "Title"]);
    for slide in &info.slides {
        let title = match (slide.has_title, &slide.title) {
            (_, Some(title)) => title.clone(),
            (Some(false), None) => "(no title)".to_string(),
            _ => "-".to_string(),
        };
        table.add_row(vec![slide.number.to_string(), title]);
    }

    emit(
        Level::Info,
        "inspect.deck",
        &format!("{}: {} slides", info.path.display(), info.slide_count),
        None,
    );
    println!("{table}");
    Ok(())
}

fn handle_voices() -> Result<()> {
    if get_output_format() == OutputFormat::Json {
        let voices: Vec<serde_json::Value> = VoicePreset::ALL
            .iter()
            .map(|v| {
                serde_json::json!({
                    "name": v.cli_name(),
                    "id": v.gateway_id(),
                    "description": v.description(),
                    "language": v.speech_language(),
                })
            })
            .collect();
        emit(
            Level::Info,
            "voices.list",
            &format!("{} preset voices", voices.len()),
            Some(serde_json::Value::Array(voices)),
        );
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Name", "Voice id", "Description", "Language"]);
    for voice in VoicePreset::ALL {
        table.add_row(vec![
            voice.cli_name(),
            voice.gateway_id(),
            voice.description(),
            voice.speech_language(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn handle_config(command: ConfigCommands, config_path: Option<&Path>) -> Result<()> {
    let target = match config_path {
        Some(path) => path.to_path_buf(),
        None => paths::default_config_path()?,
    };

    match command {
        ConfigCommands::Init { preset, force } => {
            if target.exists() && !force {
                bail!(
                    "{} already exists, pass --force to overwrite it",
                    target.display()
                );
            }
            let config = preset.map(ConfigPreset::config).unwrap_or_default();
            config.save_to_path(&target)?;
            emit(
                Level::Success,
                "config.init",
                &format!("Wrote config to {}", target.display()),
                Some(serde_json::json!({ "path": target })),
            );
        }
        ConfigCommands::Show => {
            let config = if target.exists() {
                PipelineConfig::load_from_path(&target)?
            } else {
                PipelineConfig::default()
            };
            if get_output_format() == OutputFormat::Json {
                emit(
                    Level::Info,
                    "config.show",
                    &target.display().to_string(),
                    Some(serde_json::to_value(&config)?),
                );
            } else {
                print!(
                    "{}",
                    toml::to_string_pretty(&config).context("serializing config")?
                );
            }
        }
        ConfigCommands::Validate => {
            if !target.exists() {
                bail!("Config file not found: {}", target.display());
            }
            let config = PipelineConfig::load_from_path(&target)?;
            match config.validate() {
                Ok(()) => emit(
                    Level::Success,
                    "config.valid",
                    &format!("{} is valid", target.display()),
                    None,
                ),
                Err(ConfigError::Invalid(errors)) => {
                    for error in &errors {
                        emit(Level::Error, "config.invalid_field", error, None);
                    }
                    bail!("{} has {} invalid settings", target.display(), errors.len());
                }
                Err(err) => return Err(err.into()),
            }
        }
        ConfigCommands::Path => {
            emit(
                Level::Info,
                "config.path",
                &target.display().to_string(),
                Some(serde_json::json!({ "path": target, "exists": target.exists() })),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NarrationStyle;
    use clap::Parser;

    fn render_args(argv: &[&str]) -> RenderArgs {
        let mut full = vec!["slidecast", "render", "talk.pptx"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Render(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn render_flags_override_the_preset() {
        let args = render_args(&[
            "--preset",
            "english",
            "--style",
            "casual",
            "--batch-size",
            "3",
            "--voice",
            "en-female",
            "--no-intermediates",
        ]);
        let config = render_config(&args, None).unwrap();
        assert_eq!(config.transcript_style, NarrationStyle::Casual);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.voice_id, VoicePreset::EnFemale);
        assert!(!config.save_intermediates);
        assert!(config.transcript_language.starts_with("en"));
    }

    #[test]
    fn voice_clone_flags_fill_the_reference() {
        let args = render_args(&[
            "--preset",
            "fast-preview",
            "--voice-clone",
            "--reference-audio",
            "me.wav",
            "--reference-text",
            "hello",
        ]);
        let config = render_config(&args, None).unwrap();
        assert!(config.use_voice_clone);
        assert_eq!(
            config.clone_reference(),
            Some((PathBuf::from("me.wav"), "hello".to_string()))
        );
    }

    #[test]
    fn transcript_path_sits_next_to_the_deck() {
        assert_eq!(
            default_transcript_path(Path::new("/decks/q1.pptx"), "md"),
            PathBuf::from("/decks/q1_transcripts.md")
        );
    }
}
