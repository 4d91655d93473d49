use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::config::{ConfigPreset, NarrationStyle, VoicePreset};
use crate::narration::export::TranscriptFormat;
use crate::ui::OutputFormat;

/// Turn slide decks into narrated videos
#[derive(Parser, Debug)]
#[command(name = "slidecast", author, version, about, long_about = None)]
pub struct Cli {
    /// Show debug output, including every external command
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format for messages and listings
    #[arg(long, value_enum, global = true, default_value = "text")]
    pub output_format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Pipeline config file (TOML or JSON); defaults to the user config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a deck into a narrated video
    Render(RenderArgs),
    /// Generate narration scripts for a deck without producing audio or video
    Narrate(NarrateArgs),
    /// Show slide count and titles without rendering
    Inspect(InspectArgs),
    /// List the preset voices
    Voices,
    /// Manage the pipeline configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Options shared by commands that narrate a deck.
#[derive(Args, Debug, Clone, Default)]
pub struct NarrationOverrides {
    /// Start from a named preset instead of the config file
    #[arg(long, value_enum)]
    pub preset: Option<ConfigPreset>,

    /// Free-text description of the talk, passed to the model
    #[arg(long)]
    pub context: Option<String>,

    /// Narration style
    #[arg(long, value_enum)]
    pub style: Option<NarrationStyle>,

    /// Narration language tag, e.g. zh-CN or en-US
    #[arg(long)]
    pub language: Option<String>,

    /// Slides sent to the model per request (1-50)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Only process the first N slides
    #[arg(long)]
    pub max_slides: Option<usize>,

    /// Vision model name
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Presentation file (.pptx, .ppt or .pdf)
    #[arg(value_hint = ValueHint::FilePath)]
    pub deck: PathBuf,

    /// Output video; defaults to <output-dir>/<deck>_video_<timestamp>.mp4
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Directory for the video and intermediate artifacts
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub narration: NarrationOverrides,

    /// Preset voice
    #[arg(long, value_enum, conflicts_with = "voice_clone")]
    pub voice: Option<VoicePreset>,

    /// Clone the voice from a reference recording
    #[arg(long, requires_all = ["reference_audio", "reference_text"])]
    pub voice_clone: bool,

    /// Reference recording for voice cloning
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub reference_audio: Option<PathBuf>,

    /// Transcript of the reference recording
    #[arg(long)]
    pub reference_text: Option<String>,

    /// Speech speed (0.5-2.0)
    #[arg(long)]
    pub speed: Option<f32>,

    /// Video frame rate (1-60)
    #[arg(long)]
    pub fps: Option<u32>,

    /// Keep slide images, transcripts and audio under the output directory
    #[arg(long, conflicts_with = "no_intermediates")]
    pub keep_intermediates: bool,

    /// Discard slide images, transcripts and audio after the run
    #[arg(long)]
    pub no_intermediates: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NarrateArgs {
    /// Presentation file (.pptx, .ppt or .pdf)
    #[arg(value_hint = ValueHint::FilePath)]
    pub deck: PathBuf,

    /// Where to write the scripts; defaults to <deck>_transcripts.<ext> next to the deck
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Transcript file format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: TranscriptFormat,

    #[command(flatten)]
    pub narration: NarrationOverrides,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Presentation file (.pptx, .ppt or .pdf)
    #[arg(value_hint = ValueHint::FilePath)]
    pub deck: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Write a config file with defaults or a preset
    Init {
        /// Preset to write instead of the defaults
        #[arg(long, value_enum)]
        preset: Option<ConfigPreset>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
    /// Check a configuration file and report every problem
    Validate,
    /// Print the path of the user config file
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn voice_clone_needs_both_references() {
        let err = Cli::try_parse_from(["slidecast", "render", "talk.pptx", "--voice-clone"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "slidecast",
            "render",
            "talk.pptx",
            "--voice-clone",
            "--reference-audio",
            "me.wav",
            "--reference-text",
            "hello there",
        ])
        .unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert!(args.voice_clone);
    }

    #[test]
    fn voice_names_parse() {
        let cli = Cli::try_parse_from(["slidecast", "render", "a.pdf", "--voice", "en-male"])
            .unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.voice, Some(VoicePreset::EnMale));
    }
}
