use super::{NarrationStyle, PipelineConfig, VoicePreset};

/// Named starting points for common kinds of decks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigPreset {
    HighQuality,
    FastPreview,
    English,
    Academic,
    Storytelling,
    VoiceClone,
}

impl ConfigPreset {
    pub fn config(self) -> PipelineConfig {
        let base = PipelineConfig::default();
        match self {
            ConfigPreset::HighQuality => PipelineConfig {
                ppt_dpi: 400,
                max_tokens: 4000,
                temperature: 0.7,
                transcript_style: NarrationStyle::Professional,
                min_transcript_length: 300,
                video_fps: 30,
                video_resolution: (1920, 1080),
                speech_speed: 0.95,
                save_intermediates: true,
                ..base
            },
            ConfigPreset::FastPreview => PipelineConfig {
                ppt_dpi: 200,
                max_tokens: 2000,
                temperature: 0.8,
                min_transcript_length: 150,
                video_fps: 24,
                video_resolution: (1280, 720),
                batch_size: 10,
                save_intermediates: false,
                ..base
            },
            ConfigPreset::English => PipelineConfig {
                transcript_language: "en-US".to_string(),
                voice_id: VoicePreset::EnFemale,
                speech_language: "en-us".to_string(),
                transcript_style: NarrationStyle::Professional,
                min_transcript_length: 250,
                ..base
            },
            ConfigPreset::Academic => PipelineConfig {
                ppt_dpi: 350,
                max_tokens: 5000,
                temperature: 0.6,
                transcript_style: NarrationStyle::Academic,
                min_transcript_length: 400,
                speech_speed: 0.9,
                voice_id: VoicePreset::ZhMale,
                save_intermediates: true,
                ..base
            },
            ConfigPreset::Storytelling => PipelineConfig {
                max_tokens: 4000,
                temperature: 0.9,
                transcript_style: NarrationStyle::Storytelling,
                min_transcript_length: 350,
                speech_speed: 0.95,
                voice_id: VoicePreset::ZhFemale,
                transition_duration: 1.0,
                ..base
            },
            // Reference audio and text still have to come from the user
            ConfigPreset::VoiceClone => PipelineConfig {
                use_voice_clone: true,
                reference_audio_path: None,
                reference_text: None,
                speech_speed: 1.0,
                min_transcript_length: 250,
                save_intermediates: true,
                ..base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn every_preset_passes_validation() {
        for preset in ConfigPreset::value_variants() {
            preset
                .config()
                .validate()
                .unwrap_or_else(|e| panic!("{preset:?} is invalid: {e}"));
        }
    }

    #[test]
    fn english_preset_switches_language_and_voice() {
        let config = ConfigPreset::English.config();
        assert_eq!(config.transcript_language, "en-US");
        assert_eq!(config.voice_id, VoicePreset::EnFemale);
        assert_eq!(config.speech_language, "en-us");
    }

    #[test]
    fn fast_preview_skips_intermediates() {
        let config = ConfigPreset::FastPreview.config();
        assert!(!config.save_intermediates);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.video_resolution, (1280, 720));
    }
}
