use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{Language, Narration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TranscriptFormat {
    #[default]
    Json,
    Text,
    Markdown,
}

impl TranscriptFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TranscriptFormat::Json => "json",
            TranscriptFormat::Text => "txt",
            TranscriptFormat::Markdown => "md",
        }
    }
}

fn slide_heading(slide: usize, language: Language) -> String {
    match language {
        Language::Chinese => format!("第{slide}页"),
        Language::English => format!("Slide {slide}"),
    }
}

pub fn render(narrations: &[Narration], format: TranscriptFormat, language: Language) -> Result<String> {
    let mut out = String::new();
    match format {
        TranscriptFormat::Json => {
            out = serde_json::to_string_pretty(narrations).context("serializing narrations")?;
            out.push('\n');
        }
        TranscriptFormat::Text => {
            for n in narrations {
                let _ = writeln!(out, "=== {} ===", slide_heading(n.slide_number, language));
                let _ = writeln!(out, "{}\n", n.transcript);
            }
        }
        TranscriptFormat::Markdown => {
            let title = match language {
                Language::Chinese => "演讲稿",
                Language::English => "Narration",
            };
            let _ = writeln!(out, "# {title}\n");
            for n in narrations {
                let _ = writeln!(out, "## {}\n", slide_heading(n.slide_number, language));
                let _ = writeln!(out, "{}\n", n.transcript);
            }
        }
    }
    Ok(out)
}

pub fn save(
    narrations: &[Narration],
    path: &Path,
    format: TranscriptFormat,
    language: Language,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating transcript directory {}", parent.display()))?;
    }
    let contents = render(narrations, format, language)?;
    fs::write(path, contents)
        .with_context(|| format!("writing transcripts to {}", path.display()))
}

pub fn load_json(path: &Path) -> Result<Vec<Narration>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading transcripts from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing transcripts at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Vec<Narration> {
        vec![
            Narration {
                slide_number: 1,
                transcript: "开场白".to_string(),
            },
            Narration {
                slide_number: 2,
                transcript: "结束语".to_string(),
            },
        ]
    }

    #[test]
    fn json_keeps_field_names_and_raw_unicode() {
        let json = render(&sample(), TranscriptFormat::Json, Language::Chinese).unwrap();
        assert!(json.contains("\"slide_number\": 1"));
        assert!(json.contains("\"transcript\": \"开场白\""));
    }

    #[test]
    fn text_and_markdown_layouts() {
        let text = render(&sample(), TranscriptFormat::Text, Language::English).unwrap();
        assert!(text.starts_with("=== Slide 1 ===\n开场白\n\n=== Slide 2 ==="));

        let md = render(&sample(), TranscriptFormat::Markdown, Language::Chinese).unwrap();
        assert!(md.starts_with("# 演讲稿\n\n## 第1页\n\n开场白\n\n## 第2页"));
    }

    #[test]
    fn saved_json_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/transcripts.json");
        save(&sample(), &path, TranscriptFormat::Json, Language::Chinese).unwrap();
        assert_eq!(load_json(&path).unwrap(), sample());
    }
}
