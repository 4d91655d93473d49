use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use duct::cmd;

use super::error::RasterizeError;
use crate::ui::prelude::*;

pub const CONVERTER_BINARIES: [&str; 2] = ["soffice", "libreoffice"];

/// One way of asking the office suite for a PDF.
#[derive(Debug, Clone)]
pub struct ConversionStrategy {
    pub label: &'static str,
    pub args: Vec<OsString>,
}

/// Option sets tried in order for each converter binary.
///
/// The second set runs with a throwaway user profile so a locked or
/// corrupted default profile cannot block headless conversion.
pub fn conversion_strategies(
    input: &Path,
    out_dir: &Path,
    profile_dir: &Path,
) -> Vec<ConversionStrategy> {
    let plain = vec![
        OsString::from("--headless"),
        OsString::from("--convert-to"),
        OsString::from("pdf"),
        OsString::from("--outdir"),
        out_dir.as_os_str().to_owned(),
        input.as_os_str().to_owned(),
    ];

    let isolated = vec![
        OsString::from(format!(
            "-env:UserInstallation=file://{}",
            profile_dir.display()
        )),
        OsString::from("--headless"),
        OsString::from("--invisible"),
        OsString::from("--nologo"),
        OsString::from("--norestore"),
        OsString::from("--convert-to"),
        OsString::from("pdf:impress_pdf_Export"),
        OsString::from("--outdir"),
        out_dir.as_os_str().to_owned(),
        input.as_os_str().to_owned(),
    ];

    vec![
        ConversionStrategy {
            label: "headless",
            args: plain,
        },
        ConversionStrategy {
            label: "isolated profile",
            args: isolated,
        },
    ]
}

pub fn locate_converters() -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = Vec::new();
    for name in CONVERTER_BINARIES {
        if let Ok(path) = which::which(name)
            && !found.contains(&path)
        {
            found.push(path);
        }
    }
    found
}

/// Path the office suite writes its PDF to for `input`.
pub fn expected_pdf_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("deck"));
    let mut name = stem;
    name.push(".pdf");
    out_dir.join(name)
}

fn non_empty_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

fn last_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Convert a presentation to PDF inside `work_dir`.
pub fn convert_to_pdf(input: &Path, work_dir: &Path) -> Result<PathBuf, RasterizeError> {
    let converters = locate_converters();
    if converters.is_empty() {
        return Err(RasterizeError::ConverterUnavailable);
    }

    let out_dir = work_dir.join("pdf");
    let profile_dir = work_dir.join("profile");
    fs::create_dir_all(&out_dir)?;
    fs::create_dir_all(&profile_dir)?;

    let pdf_path = expected_pdf_path(input, &out_dir);
    let mut attempts = Vec::new();

    for binary in &converters {
        for strategy in conversion_strategies(input, &out_dir, &profile_dir) {
            let _ = fs::remove_file(&pdf_path);
            emit(
                Level::Debug,
                "deck.convert.attempt",
                &format!("Converting with {} ({})", binary.display(), strategy.label),
                None,
            );

            let outcome = cmd(binary, &strategy.args)
                .stdout_capture()
                .stderr_capture()
                .unchecked()
                .run();

            let description = match outcome {
                Err(err) => format!("{} ({}): {err}", binary.display(), strategy.label),
                Ok(output) if !output.status.success() => format!(
                    "{} ({}): exited with {:?}: {}",
                    binary.display(),
                    strategy.label,
                    output.status.code(),
                    last_line(&output.stderr)
                ),
                Ok(_) if !non_empty_file(&pdf_path) => format!(
                    "{} ({}): no PDF written to {}",
                    binary.display(),
                    strategy.label,
                    pdf_path.display()
                ),
                Ok(_) => return Ok(pdf_path),
            };

            emit(Level::Debug, "deck.convert.failed", &description, None);
            attempts.push(description);
        }
    }

    Err(RasterizeError::ConversionFailed { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_try_plain_then_isolated_export() {
        let strategies = conversion_strategies(
            Path::new("/decks/talk.pptx"),
            Path::new("/work/pdf"),
            Path::new("/work/profile"),
        );
        assert_eq!(strategies.len(), 2);

        let plain: Vec<_> = strategies[0]
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            plain,
            [
                "--headless",
                "--convert-to",
                "pdf",
                "--outdir",
                "/work/pdf",
                "/decks/talk.pptx"
            ]
        );

        let isolated: Vec<_> = strategies[1]
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(isolated[0], "-env:UserInstallation=file:///work/profile");
        assert!(isolated.contains(&"pdf:impress_pdf_Export".to_string()));
        assert_eq!(isolated.last().map(String::as_str), Some("/decks/talk.pptx"));
    }

    #[test]
    fn expected_pdf_keeps_the_deck_stem() {
        assert_eq!(
            expected_pdf_path(Path::new("/decks/Q3 review.pptx"), Path::new("/tmp/out")),
            PathBuf::from("/tmp/out/Q3 review.pdf")
        );
    }

    #[test]
    fn last_line_skips_trailing_blank_lines() {
        assert_eq!(last_line(b"warming up\nError: source file could not be loaded\n\n"), "Error: source file could not be loaded");
        assert_eq!(last_line(b""), "");
    }
}
