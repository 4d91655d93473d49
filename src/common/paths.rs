use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Centralized path management for slidecast

/// Get the slidecast config directory
pub fn slidecast_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("slidecast");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Default location of the pipeline config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(slidecast_config_dir()?.join("config.toml"))
}

/// Create `dir` (and parents) if missing
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating directory at {}", dir.display()))
}

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize path {}", path.display()))
}

/// Lowercased file extension, if any
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercase_extension_normalizes_case() {
        assert_eq!(
            lowercase_extension(Path::new("/tmp/Deck.PPTX")).as_deref(),
            Some("pptx")
        );
        assert_eq!(lowercase_extension(Path::new("/tmp/deck")), None);
    }

    #[test]
    fn canonicalize_existing_rejects_missing_paths() {
        let err = canonicalize_existing(Path::new("/definitely/not/here.pptx")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
