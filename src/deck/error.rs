use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterizeError {
    #[error("Deck not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported deck format: {0} (expected .pptx, .ppt or .pdf)")]
    UnsupportedFormat(PathBuf),

    #[error("No office suite found on PATH (tried soffice, libreoffice)")]
    ConverterUnavailable,

    #[error("PDF conversion failed, every strategy was exhausted:\n  {}", .attempts.join("\n  "))]
    ConversionFailed { attempts: Vec<String> },

    #[error("No PDF renderer found on PATH (tried pdftoppm, mutool)")]
    RendererUnavailable,

    #[error("Rendering {path} failed:\n  {}", .attempts.join("\n  "))]
    RenderFailed {
        path: PathBuf,
        attempts: Vec<String>,
    },

    #[error("Renderer produced no pages for {0}")]
    EmptyOutput(PathBuf),

    #[error("Failed to read deck metadata: {0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open pptx container: {0}")]
    Zip(#[from] zip::result::ZipError),
}
