//! Slide rasterization: presentation -> PDF -> one image per slide.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::common::paths;
use crate::config::{ImageFormat, PipelineConfig};
use crate::ui::prelude::*;

pub mod convert;
pub mod error;
pub mod metadata;
pub mod raster;

pub use error::RasterizeError;
pub use metadata::{DeckInfo, SlideSummary, inspect};

/// One page of the source deck, rendered to an image on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slide {
    /// 1-based position in the deck
    pub number: usize,
    pub image_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeckFormat {
    Pptx,
    Ppt,
    /// Already fixed-layout, conversion is skipped
    Pdf,
}

impl DeckFormat {
    pub fn from_path(path: &Path) -> Result<Self, RasterizeError> {
        match paths::lowercase_extension(path).as_deref() {
            Some("pptx") => Ok(DeckFormat::Pptx),
            Some("ppt") => Ok(DeckFormat::Ppt),
            Some("pdf") => Ok(DeckFormat::Pdf),
            _ => Err(RasterizeError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterOptions {
    pub dpi: u32,
    pub image_format: ImageFormat,
    pub antialias: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            dpi: 300,
            image_format: ImageFormat::Png,
            antialias: true,
        }
    }
}

impl From<&PipelineConfig> for RasterOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            dpi: config.ppt_dpi,
            image_format: config.image_format,
            antialias: config.antialias,
        }
    }
}

/// Turns a deck into ordered slide images inside `out_dir`.
pub trait SlideRasterizer: Send + Sync {
    fn rasterize(&self, deck: &Path, out_dir: &Path) -> Result<Vec<Slide>, RasterizeError>;
}

/// Office suite for PDF conversion, poppler or mupdf for rendering.
#[derive(Debug, Clone, Default)]
pub struct OfficeRasterizer {
    options: RasterOptions,
}

impl OfficeRasterizer {
    pub fn new(options: RasterOptions) -> Self {
        Self { options }
    }
}

impl SlideRasterizer for OfficeRasterizer {
    fn rasterize(&self, deck: &Path, out_dir: &Path) -> Result<Vec<Slide>, RasterizeError> {
        if !deck.exists() {
            return Err(RasterizeError::NotFound(deck.to_path_buf()));
        }
        let format = DeckFormat::from_path(deck)?;

        // Dropped on every return path, taking the PDF and raw pages with it
        let work = tempfile::Builder::new().prefix("slidecast-raster-").tempdir()?;

        let pdf = match format {
            DeckFormat::Pdf => deck.to_path_buf(),
            DeckFormat::Pptx | DeckFormat::Ppt => {
                emit(
                    Level::Info,
                    "deck.convert.start",
                    &format!("Converting {} to PDF", deck.display()),
                    None,
                );
                convert::convert_to_pdf(deck, work.path())?
            }
        };

        let pages = raster::render_pages(&pdf, work.path(), &self.options)?;
        let slides = place_pages(&pages, out_dir)?;

        emit(
            Level::Info,
            "deck.render.done",
            &format!("Rendered {} slides at {} dpi", slides.len(), self.options.dpi),
            Some(serde_json::json!({ "slides": slides.len(), "dpi": self.options.dpi })),
        );
        Ok(slides)
    }
}

/// Copy rendered pages to `out_dir` as `slide_001.<ext>`, `slide_002.<ext>`, ...
pub fn place_pages(pages: &[PathBuf], out_dir: &Path) -> Result<Vec<Slide>, RasterizeError> {
    fs::create_dir_all(out_dir)?;

    let mut slides = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        let number = i + 1;
        let ext = page.extension().and_then(|e| e.to_str()).unwrap_or("png");
        let image_path = out_dir.join(format!("slide_{number:03}.{ext}"));
        fs::copy(page, &image_path)?;
        slides.push(Slide { number, image_path });
    }
    Ok(slides)
}
