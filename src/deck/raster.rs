use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use duct::cmd;

use super::RasterOptions;
use super::error::RasterizeError;
use crate::config::ImageFormat;
use crate::ui::prelude::*;

const PAGE_PREFIX: &str = "page";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfRenderer {
    Pdftoppm(PathBuf),
    Mutool(PathBuf),
}

impl PdfRenderer {
    fn name(&self) -> &'static str {
        match self {
            PdfRenderer::Pdftoppm(_) => "pdftoppm",
            PdfRenderer::Mutool(_) => "mutool",
        }
    }

    /// Extension of the files this renderer writes for `format`.
    /// mutool only writes PNG here.
    pub fn output_extension(&self, format: ImageFormat) -> &'static str {
        match self {
            PdfRenderer::Pdftoppm(_) => format.extension(),
            PdfRenderer::Mutool(_) => ImageFormat::Png.extension(),
        }
    }
}

/// Renderers on PATH, preferred first.
pub fn locate_renderers() -> Vec<PdfRenderer> {
    let mut renderers = Vec::new();
    if let Ok(path) = which::which("pdftoppm") {
        renderers.push(PdfRenderer::Pdftoppm(path));
    }
    if let Ok(path) = which::which("mutool") {
        renderers.push(PdfRenderer::Mutool(path));
    }
    renderers
}

pub fn pdftoppm_args(options: &RasterOptions, pdf: &Path, prefix: &Path) -> Vec<OsString> {
    let aa = if options.antialias { "yes" } else { "no" };
    let mut args: Vec<OsString> = vec![
        "-r".into(),
        options.dpi.to_string().into(),
        "-aa".into(),
        aa.into(),
        "-aaVector".into(),
        aa.into(),
    ];
    match options.image_format {
        ImageFormat::Png => args.push("-png".into()),
        ImageFormat::Jpeg => {
            args.push("-jpeg".into());
            args.push("-jpegopt".into());
            args.push("quality=90".into());
        }
    }
    args.push(pdf.as_os_str().to_owned());
    args.push(prefix.as_os_str().to_owned());
    args
}

pub fn mutool_args(options: &RasterOptions, pdf: &Path, pattern: &Path) -> Vec<OsString> {
    let bits = if options.antialias { "8" } else { "0" };
    vec![
        "draw".into(),
        "-r".into(),
        options.dpi.to_string().into(),
        "-A".into(),
        bits.into(),
        "-o".into(),
        pattern.as_os_str().to_owned(),
        pdf.as_os_str().to_owned(),
    ]
}

/// Page number encoded in a renderer output name such as `page-07.png`.
fn page_index(path: &Path, ext: &str) -> Option<usize> {
    if path.extension()?.to_str()? != ext {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let number = stem.strip_prefix(PAGE_PREFIX)?.trim_start_matches('-');
    number.parse().ok()
}

/// Collect rendered pages in page order. pdftoppm zero-pads depending on
/// page count, so ordering is numeric rather than lexical.
pub fn collect_pages(dir: &Path, ext: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut pages: Vec<(usize, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(index) = page_index(&path, ext) {
            pages.push((index, path));
        }
    }
    pages.sort_by_key(|(index, _)| *index);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn run_renderer(
    renderer: &PdfRenderer,
    options: &RasterOptions,
    pdf: &Path,
    out_dir: &Path,
) -> Result<(), String> {
    let (program, args) = match renderer {
        PdfRenderer::Pdftoppm(path) => (path, pdftoppm_args(options, pdf, &out_dir.join(PAGE_PREFIX))),
        PdfRenderer::Mutool(path) => (
            path,
            mutool_args(options, pdf, &out_dir.join(format!("{PAGE_PREFIX}-%d.png"))),
        ),
    };

    let output = cmd(program, &args)
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()
        .map_err(|e| format!("{}: {e}", renderer.name()))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{}: exited with {:?}: {}",
            renderer.name(),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

/// Render every page of `pdf` into `work_dir`, trying each available
/// renderer until one produces pages.
pub fn render_pages(
    pdf: &Path,
    work_dir: &Path,
    options: &RasterOptions,
) -> Result<Vec<PathBuf>, RasterizeError> {
    let renderers = locate_renderers();
    if renderers.is_empty() {
        return Err(RasterizeError::RendererUnavailable);
    }

    let mut attempts = Vec::new();
    let mut rendered_nothing = false;

    for (i, renderer) in renderers.iter().enumerate() {
        let out_dir = work_dir.join(format!("pages-{i}"));
        fs::create_dir_all(&out_dir)?;

        emit(
            Level::Debug,
            "deck.render.attempt",
            &format!("Rendering {} at {} dpi with {}", pdf.display(), options.dpi, renderer.name()),
            None,
        );

        if let Err(message) = run_renderer(renderer, options, pdf, &out_dir) {
            emit(Level::Debug, "deck.render.failed", &message, None);
            attempts.push(message);
            continue;
        }

        let pages = collect_pages(&out_dir, renderer.output_extension(options.image_format))?;
        if pages.is_empty() {
            rendered_nothing = true;
            attempts.push(format!("{}: produced no pages", renderer.name()));
            continue;
        }
        return Ok(pages);
    }

    if rendered_nothing {
        Err(RasterizeError::EmptyOutput(pdf.to_path_buf()))
    } else {
        Err(RasterizeError::RenderFailed {
            path: pdf.to_path_buf(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn pdftoppm_args_follow_options() {
        let options = RasterOptions {
            dpi: 150,
            image_format: ImageFormat::Jpeg,
            antialias: false,
        };
        let args = strings(&pdftoppm_args(&options, Path::new("in.pdf"), Path::new("out/page")));
        assert_eq!(
            args,
            [
                "-r", "150", "-aa", "no", "-aaVector", "no", "-jpeg", "-jpegopt", "quality=90",
                "in.pdf", "out/page"
            ]
        );
    }

    #[test]
    fn mutool_args_use_page_pattern() {
        let options = RasterOptions::default();
        let args = strings(&mutool_args(&options, Path::new("in.pdf"), Path::new("out/page-%d.png")));
        assert_eq!(args[0], "draw");
        assert!(args.windows(2).any(|w| w == ["-r", "300"]));
        assert!(args.windows(2).any(|w| w == ["-A", "8"]));
        assert_eq!(args.last().map(String::as_str), Some("in.pdf"));
    }

    #[test]
    fn collect_pages_orders_numerically() {
        let dir = tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "notes.txt", "page-3.jpg"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let pages = collect_pages(dir.path(), "png").unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[test]
    fn collect_pages_handles_zero_padding() {
        let dir = tempdir().unwrap();
        for name in ["page-02.png", "page-01.png"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let pages = collect_pages(dir.path(), "png").unwrap();
        assert!(pages[0].ends_with("page-01.png"));
        assert!(pages[1].ends_with("page-02.png"));
    }
}
