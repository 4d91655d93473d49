use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use duct::cmd;
use regex::Regex;
use serde::Serialize;

use super::DeckFormat;
use super::convert;
use super::error::RasterizeError;

static SLIDE_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("valid regex"));
static SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p:sp>.*?</p:sp>").expect("valid regex"));
static TITLE_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<p:ph\b[^>]*\btype="(?:title|ctrTitle)""#).expect("valid regex")
});
static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a:t>([^<]*)</a:t>").expect("valid regex"));
static PDF_PAGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Pages:\s+(\d+)\s*$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideSummary {
    pub number: usize,
    /// `None` when the container does not expose slide structure.
    pub has_title: Option<bool>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeckInfo {
    pub path: PathBuf,
    pub format: DeckFormat,
    pub slide_count: usize,
    pub slides: Vec<SlideSummary>,
}

/// Slide count and title presence without rasterizing anything.
pub fn inspect(path: &Path) -> Result<DeckInfo, RasterizeError> {
    if !path.exists() {
        return Err(RasterizeError::NotFound(path.to_path_buf()));
    }
    let format = DeckFormat::from_path(path)?;

    let slides = match format {
        DeckFormat::Pptx => inspect_pptx(path)?,
        DeckFormat::Pdf => untitled(pdf_page_count(path)?),
        DeckFormat::Ppt => {
            let work = tempfile::tempdir()?;
            let pdf = convert::convert_to_pdf(path, work.path())?;
            untitled(pdf_page_count(&pdf)?)
        }
    };

    Ok(DeckInfo {
        path: path.to_path_buf(),
        format,
        slide_count: slides.len(),
        slides,
    })
}

fn untitled(count: usize) -> Vec<SlideSummary> {
    (1..=count)
        .map(|number| SlideSummary {
            number,
            has_title: None,
            title: None,
        })
        .collect()
}

fn inspect_pptx(path: &Path) -> Result<Vec<SlideSummary>, RasterizeError> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;

    let mut entries: Vec<(usize, String)> = archive
        .file_names()
        .filter_map(|name| {
            let caps = SLIDE_ENTRY.captures(name)?;
            let number = caps[1].parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    entries.sort_by_key(|(number, _)| *number);

    let mut slides = Vec::with_capacity(entries.len());
    for (position, (_, name)) in entries.iter().enumerate() {
        let mut xml = String::new();
        archive.by_name(name)?.read_to_string(&mut xml)?;
        let title = find_title(&xml);
        slides.push(SlideSummary {
            number: position + 1,
            has_title: Some(title.is_some()),
            title: title.filter(|t| !t.is_empty()),
        });
    }
    Ok(slides)
}

/// Text of the title placeholder in a slide part, if the slide has one.
/// An empty string means the placeholder exists but holds no text.
pub fn find_title(xml: &str) -> Option<String> {
    let shape = SHAPE
        .find_iter(xml)
        .map(|m| m.as_str())
        .find(|shape| TITLE_PLACEHOLDER.is_match(shape))?;

    let text: String = TEXT_RUN
        .captures_iter(shape)
        .map(|caps| unescape_xml(&caps[1]))
        .collect();
    Some(text.trim().to_string())
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn parse_pdfinfo_pages(output: &str) -> Option<usize> {
    PDF_PAGES.captures(output)?[1].parse().ok()
}

fn pdf_page_count(pdf: &Path) -> Result<usize, RasterizeError> {
    let pdfinfo = which::which("pdfinfo")
        .map_err(|_| RasterizeError::Metadata("pdfinfo not found on PATH".to_string()))?;
    let output = cmd!(pdfinfo, pdf)
        .stderr_capture()
        .read()
        .map_err(|e| RasterizeError::Metadata(format!("pdfinfo failed for {}: {e}", pdf.display())))?;
    parse_pdfinfo_pages(&output).ok_or_else(|| {
        RasterizeError::Metadata(format!("pdfinfo reported no page count for {}", pdf.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    const TITLE_SLIDE: &str = r#"<p:sld><p:cSld><p:spTree>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr>
<p:txBody><a:p><a:r><a:t>Quarterly </a:t></a:r><a:r><a:t>R&amp;D Review</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:nvSpPr><p:nvPr><p:ph type="subTitle" idx="1"/></p:nvPr></p:nvSpPr>
<p:txBody><a:p><a:r><a:t>2024</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:sld>"#;

    const BODY_SLIDE: &str = r#"<p:sld><p:cSld><p:spTree>
<p:sp><p:nvSpPr><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr>
<p:txBody><a:p><a:r><a:t>Only bullets here</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn finds_centered_title_text() {
        assert_eq!(find_title(TITLE_SLIDE).as_deref(), Some("Quarterly R&D Review"));
    }

    #[test]
    fn body_only_slide_has_no_title() {
        assert_eq!(find_title(BODY_SLIDE), None);
    }

    #[test]
    fn pdfinfo_page_count_is_parsed() {
        let output = "Title:          deck\nProducer:       LibreOffice\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_pdfinfo_pages(output), Some(12));
        assert_eq!(parse_pdfinfo_pages("Title: x\n"), None);
    }

    #[test]
    fn pptx_slides_are_listed_in_numeric_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, body) in [
            ("ppt/slides/slide10.xml", BODY_SLIDE),
            ("ppt/slides/slide1.xml", TITLE_SLIDE),
            ("ppt/slides/slide2.xml", BODY_SLIDE),
            ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>"),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();

        let info = inspect(&path).unwrap();
        assert_eq!(info.format, DeckFormat::Pptx);
        assert_eq!(info.slide_count, 3);
        assert_eq!(info.slides[0].has_title, Some(true));
        assert_eq!(info.slides[0].title.as_deref(), Some("Quarterly R&D Review"));
        assert_eq!(info.slides[1].has_title, Some(false));
        assert_eq!(info.slides[2].number, 3);
    }

    #[test]
    fn missing_deck_is_reported() {
        let err = inspect(Path::new("/nope/deck.pptx")).unwrap_err();
        assert!(matches!(err, RasterizeError::NotFound(_)));
    }
}
