use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Scratch directory holding config files and decks for one test.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("slidecast-e2e-").tempdir()?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Minimal pptx container: one titled slide per entry, `None` for a body-only slide.
    pub fn write_pptx(&self, name: &str, titles: &[Option<&str>]) -> Result<PathBuf> {
        let path = self.path().join(name);
        let mut writer = zip::ZipWriter::new(File::create(&path)?);
        let options = SimpleFileOptions::default();

        for (index, title) in titles.iter().enumerate() {
            let shape = match title {
                Some(text) => format!(
                    r#"<p:sp><p:nvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>"#
                ),
                None => r#"<p:sp><p:nvSpPr><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>bullets</a:t></a:r></a:p></p:txBody></p:sp>"#.to_string(),
            };
            writer.start_file(format!("ppt/slides/slide{}.xml", index + 1), options)?;
            write!(writer, "<p:sld><p:cSld><p:spTree>{shape}</p:spTree></p:cSld></p:sld>")?;
        }
        writer.finish()?;
        Ok(path)
    }
}
