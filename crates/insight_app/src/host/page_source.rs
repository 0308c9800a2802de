use std::fs;
use std::path::Path;

use anyhow::Context;
use insight_engine::Page;
use widget_logging::widget_info;

/// Reads a saved HTML page, decoding it to UTF-8 before parsing.
pub fn load_page(path: &Path) -> anyhow::Result<Page> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let page = Page::from_bytes(&bytes, None)
        .with_context(|| format!("decoding {}", path.display()))?;
    widget_info!("Loaded page {} ({} bytes)", path.display(), bytes.len());
    Ok(page)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_and_decodes_latin1_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<html><head><meta charset=\"iso-8859-1\"></head><body><main>Gr\xfc\xdfe</main></body></html>")
            .unwrap();

        let page = load_page(file.path()).unwrap();
        let main = page.select("main").unwrap()[0];
        assert_eq!(page.text(main).unwrap(), "Grüße");
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.html");
        let err = load_page(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.html"));
    }
}
