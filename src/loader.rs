//! Filesystem document loading for ingestion.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::index::ChunkMetadata;

/// One document ready for chunking.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Full document text.
    pub text: String,
    /// Source attribution derived from the file location.
    pub meta: ChunkMetadata,
}

/// Recursively reads all `.txt` and `.md` files under `root`.
///
/// `source` is the file name, `path` the full path. Files are read lossily,
/// so stray invalid UTF-8 does not abort an ingest run. Entries come back in
/// a deterministic (sorted) order.
pub fn load_paths(root: &Path) -> Result<Vec<LoadedDocument>> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("failed to walk documents under {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let extension = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        if !matches!(extension.as_deref(), Some("txt") | Some("md")) {
            continue;
        }
        let bytes = fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        docs.push(LoadedDocument {
            text,
            meta: ChunkMetadata {
                source: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().display().to_string(),
            },
        });
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_txt_and_md_and_skips_other_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("faq.txt"), "refund window is 30 days").unwrap();
        fs::write(dir.path().join("notes.md"), "# shipping\ntakes 5 days").unwrap();
        fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/more.txt"), "nested content").unwrap();

        let docs = load_paths(dir.path()).unwrap();
        let sources: Vec<&str> = docs.iter().map(|d| d.meta.source.as_str()).collect();
        assert_eq!(docs.len(), 3);
        assert!(sources.contains(&"faq.txt"));
        assert!(sources.contains(&"notes.md"));
        assert!(sources.contains(&"more.txt"));

        let faq = docs.iter().find(|d| d.meta.source == "faq.txt").unwrap();
        assert_eq!(faq.text, "refund window is 30 days");
        assert!(faq.meta.path.ends_with("faq.txt"));
    }

    #[test]
    fn invalid_utf8_is_read_lossily_rather_than_failing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.txt"), [b'o', b'k', 0xFF, b'!']).unwrap();
        let docs = load_paths(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.starts_with("ok"));
    }
}
