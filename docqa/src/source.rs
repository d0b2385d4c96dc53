//! Raw document sources and text extraction.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::document::RawDocument;
use crate::error::{QaError, Result};

/// Turns uploaded bytes into plain text.
///
/// Implementations wrap format-specific readers (PDF, DOCX, ...). A failure
/// concerns one document only; batch ingestion logs it and moves on.
pub trait TextExtractor: Send + Sync {
    /// Extract the text of `document`.
    fn extract_text(&self, document: &RawDocument) -> Result<String>;
}

/// Treats document bytes as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, document: &RawDocument) -> Result<String> {
        std::str::from_utf8(&document.bytes).map(str::to_string).map_err(|e| {
            QaError::ExtractionError {
                source_id: document.id.clone(),
                message: format!("not valid UTF-8: {e}"),
            }
        })
    }
}

/// Load every file under `root` whose extension matches `extension`.
///
/// Matching ignores ASCII case and an optional leading dot. Files are
/// returned sorted by path; each id is the path relative to `root` with `/`
/// separators, so top-level files are keyed by their file name.
///
/// # Errors
///
/// Returns [`QaError::InvalidInput`] if `root` is not a directory. A matching
/// file that cannot be read is logged and left out; the rest still load.
pub fn load_directory(root: impl AsRef<Path>, extension: &str) -> Result<Vec<RawDocument>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(QaError::InvalidInput(format!("'{}' is not a directory", root.display())));
    }
    let extension = extension.trim_start_matches('.');

    let mut paths = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();
    paths.sort();

    Ok(read_documents(root, paths))
}

/// Read `paths` into documents keyed relative to `root`, skipping failures.
fn read_documents(root: &Path, paths: Vec<PathBuf>) -> Vec<RawDocument> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(document.id = %id, bytes = bytes.len(), "loaded document");
                documents.push(RawDocument { id, bytes });
            }
            Err(e) => warn!(document.id = %id, error = %e, "skipping unreadable document"),
        }
    }
    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_extraction_rejects_invalid_utf8() {
        let ok = RawDocument::from_text("a.txt", "hello");
        assert_eq!(PlainTextExtractor.extract_text(&ok).unwrap(), "hello");

        let bad = RawDocument::new("b.bin", vec![0xff, 0xfe, 0x00]);
        match PlainTextExtractor.extract_text(&bad) {
            Err(QaError::ExtractionError { source_id, .. }) => assert_eq!(source_id, "b.bin"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn loads_matching_files_sorted_with_relative_ids() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.txt"), "bee").unwrap();
        fs::write(root.join("A.TXT"), "upper").unwrap();
        fs::write(root.join("nested/c.txt"), "sea").unwrap();
        fs::write(root.join("notes.md"), "skip").unwrap();

        let docs = load_directory(root, ".txt").unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["A.TXT", "b.txt", "nested/c.txt"]);
        assert_eq!(docs[2].bytes, b"sea");
    }

    #[test]
    fn unreadable_file_does_not_drop_the_others() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("a.txt"), "kept").unwrap();
        fs::write(root.join("c.txt"), "also kept").unwrap();
        // Listed but gone by the time it is read.
        let paths = vec![root.join("a.txt"), root.join("b.txt"), root.join("c.txt")];

        let docs = read_documents(root, paths);
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "c.txt"]);
        assert_eq!(docs[1].bytes, b"also kept");
    }

    #[test]
    fn missing_directory_is_invalid_input() {
        let temp = tempfile::tempdir().unwrap();
        let err = load_directory(temp.path().join("absent"), "pdf").unwrap_err();
        assert!(matches!(err, QaError::InvalidInput(_)));
    }
}
