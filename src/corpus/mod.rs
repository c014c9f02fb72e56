//! Document corpus loading
//!
//! The indexer consumes documents through the [`DocumentSource`] trait; how
//! the raw text was obtained (scraped, exported, hand-written) is not this
//! crate's concern. [`DirectorySource`] covers the common case of a directory
//! of UTF-8 `.txt` files.

use crate::error::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One raw source text unit, identified by a stable source id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, unique within the corpus (filename-equivalent)
    pub source_id: String,

    /// Full document text
    pub text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// Supplier of documents to index
pub trait DocumentSource: Send + Sync {
    /// Enumerate all documents in the corpus
    fn enumerate(&self) -> Result<Vec<Document>>;
}

/// Loads every `.txt` file under a directory tree as a document
///
/// The source id is the file name. Files are visited in sorted path order so
/// repeated enumerations of an unchanged tree are identical. Empty and
/// unreadable files are skipped with a warning rather than failing the run.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect_txt_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let entries = std::fs::read_dir(dir).map_err(|e| QuarryError::Io {
            source: e,
            context: format!("Failed to read corpus directory: {:?}", dir),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| QuarryError::Io {
                source: e,
                context: format!("Failed to read directory entry in {:?}", dir),
            })?;
            let path = entry.path();
            if path.is_dir() {
                Self::collect_txt_files(&path, out)?;
            } else if path.extension().is_some_and(|ext| ext == "txt") {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl DocumentSource for DirectorySource {
    fn enumerate(&self) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(QuarryError::Corpus(format!(
                "Corpus directory not found: {:?}",
                self.root
            )));
        }

        let mut paths = Vec::new();
        Self::collect_txt_files(&self.root, &mut paths)?;
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let source_id = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };

            if text.trim().is_empty() {
                tracing::warn!(path = %path.display(), "skipping empty file");
                continue;
            }

            documents.push(Document { source_id, text });
        }

        tracing::info!(count = documents.len(), root = %self.root.display(), "loaded corpus");
        Ok(documents)
    }
}
