// Core domain types shared across all Folio crates.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File holding the document text inside a bundle directory.
pub const BUNDLE_INDEX_FILE: &str = "index.md";

/// How a content item is laid out on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// A single document file, e.g. `posts/2024-01-01-old-post.md`.
    SingleFile,
    /// A directory whose document lives in `index.md` next to its assets.
    BundleWithIndex,
}

/// Identifies a document on disk. Immutable: renames produce a new value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentItem {
    path: PathBuf,
    format: ContentFormat,
    /// Top-level workspace folder holding the item (e.g. `posts`).
    section: Option<String>,
}

impl ContentItem {
    pub fn new(path: impl Into<PathBuf>, format: ContentFormat, section: Option<String>) -> Self {
        Self { path: path.into(), format, section }
    }

    pub fn single_file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ContentFormat::SingleFile, None)
    }

    pub fn bundle(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ContentFormat::BundleWithIndex, None)
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Same item relocated to `path`; format and section are kept.
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), format: self.format, section: self.section.clone() }
    }

    /// Path identifying the item: the file, or the bundle directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ContentFormat {
        self.format
    }

    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// File whose text is read and written for this item.
    pub fn document_path(&self) -> PathBuf {
        match self.format {
            ContentFormat::SingleFile => self.path.clone(),
            ContentFormat::BundleWithIndex => self.path.join(BUNDLE_INDEX_FILE),
        }
    }

    /// Extension carried over by canonical renames. Bundles have none.
    pub fn extension(&self) -> Option<&OsStr> {
        match self.format {
            ContentFormat::SingleFile => self.path.extension(),
            ContentFormat::BundleWithIndex => None,
        }
    }
}
