// Canonical `{YYYY-MM-DD}-{slug}{ext}` renames driven by frontmatter.
//
// A rename never leaves the item's directory and never overwrites: an
// existing target cancels it silently.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use folio_common::frontmatter::Frontmatter;
use folio_common::slug::slugify;
use folio_common::types::ContentItem;
use tracing::{debug, info, warn};

use crate::error::RenameError;
use crate::fs::FileSystem;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameDecision {
    pub should_rename: bool,
    /// Computed canonical path, also reported when the rename is skipped
    /// because it already matches or is taken.
    pub target_path: Option<PathBuf>,
}

impl RenameDecision {
    pub fn skip() -> Self {
        Self::default()
    }
}

/// `{date}-{slug}` plus the original extension (with its dot) when there is one.
pub fn canonical_file_name(date: NaiveDate, slug: &str, extension: Option<&OsStr>) -> OsString {
    let mut name = OsString::from(format!("{}-{slug}", date.format("%Y-%m-%d")));
    if let Some(extension) = extension.filter(|ext| !ext.is_empty()) {
        name.push(".");
        name.push(extension);
    }
    name
}

/// Canonical path next to `current`. `None` when `current` has no parent.
pub fn target_path(
    current: &Path,
    date: NaiveDate,
    slug: &str,
    extension: Option<&OsStr>,
) -> Option<PathBuf> {
    current.parent().map(|dir| dir.join(canonical_file_name(date, slug, extension)))
}

/// Name source for the slug: a non-blank `slug` override, else the title.
///
/// The override goes through `slugify` too so it can never carry a path
/// separator; an already-valid slug is unchanged.
fn slug_source(frontmatter: &Frontmatter) -> Option<String> {
    frontmatter.slug().or_else(|| frontmatter.title()).map(|source| slugify(&source))
}

pub struct RenamePolicy {
    fs: Arc<dyn FileSystem>,
}

impl RenamePolicy {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn decide(&self, item: &ContentItem, frontmatter: Option<&Frontmatter>) -> RenameDecision {
        let Some(frontmatter) = frontmatter else {
            return RenameDecision::skip();
        };
        let Some(date) = frontmatter.date() else {
            debug!(path = %item.path().display(), "no date in frontmatter; rename skipped");
            return RenameDecision::skip();
        };
        let Some(slug) = slug_source(frontmatter) else {
            debug!(path = %item.path().display(), "no slug or title in frontmatter; rename skipped");
            return RenameDecision::skip();
        };
        let Some(target) = target_path(item.path(), date, &slug, item.extension()) else {
            return RenameDecision::skip();
        };

        if target == item.path() {
            return RenameDecision { should_rename: false, target_path: Some(target) };
        }
        if self.fs.exists(&target) {
            debug!(target = %target.display(), "rename target exists; keeping current name");
            return RenameDecision { should_rename: false, target_path: Some(target) };
        }
        RenameDecision { should_rename: true, target_path: Some(target) }
    }

    /// Move the item when the decision says so. Returns the relocated item,
    /// or `None` when nothing moved. On failure the original path stays
    /// authoritative.
    pub fn execute(
        &self,
        item: &ContentItem,
        decision: &RenameDecision,
    ) -> Result<Option<ContentItem>, RenameError> {
        if !decision.should_rename {
            return Ok(None);
        }
        let Some(target) = decision.target_path.as_deref() else {
            return Ok(None);
        };
        if target.parent() != item.path().parent() {
            warn!(target = %target.display(), "refusing cross-directory rename");
            return Ok(None);
        }
        // Something may have appeared since `decide`.
        if self.fs.exists(target) {
            info!(target = %target.display(), "rename target appeared; keeping current name");
            return Ok(None);
        }

        self.fs.rename(item.path(), target).map_err(|source| RenameError::RenameFailed {
            from: item.path().to_path_buf(),
            to: target.to_path_buf(),
            source,
        })?;
        info!(from = %item.path().display(), to = %target.display(), "renamed document");
        Ok(Some(item.with_path(target)))
    }
}
