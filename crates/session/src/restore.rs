// Startup restoration of the last open document.
//
// Restoration trusts a stored path only through the workspace grant:
// resolve the grant, hold scoped access to its root, and reopen the last
// path only if it still exists inside that root. Every skip is a normal
// outcome and is logged, never surfaced as an error. A stale grant is
// cleared so later launches don't repeat the failed resolution.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use folio_common::path::{is_within, section_of};
use folio_common::types::{ContentFormat, ContentItem, BUNDLE_INDEX_FILE};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::fs::FileSystem;
use crate::grant::{AccessGrantResolver, ScopedAccess};
use crate::store::SessionStore;

/// Why nothing was restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreSkipped {
    NoGrant,
    /// Grant could not be resolved; it has been cleared.
    StaleGrant,
    AccessDenied,
    NoLastOpenPath,
    NotContained { path: PathBuf },
    Missing { path: PathBuf },
    /// A directory without a bundle index.
    NotADocument { path: PathBuf },
    StoreUnavailable,
}

impl fmt::Display for RestoreSkipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGrant => f.write_str("no workspace grant"),
            Self::StaleGrant => f.write_str("workspace grant is stale"),
            Self::AccessDenied => f.write_str("workspace access denied"),
            Self::NoLastOpenPath => f.write_str("no last open document"),
            Self::NotContained { path } => {
                write!(f, "`{}` is outside the workspace", path.display())
            }
            Self::Missing { path } => write!(f, "`{}` no longer exists", path.display()),
            Self::NotADocument { path } => write!(f, "`{}` is not a document", path.display()),
            Self::StoreUnavailable => f.write_str("session store unavailable"),
        }
    }
}

/// A restored item together with the access scope it lives under.
///
/// The scope must stay alive as long as the item is open; hand both to
/// [`crate::document::DocumentSession::open_restored`].
#[derive(Debug)]
pub struct RestoredSession {
    pub item: ContentItem,
    pub access: ScopedAccess,
}

pub struct SessionRestorer<R: AccessGrantResolver> {
    store: SessionStore,
    resolver: Arc<R>,
    fs: Arc<dyn FileSystem>,
}

impl<R: AccessGrantResolver> SessionRestorer<R> {
    pub fn new(store: SessionStore, resolver: Arc<R>, fs: Arc<dyn FileSystem>) -> Self {
        Self { store, resolver, fs }
    }

    /// Restore the last open document, or `None` with the reason logged.
    pub async fn restore_last_session(&self) -> Option<RestoredSession> {
        match self.try_restore().await {
            Ok(restored) => {
                info!(path = %restored.item.path().display(), "restored last session");
                Some(restored)
            }
            Err(reason) => {
                info!(%reason, "session restore skipped");
                None
            }
        }
    }

    pub async fn try_restore(&self) -> Result<RestoredSession, RestoreSkipped> {
        let grant = match self.store.workspace_grant() {
            Ok(Some(grant)) => grant,
            Ok(None) => return Err(RestoreSkipped::NoGrant),
            Err(error) => {
                warn!(%error, "failed to read workspace grant");
                return Err(RestoreSkipped::StoreUnavailable);
            }
        };

        let resolved = match self.resolver.resolve(&grant).await {
            Ok(resolved) => resolved,
            Err(error) => {
                warn!(%error, "workspace grant could not be resolved; clearing it");
                if let Err(error) = self.store.clear_workspace_grant() {
                    warn!(%error, "failed to clear stale workspace grant");
                }
                return Err(RestoreSkipped::StaleGrant);
            }
        };
        if let Some(refreshed) = resolved.refreshed.as_deref() {
            if let Err(error) = self.store.set_workspace_grant(refreshed) {
                warn!(%error, "failed to persist refreshed workspace grant");
            }
        }

        // From here on every early return drops `access`, which releases it.
        let access = ScopedAccess::acquire(self.resolver.clone(), &resolved.root).map_err(|error| {
            warn!(%error, root = %resolved.root.display(), "failed to start workspace access");
            RestoreSkipped::AccessDenied
        })?;

        let last_open = match self.store.last_open_path() {
            Ok(Some(path)) => path,
            Ok(None) => return Err(RestoreSkipped::NoLastOpenPath),
            Err(error) => {
                warn!(%error, "failed to read last open path");
                return Err(RestoreSkipped::StoreUnavailable);
            }
        };
        if !last_open.is_absolute() {
            return Err(RestoreSkipped::NotContained { path: last_open });
        }

        // Only symlink-resolved paths are compared: a path that cannot be
        // resolved (dangling link, `..` through a link) is never trusted.
        let Some(root) = self.resolve_path(&resolved.root).await else {
            return Err(RestoreSkipped::AccessDenied);
        };
        let Some(candidate) = self.resolve_path(&last_open).await else {
            return Err(RestoreSkipped::Missing { path: last_open });
        };
        if !is_within(&root, &candidate) {
            return Err(RestoreSkipped::NotContained { path: last_open });
        }

        let (probe, probe_root) = (candidate.clone(), root.clone());
        let (is_dir, has_index) = self
            .with_fs(move |fs| {
                let is_dir = fs.is_dir(&probe);
                let has_index = is_dir
                    && fs
                        .canonicalize(&probe.join(BUNDLE_INDEX_FILE))
                        .is_ok_and(|index| is_within(&probe_root, &index));
                (is_dir, has_index)
            })
            .await
            .ok_or_else(|| RestoreSkipped::Missing { path: candidate.clone() })?;
        let format = match (is_dir, has_index) {
            (false, _) => ContentFormat::SingleFile,
            (true, true) => ContentFormat::BundleWithIndex,
            (true, false) => return Err(RestoreSkipped::NotADocument { path: candidate }),
        };

        let section = section_of(&root, &candidate);
        Ok(RestoredSession { item: ContentItem::new(candidate, format, section), access })
    }

    /// Symlink-resolved path, or `None` when it cannot be resolved
    /// (missing target, dangling link, unreadable component).
    async fn resolve_path(&self, path: &Path) -> Option<PathBuf> {
        let owned = path.to_path_buf();
        match self.with_fs(move |fs| fs.canonicalize(&owned)).await? {
            Ok(canonical) => Some(canonical),
            Err(error) => {
                info!(%error, path = %path.display(), "path does not resolve");
                None
            }
        }
    }

    /// Run a filesystem probe off the async worker threads.
    async fn with_fs<T, F>(&self, op: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FileSystem) -> T + Send + 'static,
    {
        let fs = self.fs.clone();
        match tokio::task::spawn_blocking(move || op(fs.as_ref())).await {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(%error, "filesystem probe failed");
                None
            }
        }
    }
}

/// Run restoration in the background. The caller awaits the handle and
/// applies the result on the context that owns the document session.
pub fn spawn_restore<R: AccessGrantResolver>(
    restorer: Arc<SessionRestorer<R>>,
) -> JoinHandle<Option<RestoredSession>> {
    tokio::spawn(async move { restorer.restore_last_session().await })
}
