// Workspace access grants.
//
// A grant is opaque bytes that resolve back to a workspace root. Access to
// the root is held through a `ScopedAccess` guard that releases exactly once:
// explicitly, on drop, or when the owning document is closed or replaced.
// The OS-specific primitive sits behind `AccessGrantResolver` so containment
// logic is testable without a sandbox.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Handle returned by `start_access`, passed back to `stop_access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessToken(u64);

impl AccessToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Outcome of resolving grant bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGrant {
    pub root: PathBuf,
    /// Replacement bytes when the grant still works but should be re-issued.
    pub refreshed: Option<Vec<u8>>,
}

impl ResolvedGrant {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), refreshed: None }
    }
}

#[derive(Debug, Error)]
pub enum GrantError {
    #[error("access grant is stale: {0}")]
    Stale(String),

    #[error("access grant is malformed")]
    Malformed(#[source] serde_json::Error),

    #[error("access to `{}` was denied", path.display())]
    AccessDenied { path: PathBuf },

    #[error("failed to create access grant for `{}`", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// OS access-grant primitive.
///
/// `resolve` may suspend; it returns a `Send` future so restoration can run
/// on a multi-threaded runtime. `stop_access` must be cheap and infallible
/// since it runs from `Drop`.
pub trait AccessGrantResolver: Send + Sync + 'static {
    /// Issue grant bytes for a root the user explicitly chose.
    fn create_grant(&self, root: &Path) -> Result<Vec<u8>, GrantError>;

    /// Resolve grant bytes to a workspace root. Any error means the grant is
    /// stale or revoked.
    fn resolve(&self, grant: &[u8]) -> impl Future<Output = Result<ResolvedGrant, GrantError>> + Send;

    fn start_access(&self, root: &Path) -> Result<AccessToken, GrantError>;

    fn stop_access(&self, token: AccessToken);
}

// ── Scoped access guard ────────────────────────────────────────────

/// Held access to a workspace root. Released exactly once.
pub struct ScopedAccess {
    root: PathBuf,
    token: AccessToken,
    release: Option<Box<dyn FnOnce(AccessToken) + Send + Sync>>,
}

impl ScopedAccess {
    pub fn acquire<R: AccessGrantResolver>(resolver: Arc<R>, root: &Path) -> Result<Self, GrantError> {
        let token = resolver.start_access(root)?;
        debug!(root = %root.display(), token = token.id(), "workspace access started");
        Ok(Self {
            root: root.to_path_buf(),
            token,
            release: Some(Box::new(move |token| resolver.stop_access(token))),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn token(&self) -> AccessToken {
        self.token
    }

    /// Release now instead of on drop.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.token);
            debug!(root = %self.root.display(), token = self.token.id(), "workspace access released");
        }
    }
}

impl Drop for ScopedAccess {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for ScopedAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedAccess")
            .field("root", &self.root)
            .field("token", &self.token)
            .field("released", &self.release.is_none())
            .finish()
    }
}

// ── Path-backed resolver ───────────────────────────────────────────

const PATH_GRANT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PathGrant {
    version: u32,
    root: PathBuf,
    granted_at: DateTime<Utc>,
}

/// Resolver for platforms without OS security scopes.
///
/// Grant bytes are a JSON record of the canonical root. A grant goes stale
/// when its root disappears or stops being a directory. Tokens are tracked
/// so an unknown or repeated release is logged.
#[derive(Debug, Default)]
pub struct PathGrantResolver {
    next_token: AtomicU64,
    active: Mutex<HashSet<u64>>,
}

impl PathGrantResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of access scopes started and not yet stopped.
    pub fn active_scopes(&self) -> usize {
        self.active.lock().map(|active| active.len()).unwrap_or(0)
    }

    fn encode(root: &Path) -> Result<Vec<u8>, GrantError> {
        let grant = PathGrant {
            version: PATH_GRANT_VERSION,
            root: root.to_path_buf(),
            granted_at: Utc::now(),
        };
        serde_json::to_vec(&grant).map_err(GrantError::Malformed)
    }
}

impl AccessGrantResolver for PathGrantResolver {
    fn create_grant(&self, root: &Path) -> Result<Vec<u8>, GrantError> {
        let root = std::fs::canonicalize(root)
            .map_err(|source| GrantError::Create { path: root.to_path_buf(), source })?;
        Self::encode(&root)
    }

    async fn resolve(&self, grant: &[u8]) -> Result<ResolvedGrant, GrantError> {
        let grant: PathGrant = serde_json::from_slice(grant).map_err(GrantError::Malformed)?;
        if grant.version != PATH_GRANT_VERSION {
            return Err(GrantError::Stale(format!("unsupported grant version {}", grant.version)));
        }

        let metadata = tokio::fs::metadata(&grant.root).await.map_err(|error| {
            GrantError::Stale(format!("`{}` is unavailable: {error}", grant.root.display()))
        })?;
        if !metadata.is_dir() {
            return Err(GrantError::Stale(format!("`{}` is not a directory", grant.root.display())));
        }

        // The root moved behind a symlink: keep working, re-issue for the new location.
        let canonical = tokio::fs::canonicalize(&grant.root).await.map_err(|error| {
            GrantError::Stale(format!("`{}` is unavailable: {error}", grant.root.display()))
        })?;
        let refreshed = if canonical != grant.root { Some(Self::encode(&canonical)?) } else { None };

        Ok(ResolvedGrant { root: canonical, refreshed })
    }

    fn start_access(&self, root: &Path) -> Result<AccessToken, GrantError> {
        if !root.is_dir() {
            return Err(GrantError::AccessDenied { path: root.to_path_buf() });
        }
        let id = self.next_token.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut active) = self.active.lock() {
            active.insert(id);
        }
        Ok(AccessToken::new(id))
    }

    fn stop_access(&self, token: AccessToken) {
        let known = self.active.lock().map(|mut active| active.remove(&token.id())).unwrap_or(false);
        if !known {
            warn!(token = token.id(), "stop_access for an unknown or already released token");
        }
    }
}
