// Session slots persisted across restarts: the last open document and the
// workspace access grant.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::grant::AccessGrantResolver;
use crate::prefs::{MemoryPreferenceStore, PreferenceError, PreferenceStore};

/// Absolute path string of the last successfully opened document.
pub const LAST_OPEN_PATH_KEY: &str = "last-open-path";
/// Opaque access-grant bytes for the user-chosen workspace root.
pub const WORKSPACE_GRANT_KEY: &str = "workspace-grant";

/// Both slots read together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    pub last_open_path: Option<PathBuf>,
    pub workspace_grant: Option<Vec<u8>>,
}

/// Typed view over the two session slots of a [`PreferenceStore`].
#[derive(Clone)]
pub struct SessionStore {
    prefs: Arc<dyn PreferenceStore>,
}

impl SessionStore {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    /// Store backed by a fresh [`MemoryPreferenceStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPreferenceStore::new()))
    }

    pub fn last_open_path(&self) -> Result<Option<PathBuf>, PreferenceError> {
        let Some(bytes) = self.prefs.get(LAST_OPEN_PATH_KEY)? else {
            return Ok(None);
        };
        match String::from_utf8(bytes) {
            Ok(text) if !text.is_empty() => Ok(Some(PathBuf::from(text))),
            Ok(_) => Ok(None),
            Err(_) => {
                warn!(key = LAST_OPEN_PATH_KEY, "ignoring non UTF-8 session value");
                Ok(None)
            }
        }
    }

    /// Record `path` as the last open document. Paths that are not valid
    /// UTF-8 are skipped rather than stored lossily.
    pub fn set_last_open_path(&self, path: &Path) -> Result<(), PreferenceError> {
        match path.to_str() {
            Some(text) => self.prefs.set(LAST_OPEN_PATH_KEY, text.as_bytes()),
            None => {
                warn!(path = %path.display(), "not recording non UTF-8 path");
                Ok(())
            }
        }
    }

    pub fn clear_last_open_path(&self) -> Result<(), PreferenceError> {
        self.prefs.remove(LAST_OPEN_PATH_KEY)
    }

    pub fn workspace_grant(&self) -> Result<Option<Vec<u8>>, PreferenceError> {
        Ok(self.prefs.get(WORKSPACE_GRANT_KEY)?.filter(|bytes| !bytes.is_empty()))
    }

    pub fn set_workspace_grant(&self, grant: &[u8]) -> Result<(), PreferenceError> {
        self.prefs.set(WORKSPACE_GRANT_KEY, grant)
    }

    pub fn clear_workspace_grant(&self) -> Result<(), PreferenceError> {
        self.prefs.remove(WORKSPACE_GRANT_KEY)
    }

    pub fn record(&self) -> Result<SessionRecord, PreferenceError> {
        Ok(SessionRecord {
            last_open_path: self.last_open_path()?,
            workspace_grant: self.workspace_grant()?,
        })
    }

    /// The user explicitly opened `root` as the workspace: create and store
    /// a grant for it. Returns the canonical root.
    pub fn grant_workspace<R: AccessGrantResolver>(
        &self,
        resolver: &R,
        root: &Path,
    ) -> Result<PathBuf> {
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("workspace `{}` is not accessible", root.display()))?;
        anyhow::ensure!(root.is_dir(), "workspace `{}` is not a directory", root.display());

        let grant = resolver
            .create_grant(&root)
            .with_context(|| format!("failed to create access grant for `{}`", root.display()))?;
        self.set_workspace_grant(&grant).context("failed to persist workspace grant")?;
        info!(root = %root.display(), "workspace granted");
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::PathGrantResolver;
    use crate::prefs::JsonFilePreferenceStore;
    use tempfile::TempDir;

    #[test]
    fn slots_start_empty() {
        let store = SessionStore::in_memory();
        assert_eq!(store.record().unwrap(), SessionRecord::default());
    }

    #[test]
    fn last_open_path_roundtrip_and_clear() {
        let store = SessionStore::in_memory();
        store.set_last_open_path(Path::new("/ws/posts/a.md")).unwrap();
        assert_eq!(store.last_open_path().unwrap(), Some(PathBuf::from("/ws/posts/a.md")));
        store.clear_last_open_path().unwrap();
        assert_eq!(store.last_open_path().unwrap(), None);
    }

    #[test]
    fn grant_roundtrip_and_clear() {
        let store = SessionStore::in_memory();
        store.set_workspace_grant(b"opaque").unwrap();
        assert_eq!(store.workspace_grant().unwrap(), Some(b"opaque".to_vec()));
        store.clear_workspace_grant().unwrap();
        assert_eq!(store.workspace_grant().unwrap(), None);
    }

    #[test]
    fn empty_values_read_as_absent() {
        let store = SessionStore::in_memory();
        store.set_workspace_grant(b"").unwrap();
        store.prefs.set(LAST_OPEN_PATH_KEY, b"").unwrap();
        assert_eq!(store.record().unwrap(), SessionRecord::default());
    }

    #[test]
    fn slots_survive_restart_with_file_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        {
            let store = SessionStore::new(Arc::new(JsonFilePreferenceStore::open(&path).unwrap()));
            store.set_last_open_path(Path::new("/ws/a.md")).unwrap();
            store.set_workspace_grant(b"grant-bytes").unwrap();
        }
        let store = SessionStore::new(Arc::new(JsonFilePreferenceStore::open(&path).unwrap()));
        assert_eq!(
            store.record().unwrap(),
            SessionRecord {
                last_open_path: Some(PathBuf::from("/ws/a.md")),
                workspace_grant: Some(b"grant-bytes".to_vec()),
            }
        );
    }

    #[test]
    fn grant_workspace_stores_grant_for_canonical_root() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::in_memory();
        let resolver = PathGrantResolver::new();

        let root = store.grant_workspace(&resolver, dir.path()).unwrap();

        assert_eq!(root, std::fs::canonicalize(dir.path()).unwrap());
        assert!(store.workspace_grant().unwrap().is_some());
    }

    #[test]
    fn grant_workspace_rejects_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("post.md");
        std::fs::write(&file, "x").unwrap();
        let store = SessionStore::in_memory();

        assert!(store.grant_workspace(&PathGrantResolver::new(), &file).is_err());
        assert_eq!(store.workspace_grant().unwrap(), None);
    }
}
