use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use folio_common::types::{ContentFormat, ContentItem};
use folio_session::document::DocumentSession;
use folio_session::fs::LocalFileSystem;
use folio_session::grant::{AccessGrantResolver, AccessToken, GrantError, ResolvedGrant};
use folio_session::restore::{spawn_restore, RestoreSkipped, SessionRestorer};
use folio_session::store::SessionStore;
use tempfile::TempDir;

/// Resolver whose grant bytes are the root path, counting access calls.
#[derive(Default)]
struct CountingResolver {
    revoked: AtomicBool,
    next_token: AtomicU64,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl CountingResolver {
    fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AccessGrantResolver for CountingResolver {
    fn create_grant(&self, root: &Path) -> Result<Vec<u8>, GrantError> {
        Ok(root.to_string_lossy().into_owned().into_bytes())
    }

    async fn resolve(&self, grant: &[u8]) -> Result<ResolvedGrant, GrantError> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(GrantError::Stale("revoked".to_string()));
        }
        let root = String::from_utf8(grant.to_vec())
            .map_err(|_| GrantError::Stale("not a path".to_string()))?;
        Ok(ResolvedGrant::new(root))
    }

    fn start_access(&self, _root: &Path) -> Result<AccessToken, GrantError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken::new(self.next_token.fetch_add(1, Ordering::SeqCst)))
    }

    fn stop_access(&self, _token: AccessToken) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    dir: TempDir,
    store: SessionStore,
    resolver: Arc<CountingResolver>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir should be created");
        std::fs::create_dir_all(dir.path().join("ws/posts")).expect("workspace should be created");
        Self { dir, store: SessionStore::in_memory(), resolver: Arc::new(CountingResolver::default()) }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("ws")
    }

    fn grant(&self) {
        let grant = self.resolver.create_grant(&self.root()).unwrap();
        self.store.set_workspace_grant(&grant).unwrap();
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn restorer(&self) -> SessionRestorer<CountingResolver> {
        SessionRestorer::new(self.store.clone(), self.resolver.clone(), Arc::new(LocalFileSystem))
    }

    fn session(&self) -> DocumentSession {
        DocumentSession::new(Arc::new(LocalFileSystem), self.store.clone(), Arc::new(false))
    }
}

#[tokio::test]
async fn no_grant_restores_nothing() {
    let fx = Fixture::new();
    let path = fx.write("ws/posts/a.md", "hello");
    fx.store.set_last_open_path(&path).unwrap();

    assert_eq!(fx.restorer().try_restore().await.unwrap_err(), RestoreSkipped::NoGrant);
    assert_eq!(fx.resolver.starts(), 0);
}

#[tokio::test]
async fn contained_file_is_restored_with_section() {
    let fx = Fixture::new();
    fx.grant();
    let path = fx.write("ws/posts/a.md", "hello");
    fx.store.set_last_open_path(&path).unwrap();

    let restored = fx.restorer().restore_last_session().await.expect("should restore");

    assert_eq!(restored.item.path(), std::fs::canonicalize(&path).unwrap());
    assert_eq!(restored.item.format(), ContentFormat::SingleFile);
    assert_eq!(restored.item.section(), Some("posts"));
    assert_eq!(fx.resolver.starts(), 1);
    assert_eq!(fx.resolver.stops(), 0, "scope stays held while the item is open");
}

#[tokio::test]
async fn bundle_directory_is_restored_as_bundle() {
    let fx = Fixture::new();
    fx.grant();
    fx.write("ws/posts/trip/index.md", "body");
    fx.store.set_last_open_path(&fx.root().join("posts/trip")).unwrap();

    let restored = fx.restorer().try_restore().await.unwrap();
    assert_eq!(restored.item.format(), ContentFormat::BundleWithIndex);
}

#[tokio::test]
async fn directory_without_index_is_not_a_document() {
    let fx = Fixture::new();
    fx.grant();
    std::fs::create_dir_all(fx.root().join("posts/empty")).unwrap();
    fx.store.set_last_open_path(&fx.root().join("posts/empty")).unwrap();

    assert!(matches!(
        fx.restorer().try_restore().await,
        Err(RestoreSkipped::NotADocument { .. })
    ));
    assert_eq!(fx.resolver.stops(), fx.resolver.starts());
}

#[tokio::test]
async fn path_outside_root_is_rejected_and_scope_released() {
    let fx = Fixture::new();
    fx.grant();
    let outside = fx.write("elsewhere/secret.md", "nope");
    fx.store.set_last_open_path(&outside).unwrap();

    assert!(matches!(
        fx.restorer().try_restore().await,
        Err(RestoreSkipped::NotContained { .. })
    ));
    assert_eq!(fx.resolver.starts(), 1);
    assert_eq!(fx.resolver.stops(), 1);
}

#[tokio::test]
async fn sibling_with_shared_prefix_is_outside() {
    let fx = Fixture::new();
    fx.grant();
    let sibling = fx.write("ws-archive/a.md", "old");
    fx.store.set_last_open_path(&sibling).unwrap();

    assert!(matches!(
        fx.restorer().try_restore().await,
        Err(RestoreSkipped::NotContained { .. })
    ));
}

#[tokio::test]
async fn dot_dot_escape_is_rejected() {
    let fx = Fixture::new();
    fx.grant();
    fx.write("elsewhere/secret.md", "nope");
    fx.store.set_last_open_path(&fx.root().join("posts/../../elsewhere/secret.md")).unwrap();

    assert!(matches!(
        fx.restorer().try_restore().await,
        Err(RestoreSkipped::NotContained { .. })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_escape_is_rejected() {
    use std::os::unix::fs::symlink;

    let fx = Fixture::new();
    fx.grant();
    let outside = fx.write("elsewhere/secret.md", "nope");
    let link = fx.root().join("posts/escape.md");
    symlink(&outside, &link).unwrap();
    fx.store.set_last_open_path(&link).unwrap();

    assert!(matches!(
        fx.restorer().try_restore().await,
        Err(RestoreSkipped::NotContained { .. })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn dangling_symlink_out_of_root_restores_nothing() {
    use std::os::unix::fs::symlink;

    let fx = Fixture::new();
    fx.grant();
    let link = fx.root().join("posts/escape.md");
    symlink(fx.dir.path().join("elsewhere/never-created.md"), &link).unwrap();
    fx.store.set_last_open_path(&link).unwrap();

    assert!(matches!(fx.restorer().try_restore().await, Err(RestoreSkipped::Missing { .. })));
    assert_eq!(fx.resolver.stops(), fx.resolver.starts());
}

#[cfg(unix)]
#[tokio::test]
async fn dot_dot_through_symlink_follows_the_link_target() {
    use std::os::unix::fs::symlink;

    let fx = Fixture::new();
    fx.grant();
    // `ws/x.md` exists, but `ws/link/../x.md` names `outside/x.md`.
    fx.write("ws/x.md", "a different document");
    fx.write("outside/x.md", "recorded document");
    std::fs::create_dir_all(fx.dir.path().join("outside/inner")).unwrap();
    symlink(fx.dir.path().join("outside/inner"), fx.root().join("link")).unwrap();
    fx.store.set_last_open_path(&fx.root().join("link/../x.md")).unwrap();

    assert!(matches!(
        fx.restorer().try_restore().await,
        Err(RestoreSkipped::NotContained { .. })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn dot_dot_through_symlink_to_missing_file_restores_nothing() {
    use std::os::unix::fs::symlink;

    let fx = Fixture::new();
    fx.grant();
    fx.write("ws/x.md", "a different document");
    std::fs::create_dir_all(fx.dir.path().join("outside/inner")).unwrap();
    symlink(fx.dir.path().join("outside/inner"), fx.root().join("link")).unwrap();
    fx.store.set_last_open_path(&fx.root().join("link/../x.md")).unwrap();

    assert!(matches!(fx.restorer().try_restore().await, Err(RestoreSkipped::Missing { .. })));
}

#[tokio::test]
async fn missing_file_restores_nothing() {
    let fx = Fixture::new();
    fx.grant();
    fx.store.set_last_open_path(&fx.root().join("posts/deleted.md")).unwrap();

    assert!(matches!(fx.restorer().try_restore().await, Err(RestoreSkipped::Missing { .. })));
    assert_eq!(fx.resolver.stops(), 1);
}

#[tokio::test]
async fn stale_grant_is_cleared() {
    let fx = Fixture::new();
    fx.grant();
    let path = fx.write("ws/posts/a.md", "hello");
    fx.store.set_last_open_path(&path).unwrap();
    fx.resolver.revoked.store(true, Ordering::SeqCst);

    assert_eq!(fx.restorer().try_restore().await.unwrap_err(), RestoreSkipped::StaleGrant);
    assert_eq!(fx.store.workspace_grant().unwrap(), None);
    assert_eq!(fx.resolver.starts(), 0);
}

#[tokio::test]
async fn no_last_open_path_releases_scope() {
    let fx = Fixture::new();
    fx.grant();

    assert_eq!(fx.restorer().try_restore().await.unwrap_err(), RestoreSkipped::NoLastOpenPath);
    assert_eq!(fx.resolver.starts(), 1);
    assert_eq!(fx.resolver.stops(), 1);
}

#[tokio::test]
async fn scope_released_exactly_once_on_close() {
    let fx = Fixture::new();
    fx.grant();
    let path = fx.write("ws/posts/a.md", "hello");
    fx.store.set_last_open_path(&path).unwrap();
    let mut session = fx.session();

    let restored = fx.restorer().try_restore().await.unwrap();
    session.open_restored(restored).unwrap();
    assert_eq!(session.buffer(), "hello");
    assert!(session.holds_workspace_access());

    session.close_item();
    assert_eq!(fx.resolver.stops(), 1);
    drop(session);
    assert_eq!(fx.resolver.stops(), 1);
}

#[tokio::test]
async fn scope_released_when_item_is_replaced() {
    let fx = Fixture::new();
    fx.grant();
    let path = fx.write("ws/posts/a.md", "hello");
    let other = fx.write("ws/posts/b.md", "world");
    fx.store.set_last_open_path(&path).unwrap();
    let mut session = fx.session();

    session.open_restored(fx.restorer().try_restore().await.unwrap()).unwrap();
    session.open_item(ContentItem::single_file(&other)).unwrap();

    assert_eq!(fx.resolver.stops(), 1);
    assert!(!session.holds_workspace_access());
    assert_eq!(fx.store.last_open_path().unwrap(), Some(other));
}

#[tokio::test]
async fn failed_open_of_restored_item_releases_scope() {
    let fx = Fixture::new();
    fx.grant();
    let path = fx.write("ws/posts/a.md", "hello");
    fx.store.set_last_open_path(&path).unwrap();
    let mut session = fx.session();

    let restored = fx.restorer().try_restore().await.unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(session.open_restored(restored).is_err());
    assert_eq!(fx.resolver.stops(), 1);
    assert!(session.current_item().is_none());
}

#[tokio::test]
async fn background_restore_is_adopted_by_the_session() {
    let fx = Fixture::new();
    fx.grant();
    let path = fx.write("ws/posts/a.md", "hello");
    fx.store.set_last_open_path(&path).unwrap();
    let mut session = fx.session();
    let mut items = session.subscribe_current_item();

    let handle = spawn_restore(Arc::new(fx.restorer()));
    assert!(session.adopt_restore(handle).await.unwrap());

    let item = items.wait_for(Option::is_some).await.unwrap().clone();
    assert_eq!(item.map(|item| item.section().map(str::to_owned)), Some(Some("posts".to_string())));
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn background_restore_without_grant_opens_nothing() {
    let fx = Fixture::new();
    let mut session = fx.session();

    let handle = spawn_restore(Arc::new(fx.restorer()));
    assert!(!session.adopt_restore(handle).await.unwrap());
    assert!(session.current_item().is_none());
}
