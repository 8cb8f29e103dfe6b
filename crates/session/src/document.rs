// The open-document state machine.
//
//   Empty --open_item--> Open(clean) --update_content--> Open(dirty)
//   Open(dirty) --save ok--> Open(clean)     Open(dirty) --save err--> Open(dirty)
//   Open(*) --close_item--> Empty
//
// All mutation goes through `&mut self`, so the owner's context is the only
// writer and saves cannot overlap. Observers subscribe to watch channels.

use std::path::PathBuf;
use std::sync::Arc;

use folio_common::frontmatter::{self, Frontmatter};
use folio_common::types::ContentItem;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::EditorSettings;
use crate::error::{RenameError, SessionError};
use crate::fs::FileSystem;
use crate::grant::ScopedAccess;
use crate::rename::RenamePolicy;
use crate::restore::RestoredSession;
use crate::store::SessionStore;

/// Result of a successful save.
#[derive(Debug)]
pub struct SaveReport {
    /// Item path after the save, including any rename.
    pub path: PathBuf,
    /// Previous path when the save renamed the item.
    pub renamed_from: Option<PathBuf>,
    /// Frontmatter parsed from the content just written.
    pub frontmatter: Option<Frontmatter>,
    /// Rename attempted after the save and failed. The save itself stands.
    pub rename_error: Option<RenameError>,
}

impl SaveReport {
    pub fn renamed(&self) -> bool {
        self.renamed_from.is_some()
    }
}

struct OpenDocument {
    item: ContentItem,
    buffer: String,
    /// Last content known to be on disk.
    saved: String,
    /// Workspace scope the item was restored under; released on close or replace.
    access: Option<ScopedAccess>,
}

impl OpenDocument {
    fn is_dirty(&self) -> bool {
        self.buffer != self.saved
    }
}

pub struct DocumentSession {
    fs: Arc<dyn FileSystem>,
    store: SessionStore,
    settings: Arc<dyn EditorSettings>,
    rename: RenamePolicy,
    current: Option<OpenDocument>,
    item_tx: watch::Sender<Option<ContentItem>>,
    dirty_tx: watch::Sender<bool>,
}

impl DocumentSession {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        store: SessionStore,
        settings: Arc<dyn EditorSettings>,
    ) -> Self {
        let (item_tx, _) = watch::channel(None);
        let (dirty_tx, _) = watch::channel(false);
        Self { rename: RenamePolicy::new(fs.clone()), fs, store, settings, current: None, item_tx, dirty_tx }
    }

    pub fn current_item(&self) -> Option<&ContentItem> {
        self.current.as_ref().map(|doc| &doc.item)
    }

    /// Current buffer; empty when nothing is open.
    pub fn buffer(&self) -> &str {
        self.current.as_ref().map(|doc| doc.buffer.as_str()).unwrap_or_default()
    }

    pub fn is_dirty(&self) -> bool {
        self.current.as_ref().is_some_and(OpenDocument::is_dirty)
    }

    /// Whether the open item holds a workspace access scope.
    pub fn holds_workspace_access(&self) -> bool {
        self.current.as_ref().is_some_and(|doc| doc.access.is_some())
    }

    pub fn subscribe_current_item(&self) -> watch::Receiver<Option<ContentItem>> {
        self.item_tx.subscribe()
    }

    pub fn subscribe_dirty(&self) -> watch::Receiver<bool> {
        self.dirty_tx.subscribe()
    }

    /// Open `item`, replacing whatever is open. Unsaved changes in the
    /// replaced document are discarded; callers prompt before this.
    pub fn open_item(&mut self, item: ContentItem) -> Result<(), SessionError> {
        self.open_with_access(item, None)
    }

    /// Open an item produced by the restorer, keeping its access scope alive
    /// until the item is closed or replaced.
    pub fn open_restored(&mut self, restored: RestoredSession) -> Result<(), SessionError> {
        self.open_with_access(restored.item, Some(restored.access))
    }

    /// Await a background restore and apply its result here. Returns whether
    /// an item was opened.
    pub async fn adopt_restore(
        &mut self,
        handle: JoinHandle<Option<RestoredSession>>,
    ) -> Result<bool, SessionError> {
        match handle.await {
            Ok(Some(restored)) => {
                self.open_restored(restored)?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(error) => {
                warn!(%error, "session restore task failed");
                Ok(false)
            }
        }
    }

    fn open_with_access(
        &mut self,
        item: ContentItem,
        access: Option<ScopedAccess>,
    ) -> Result<(), SessionError> {
        let document_path = item.document_path();
        // On failure `access` drops here and is released; the open document stays.
        let content = self
            .fs
            .read_to_string(&document_path)
            .map_err(|source| SessionError::OpenFailed { path: document_path.clone(), source })?;

        let previous = self.current.replace(OpenDocument {
            item,
            saved: content.clone(),
            buffer: content,
            access,
        });
        if let Some(previous) = previous {
            debug!(path = %previous.item.path().display(), "replaced open document");
        }

        if let Some(doc) = self.current.as_ref() {
            info!(path = %doc.item.path().display(), "opened document");
            self.remember(doc.item.path().to_path_buf());
        }
        self.publish();
        Ok(())
    }

    pub fn update_content(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        let doc = self.current.as_mut().ok_or(SessionError::NoOpenItem)?;
        doc.buffer = text.into();
        self.publish();
        Ok(())
    }

    /// Write the buffer over the item's file, then rename per frontmatter
    /// when auto-rename is enabled.
    ///
    /// A write failure leaves the document dirty and returns `SaveFailed`.
    /// A rename failure after a good write is reported in the
    /// [`SaveReport`], not as an error.
    pub fn save(&mut self) -> Result<SaveReport, SessionError> {
        let auto_rename = self.settings.auto_rename_enabled();
        let doc = self.current.as_mut().ok_or(SessionError::NoOpenItem)?;

        let document_path = doc.item.document_path();
        if let Err(source) = self.fs.write(&document_path, &doc.buffer) {
            warn!(path = %document_path.display(), error = %source, "save failed");
            return Err(SessionError::SaveFailed { path: document_path, source });
        }
        doc.saved.clone_from(&doc.buffer);
        info!(path = %document_path.display(), bytes = doc.saved.len(), "saved document");

        let frontmatter = match frontmatter::try_parse(&doc.saved) {
            Ok(parsed) => parsed,
            Err(error) => {
                debug!(%error, "ignoring malformed frontmatter");
                None
            }
        };

        let mut report = SaveReport {
            path: doc.item.path().to_path_buf(),
            renamed_from: None,
            frontmatter,
            rename_error: None,
        };

        if auto_rename {
            let decision = self.rename.decide(&doc.item, report.frontmatter.as_ref());
            match self.rename.execute(&doc.item, &decision) {
                Ok(Some(moved)) => {
                    report.renamed_from = Some(doc.item.path().to_path_buf());
                    report.path = moved.path().to_path_buf();
                    doc.item = moved;
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(%error, "rename after save failed; keeping current name");
                    report.rename_error = Some(error);
                }
            }
        }

        if report.renamed() {
            self.remember(report.path.clone());
        }
        self.publish();
        Ok(report)
    }

    /// Close the open item, releasing its workspace scope. Returns the closed item.
    pub fn close_item(&mut self) -> Option<ContentItem> {
        let closed = self.current.take().map(|doc| {
            info!(path = %doc.item.path().display(), "closed document");
            doc.item
        });
        self.publish();
        closed
    }

    fn remember(&self, path: PathBuf) {
        if let Err(error) = self.store.set_last_open_path(&path) {
            warn!(%error, path = %path.display(), "failed to record last open document");
        }
    }

    fn publish(&self) {
        let item = self.current_item().cloned();
        self.item_tx.send_if_modified(|current| {
            if *current == item {
                return false;
            }
            *current = item;
            true
        });
        let dirty = self.is_dirty();
        self.dirty_tx.send_if_modified(|current| {
            if *current == dirty {
                return false;
            }
            *current = dirty;
            true
        });
    }
}
