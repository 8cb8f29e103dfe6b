// CLI subcommand dispatch and the state shared by commands.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Subcommand;
use folio_common::path::section_of;
use folio_common::types::{ContentItem, BUNDLE_INDEX_FILE};
use folio_session::config::GlobalConfig;
use folio_session::document::DocumentSession;
use folio_session::fs::LocalFileSystem;
use folio_session::grant::{AccessGrantResolver, PathGrantResolver};
use folio_session::paths::FolioPaths;
use folio_session::prefs::JsonFilePreferenceStore;
use folio_session::security::ensure_owner_only_dir;
use folio_session::store::SessionStore;
use tracing::warn;

use crate::output::OutputFormat;

pub mod meta;
pub mod open;
pub mod restore;
pub mod save;
pub mod slug;
pub mod workspace;

#[derive(Subcommand)]
pub enum Command {
    /// Choose the workspace folder and remember access to it
    Workspace(workspace::WorkspaceArgs),
    /// Open a document and record it as the last open one
    Open(open::OpenArgs),
    /// Save new content into a document, renaming it when enabled
    Save(save::SaveArgs),
    /// Reopen the last document inside the granted workspace
    Restore(restore::RestoreArgs),
    /// Print the slug for a title
    Slug(slug::SlugArgs),
    /// Show a document's frontmatter and canonical name
    Meta(meta::MetaArgs),
}

pub fn run(cmd: Command, state_dir: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    match cmd {
        Command::Slug(args) => slug::run(args, format),
        Command::Meta(args) => meta::run(args, format),
        Command::Workspace(args) => workspace::run(args, &Context::load(state_dir)?, format),
        Command::Open(args) => open::run(args, &Context::load(state_dir)?, format),
        Command::Save(args) => save::run(args, &Context::load(state_dir)?, format),
        Command::Restore(args) => restore::run(args, &Context::load(state_dir)?, format),
    }
}

/// Folio state loaded from the state directory.
pub struct Context {
    pub paths: FolioPaths,
    pub config: GlobalConfig,
    pub store: SessionStore,
}

impl Context {
    pub fn load(state_dir: Option<PathBuf>) -> Result<Self> {
        let paths = match state_dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("failed to create `{}`", dir.display()))?;
                ensure_owner_only_dir(&dir)?;
                FolioPaths::under(dir)
            }
            None => FolioPaths::resolve()?,
        };

        let config = GlobalConfig::load_or_default(&paths.config_path);

        let prefs = JsonFilePreferenceStore::open(&paths.session_path)
            .context("failed to load session state")?;
        Ok(Self { paths, config, store: SessionStore::new(Arc::new(prefs)) })
    }

    pub fn session(&self, auto_rename: bool) -> DocumentSession {
        DocumentSession::new(Arc::new(LocalFileSystem), self.store.clone(), Arc::new(auto_rename))
    }

    /// Root of the granted workspace, if the grant still resolves.
    pub fn workspace_root(&self) -> Option<PathBuf> {
        let grant = self.store.workspace_grant().ok().flatten()?;
        let resolver = PathGrantResolver::new();
        match block_on(resolver.resolve(&grant)) {
            Ok(Ok(resolved)) => Some(resolved.root),
            Ok(Err(error)) => {
                warn!(%error, "workspace grant does not resolve");
                None
            }
            Err(_) => None,
        }
    }
}

/// Content item at `path`: a bundle when it is a directory holding
/// `index.md`, otherwise a single file. The section is taken relative to
/// `root` when the item lies inside it.
pub fn item_at(path: &Path, root: Option<&Path>) -> Result<ContentItem> {
    let path = std::fs::canonicalize(path)
        .with_context(|| format!("failed to open `{}`", path.display()))?;

    let mut item = if path.is_dir() {
        anyhow::ensure!(
            path.join(BUNDLE_INDEX_FILE).is_file(),
            "`{}` is a folder without {BUNDLE_INDEX_FILE}",
            path.display()
        );
        ContentItem::bundle(&path)
    } else {
        ContentItem::single_file(&path)
    };
    if let Some(section) = root.and_then(|root| section_of(root, &path)) {
        item = item.with_section(section);
    }
    Ok(item)
}

/// Drive a future to completion on a fresh current-thread runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
