// Global configuration at `~/.folio/config.toml`.
//
// [editor]
// auto_rename = false    # rename saved files to `{date}-{slug}{ext}`
//
// [session]
// restore_last = true    # reopen the last document at startup

use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::security::write_private_atomic;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GlobalConfig {
    pub editor: EditorConfig,
    pub session: SessionConfig,
}

impl GlobalConfig {
    /// Load from `path` (normally [`crate::paths::FolioPaths::config_path`]).
    /// A missing file gives defaults; an unreadable or invalid one gives
    /// defaults with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(ConfigError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(error) => {
                warn!(%error, path = %path.display(), "using default config");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        write_private_atomic(path, contents.as_bytes())
            .map_err(|error| ConfigError::Io(std::io::Error::other(format!("{error:#}"))))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Rename a document to `{date}-{slug}{ext}` after each save, using its
    /// frontmatter. Off by default: the file's name never changes.
    pub auto_rename: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Reopen the last document at startup when it is inside the granted workspace.
    pub restore_last: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { restore_last: true }
    }
}

/// Configuration read by [`crate::document::DocumentSession`] on every save.
pub trait EditorSettings: Send + Sync {
    fn auto_rename_enabled(&self) -> bool;
}

impl EditorSettings for bool {
    fn auto_rename_enabled(&self) -> bool {
        *self
    }
}

impl EditorSettings for GlobalConfig {
    fn auto_rename_enabled(&self) -> bool {
        self.editor.auto_rename
    }
}

/// Live configuration that can be edited while a document is open.
impl EditorSettings for RwLock<GlobalConfig> {
    fn auto_rename_enabled(&self) -> bool {
        match self.read() {
            Ok(config) => config.editor.auto_rename,
            Err(poisoned) => poisoned.into_inner().editor.auto_rename,
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
