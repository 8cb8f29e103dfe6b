// Folio state directory: `~/.folio/` holding config and session preferences.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::security::ensure_owner_only_dir;

const STATE_DIR_NAME: &str = ".folio";
/// Global config: ~/.folio/config.toml
const CONFIG_FILE_NAME: &str = "config.toml";
/// Durable session slots: ~/.folio/session.json
const SESSION_FILE_NAME: &str = "session.json";

/// Resolved paths for Folio state files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolioPaths {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub session_path: PathBuf,
}

impl FolioPaths {
    /// Resolve paths under `~/.folio/`, creating the directory if needed.
    pub fn resolve() -> Result<Self> {
        let base_dir = state_dir().context("could not determine home directory")?;
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("failed to create `{}`", base_dir.display()))?;
        ensure_owner_only_dir(&base_dir)?;
        Ok(Self::under(base_dir))
    }

    /// Paths rooted at an explicit state directory (tests, `--state-dir`).
    pub fn under(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            config_path: base_dir.join(CONFIG_FILE_NAME),
            session_path: base_dir.join(SESSION_FILE_NAME),
            base_dir,
        }
    }
}

/// `~/.folio/`, when a home directory is known.
pub fn state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(STATE_DIR_NAME))
}
