// Error types surfaced by the document session.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that leave the session state unchanged.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no document is open")]
    NoOpenItem,

    #[error("failed to open `{}`", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document stays open and dirty.
    #[error("failed to save `{}`", path.display())]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Rename failure after a successful save. The original path stays authoritative.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("failed to rename `{}` to `{}`", from.display(), to.display())]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}
