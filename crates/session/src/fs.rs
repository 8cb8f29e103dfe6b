// Filesystem capability consumed by the session: read, write, rename,
// exists, delete. `LocalFileSystem` is the real implementation; tests wrap
// it to inject failures.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the whole file with `contents`.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Move `from` to `to`. Callers check `exists(to)` first; implementations
    /// are not required to refuse an existing target.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// True if anything (file, directory, or dangling symlink) is at `path`.
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Absolute path with symlinks resolved. Fails when `path` does not exist.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// `std::fs`-backed filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    /// Writes through a temp file in the same directory and renames it over
    /// the target, so a crash mid-write never leaves a truncated document.
    /// Symlinks are followed: the link stays, its target is replaced.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let target = match fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => fs::canonicalize(path)?,
            _ => path.to_path_buf(),
        };

        let tmp_path = temp_sibling(&target);
        let result = (|| {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
            if let Ok(meta) = fs::metadata(&target) {
                fs::set_permissions(&tmp_path, meta.permissions())?;
            }
            fs::rename(&tmp_path, &target)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".folio-save-{}", std::process::id()));
    path.with_file_name(name)
}
