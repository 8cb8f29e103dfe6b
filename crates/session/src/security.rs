// Owner-only permissions for Folio state files (config, session preferences).

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub fn ensure_owner_only_file(path: &Path) -> Result<()> {
    ensure_mode(path, 0o600)
}

pub fn ensure_owner_only_dir(path: &Path) -> Result<()> {
    ensure_mode(path, 0o700)
}

/// Replace `path` with `contents` through a sibling temp file.
///
/// Readers see either the old or the new file, never a torn write. The
/// result is owner-only on unix.
pub fn write_private_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
        ensure_owner_only_dir(parent)?;
    }

    let tmp_path = temp_sibling(path);
    {
        let mut file = open_private_truncate(&tmp_path)
            .with_context(|| format!("failed to open `{}`", tmp_path.display()))?;
        file.write_all(contents)
            .with_context(|| format!("failed to write `{}`", tmp_path.display()))?;
        file.sync_all().with_context(|| format!("failed to sync `{}`", tmp_path.display()))?;
    }
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error).with_context(|| {
            format!("failed to move `{}` into place at `{}`", tmp_path.display(), path.display())
        });
    }
    ensure_owner_only_file(path)
}

pub fn open_private_truncate(path: &Path) -> std::io::Result<std::fs::File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;

        OpenOptions::new().create(true).write(true).truncate(true).mode(0o600).open(path)
    }
    #[cfg(not(unix))]
    {
        OpenOptions::new().create(true).write(true).truncate(true).open(path)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}

fn ensure_mode(path: &Path, wanted: u32) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(path)
            .with_context(|| format!("failed to read metadata for `{}`", path.display()))?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode != wanted {
            fs::set_permissions(path, fs::Permissions::from_mode(wanted))
                .with_context(|| format!("failed to set owner-only mode on `{}`", path.display()))?;
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (path, wanted);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents_and_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("session.json");

        write_private_atomic(&path, b"first").unwrap();
        write_private_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temp file should be renamed away: {leftovers:?}");
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_private_atomic(&path, b"x = 1").unwrap();

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn ensure_mode_ignores_missing_paths() {
        let dir = TempDir::new().unwrap();
        ensure_owner_only_file(&dir.path().join("missing")).unwrap();
    }
}
