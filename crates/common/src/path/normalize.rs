// Lexical path normalization and workspace containment checks.
//
// Nothing here touches the filesystem. Symlink resolution happens in the
// caller (canonicalize first, then fall back to these lexical rules).

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Normalize a path without consulting the filesystem.
///
/// Rules:
/// - Drop `.` components
/// - Resolve `..` against the preceding normal component
/// - `..` directly under the root stays at the root
/// - Leading `..` of a relative path is kept
/// - Apply Unicode NFC to UTF-8 components, so composed and decomposed
///   spellings of the same name compare equal
pub fn normalize_lexical(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last().copied() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    let mut normalized = PathBuf::new();
    for part in parts {
        match part {
            Component::Normal(name) => normalized.push(nfc(name.to_os_string())),
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// True when `candidate` lies strictly below `root`.
///
/// Both paths are normalized lexically first. Relative paths are never
/// considered contained, and neither is the root itself.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    if !root.is_absolute() || !candidate.is_absolute() {
        return false;
    }
    let root = normalize_lexical(root);
    let candidate = normalize_lexical(candidate);
    candidate != root && candidate.starts_with(&root)
}

/// First folder of `candidate` below `root`, when the item is nested in one.
///
/// `/ws/posts/a.md` under `/ws` is in section `posts`; `/ws/a.md` has none.
pub fn section_of(root: &Path, candidate: &Path) -> Option<String> {
    if !is_within(root, candidate) {
        return None;
    }
    let root = normalize_lexical(root);
    let candidate = normalize_lexical(candidate);
    let relative = candidate.strip_prefix(&root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    components.next()?;
    first.as_os_str().to_str().map(str::to_string)
}

fn nfc(name: OsString) -> OsString {
    match name.to_str() {
        Some(text) => OsString::from(text.nfc().collect::<String>()),
        None => name,
    }
}
