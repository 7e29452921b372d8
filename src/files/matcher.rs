//! Glob expansion and directory walking relative to a root

use crate::error::{Error, Result};
use ::glob::{MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Drop `.` components (`./foo//bar/` becomes `foo/bar`)
pub fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// `/`-joined form of a relative path, or `None` if any part is not UTF-8
pub fn to_utf8(path: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = path.components().map(|c| c.as_os_str().to_str()).collect();
    parts.map(|p| p.join("/"))
}

/// `/`-joined form of a relative path, replacing invalid UTF-8
pub fn display(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

fn is_hidden(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if is_hidden_name(name)))
}

fn escapes_root(path: &Path) -> bool {
    path.components()
        .any(|c| !matches!(c, Component::Normal(_)))
}

fn ensure_within(count: usize, limit: usize, root: &Path) -> Result<()> {
    if count > limit {
        return Err(Error::TooManyFiles {
            limit,
            dir: root.to_path_buf(),
        });
    }
    Ok(())
}

/// Every non-hidden file under `root`
pub fn walk_all(root: &Path, limit: usize) -> Result<BTreeSet<PathBuf>> {
    let mut files = BTreeSet::new();
    walk(root, Path::new(""), &mut files, limit)?;
    Ok(files)
}

fn walk(root: &Path, rel: &Path, out: &mut BTreeSet<PathBuf>, limit: usize) -> Result<()> {
    let entries = match fs::read_dir(root.join(rel)) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %rel.display(), error = %e, "skipping unreadable directory");
            return Ok(());
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        if is_hidden_name(&name) {
            continue;
        }
        let child = rel.join(&name);
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            walk(root, &child, out, limit)?;
        } else if file_type.is_symlink() && entry.path().is_dir() {
            // not followed: a link back up the tree would never terminate
            tracing::debug!(link = %child.display(), "skipping directory symlink");
        } else {
            out.insert(child);
            ensure_within(out.len(), limit, root)?;
        }
    }
    Ok(())
}

/// Expand `pattern` against `root` into relative file paths.
///
/// A pattern without `/` that starts with `*` matches at any depth. Matched
/// directories contribute every non-hidden file beneath them. Hidden entries
/// are only matched by patterns that spell out a leading dot.
pub fn expand(root: &Path, pattern: &str, limit: usize) -> Result<BTreeSet<PathBuf>> {
    let pattern = if !pattern.contains('/') && pattern.starts_with('*') {
        format!("**/{pattern}")
    } else {
        pattern.to_string()
    };
    let allow_hidden = pattern
        .split('/')
        .any(|c| c.starts_with('.') && c != "." && c != "..");

    let relative: Vec<&str> = pattern
        .trim_start_matches('/')
        .split('/')
        .filter(|c| *c != ".")
        .collect();
    if relative.iter().all(|c| c.is_empty()) {
        return walk_all(root, limit);
    }
    let base = Pattern::escape(&root.to_string_lossy());
    let mut globs = vec![format!("{base}/{}", relative.join("/"))];
    // a trailing `**` only yields directories; files at that level need `*`
    if relative.last() == Some(&"**") {
        globs.push(format!("{base}/{}/*", relative.join("/")));
    }

    let mut files = BTreeSet::new();
    for full in globs {
        let paths = ::glob::glob_with(&full, OPTIONS)
            .map_err(|e| Error::InvalidConfig(format!("invalid pattern {pattern:?}: {e}")))?;

        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable path");
                    continue;
                }
            };
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel = normalize(rel);
            if rel.as_os_str().is_empty()
                || escapes_root(&rel)
                || (!allow_hidden && is_hidden(&rel))
            {
                continue;
            }

            if path.is_dir() {
                walk(root, &rel, &mut files, limit)?;
            } else {
                files.insert(rel);
            }
            ensure_within(files.len(), limit, root)?;
        }
    }

    Ok(files)
}
