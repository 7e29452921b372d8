//! Transient directory holding exactly the files being submitted

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scoped staging directory
///
/// Removed on drop, on success and failure alike.
#[derive(Debug)]
pub struct WorkingArea {
    dir: TempDir,
}

impl WorkingArea {
    /// Create an empty area under the system temp dir
    pub fn new() -> Result<Self> {
        Self::new_in(&std::env::temp_dir())
    }

    /// Create an empty area under `parent`
    pub fn new_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("handin-").tempdir_in(parent)?;
        tracing::debug!(path = %dir.path().display(), "created working area");
        Ok(Self { dir })
    }

    /// Root of the area
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy `files` (relative to `root`) into the area, keeping their layout
    pub fn populate<'a, I>(&self, root: &Path, files: I) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut copied = Vec::new();
        for file in files {
            let dest = self.dir.path().join(file);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(root.join(file), &dest)?;
            copied.push(dest);
        }
        Ok(copied)
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        normalize_permissions(self.dir.path());
    }
}

/// Make everything under `path` writable so removal succeeds where the OS
/// refuses to delete read-only files (git object files are read-only).
#[cfg(windows)]
fn normalize_permissions(path: &Path) {
    let Ok(entries) = fs::read_dir(path) else {
        return;
    };
    for entry in entries.flatten() {
        let entry_path = entry.path();
        if entry_path.is_dir() {
            normalize_permissions(&entry_path);
        }
        if let Ok(meta) = fs::metadata(&entry_path) {
            let mut perms = meta.permissions();
            if perms.readonly() {
                #[allow(clippy::permissions_set_readonly_false)]
                perms.set_readonly(false);
                let _ = fs::set_permissions(&entry_path, perms);
            }
        }
    }
}

#[cfg(not(windows))]
const fn normalize_permissions(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populate_preserves_layout() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("foo")).unwrap();
        fs::write(src.path().join("foo/bar.py"), "print()").unwrap();
        fs::write(src.path().join("baz.c"), "int main;").unwrap();

        let area = WorkingArea::new().unwrap();
        let files = ["foo/bar.py".to_string(), "baz.c".to_string()];
        area.populate(src.path(), &files).unwrap();

        assert_eq!(
            fs::read_to_string(area.path().join("foo/bar.py")).unwrap(),
            "print()"
        );
        assert!(area.path().join("baz.c").is_file());
    }

    #[test]
    fn test_area_removed_on_drop() {
        let parent = tempfile::tempdir().unwrap();
        let area = WorkingArea::new_in(parent.path()).unwrap();
        let path = area.path().to_path_buf();
        assert!(path.starts_with(parent.path()));
        fs::write(path.join("x"), "x").unwrap();
        drop(area);
        assert!(!path.exists());
        assert_eq!(fs::read_dir(parent.path()).unwrap().count(), 0);
    }
}
