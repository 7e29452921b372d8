//! Phase 3: prepare
//!
//! Stage the selected files on top of a shallow clone of the operator's
//! submission repository, inside a throwaway working area.

use crate::error::{Error, Result};
use crate::git::{Git, WorkingArea};
use crate::settings::Settings;
use crate::types::User;
use std::collections::BTreeSet;
use std::path::Path;

// keeps `git add` well under command line length limits
const ADD_BATCH: usize = 500;

/// A staged submission, ready to commit
#[derive(Debug)]
pub struct Prepared {
    area: WorkingArea,
    git: Git,
}

impl Prepared {
    /// The working area holding the staged files
    pub fn path(&self) -> &Path {
        self.area.path()
    }

    /// git scoped to the working area, without remote access
    pub const fn git(&self) -> &Git {
        &self.git
    }
}

/// Remediation shown when the submission repository cannot be cloned
pub fn not_enabled_message(tool: &str, org: &str, settings: &Settings) -> String {
    let mut msg = format!("Looks like {tool} isn't enabled for your account yet. ");
    if org == settings.remote.org {
        msg.push_str(&format!(
            "Go to {} and log in to enable it.",
            settings.enable_url
        ));
    } else {
        msg.push_str("Please contact your instructor.");
    }
    msg
}

/// Stage `included` (relative to `root`) for `user` on `branch`
pub async fn prepare(
    settings: &Settings,
    git: &Git,
    tool: &str,
    branch: &str,
    user: &User,
    root: &Path,
    included: &BTreeSet<String>,
) -> Result<Prepared> {
    let area = WorkingArea::new_in(&settings.staging_dir)?;
    area.populate(root, included)?;

    let git = git.clone().in_dir(area.path());

    user.git(git.clone())
        .run(&["clone", "--bare", &user.remote, ".git", "--depth", "1"])
        .await
        .map_err(|e| match e {
            Error::Timeout(_) | Error::Dependency(_) | Error::Interrupted => e,
            other => {
                tracing::debug!(error = %other, "clone failed");
                Error::NotEnabled(not_enabled_message(tool, &user.org, settings))
            }
        })?;

    let worktree = area.path().to_string_lossy().into_owned();
    git.run(&["config", "--bool", "core.bare", "false"]).await?;
    git.run(&["config", "--path", "core.worktree", &worktree])
        .await?;

    // the branch may not exist yet, or may have no .gitattributes
    let checkout = git
        .output(&["checkout", "--force", branch, ".gitattributes"], None)
        .await?;
    if !checkout.success {
        tracing::debug!(stderr = %checkout.stderr.trim(), "no .gitattributes to restore");
    }

    git.run(&["config", "user.email", &user.email]).await?;
    git.run(&["config", "user.name", &user.name]).await?;
    git.run(&["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")])
        .await?;

    let files: Vec<&str> = included.iter().map(String::as_str).collect();
    for batch in files.chunks(ADD_BATCH) {
        let mut args = vec!["add", "-f", "--"];
        args.extend_from_slice(batch);
        git.run(&args).await?;
    }

    let candidates: Vec<&str> = files
        .into_iter()
        .filter(|f| *f != ".gitattributes")
        .collect();
    lfs_add(settings, &git, area.path(), &candidates).await?;

    Ok(Prepared { area, git })
}

/// Move files at or above the LFS threshold into git-lfs
async fn lfs_add(settings: &Settings, git: &Git, area: &Path, files: &[&str]) -> Result<()> {
    let mut large = Vec::new();
    let mut huge = Vec::new();
    for file in files {
        let size = std::fs::metadata(area.join(file))?.len();
        if size >= settings.max_file_size {
            huge.push((*file).to_string());
        } else if size >= settings.lfs_threshold {
            large.push(*file);
        }
    }

    if !huge.is_empty() {
        return Err(Error::TooLarge(huge));
    }
    if large.is_empty() {
        return Ok(());
    }

    if which::which("git-lfs").is_err() {
        return Err(Error::Dependency(format!(
            "These files are too large to be submitted:\n{}\n\
             Install git-lfs (or remove these files from your directory) and then re-run!",
            large.join("\n")
        )));
    }

    tracing::info!(files = large.len(), "adding large files through git-lfs");
    git.run(&["lfs", "install", "--local"]).await?;
    // lfs' pre-push hook reads credentials through the regular helper
    git.run(&["config", "credential.helper", "cache"]).await?;
    for file in large {
        git.run(&["rm", "--cached", "--", file]).await?;
        git.run(&["lfs", "track", file]).await?;
        git.run(&["add", "--", file]).await?;
    }
    git.run(&["add", "--force", ".gitattributes"]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_not_enabled_message_for_default_org() {
        let settings = Settings::default();
        let msg = not_enabled_message("submit50", "me50", &settings);
        assert_eq!(
            msg,
            "Looks like submit50 isn't enabled for your account yet. \
             Go to https://submit.cs50.io and log in to enable it."
        );
    }

    #[test]
    fn test_not_enabled_message_for_other_org() {
        let msg = not_enabled_message("submit50", "course42", &Settings::default());
        assert!(msg.ends_with("Please contact your instructor."));
    }

    #[tokio::test]
    async fn test_huge_files_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![0u8; 64]).unwrap();
        std::fs::write(dir.path().join("small.c"), "int main;").unwrap();
        let settings = Settings {
            lfs_threshold: 16,
            max_file_size: 32,
            ..Settings::default()
        };

        let git = Git::new(Duration::from_secs(5));
        let err = lfs_add(&settings, &git, dir.path(), &["big.bin", "small.c"])
            .await
            .unwrap_err();
        match err {
            Error::TooLarge(files) => assert_eq!(files, vec!["big.bin".to_string()]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_small_files_skip_lfs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.c"), "int main;").unwrap();
        let git = Git::new(Duration::from_secs(5)).in_dir(dir.path());
        lfs_add(&Settings::default(), &git, dir.path(), &["hello.c"])
            .await
            .unwrap();
    }
}
