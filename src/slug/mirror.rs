//! Local mirrors of problem repositories

use crate::error::{Error, Result};
use crate::git::Git;
use crate::types::Slug;
use std::path::PathBuf;

/// Shallow local copies under `<mirror_dir>/<org>/<repo>`
#[derive(Debug, Clone)]
pub struct Mirror {
    git: Git,
    mirror_dir: PathBuf,
    host: String,
}

impl Mirror {
    /// Mirrors rooted at `mirror_dir`, fetched from `host`
    pub fn new(git: Git, mirror_dir: impl Into<PathBuf>, host: impl Into<String>) -> Self {
        Self {
            git,
            mirror_dir: mirror_dir.into(),
            host: host.into(),
        }
    }

    /// Where the mirror for `slug` lives
    pub fn path(&self, slug: &Slug) -> PathBuf {
        self.mirror_dir.join(&slug.org).join(&slug.repo)
    }

    /// Create or refresh the mirror of `slug`'s branch; returns the problem
    /// directory inside it.
    ///
    /// Offline, the mirror is only reset to what was last fetched.
    pub async fn sync(&self, slug: &Slug, offline: bool) -> Result<PathBuf> {
        let path = self.path(slug);
        let git = self.git.clone().in_dir(&path);

        if !path.exists() {
            std::fs::create_dir_all(&path)?;
            git.run(&["init"]).await?;
            let url = format!("https://{}/{}/{}", self.host, slug.org, slug.repo);
            git.run(&["remote", "add", "origin", &url]).await?;
        }

        if !offline {
            git.run(&["fetch", "origin", &slug.branch, "--depth", "1"])
                .await?;
        }

        let upstream = format!("origin/{}", slug.branch);
        git.run(&["checkout", "-f", "-B", &slug.branch, &upstream])
            .await?;
        git.run(&["reset", "--hard", "HEAD"]).await?;

        let problem = path.join(&slug.problem);
        if !problem.exists() {
            return Err(Error::InvalidSlug(format!(
                "{} does not exist at {}/{}",
                slug.problem, slug.org, slug.repo
            )));
        }
        Ok(problem)
    }
}
