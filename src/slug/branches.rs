//! Branch listing for problem repositories

use crate::error::Result;
use crate::git::Git;
use async_trait::async_trait;
use std::path::PathBuf;

/// Lists the branches of `org/repo`, in the order the source reports them
#[async_trait]
pub trait BranchLister: Send + Sync {
    /// Branch names without the `refs/heads/` prefix
    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<String>>;
}

/// Parse `<sha> refs/heads/<name>` lines from `ls-remote` or `show-ref`
pub fn parse_heads(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r).to_string())
        .collect()
}

/// Branches of the repository on the remote host (`git ls-remote`)
#[derive(Debug, Clone)]
pub struct RemoteBranches {
    git: Git,
    host: String,
}

impl RemoteBranches {
    /// Lister for `https://{host}/{org}/{repo}`
    pub fn new(git: Git, host: impl Into<String>) -> Self {
        Self {
            git,
            host: host.into(),
        }
    }
}

#[async_trait]
impl BranchLister for RemoteBranches {
    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<String>> {
        let url = format!("https://{}/{org}/{repo}", self.host);
        let out = self.git.run(&["ls-remote", "--heads", &url]).await?;
        Ok(parse_heads(&out))
    }
}

/// Branches of the local mirror (`git show-ref`)
#[derive(Debug, Clone)]
pub struct MirrorBranches {
    git: Git,
    mirror_dir: PathBuf,
}

impl MirrorBranches {
    /// Lister reading mirrors under `mirror_dir/{org}/{repo}`
    pub fn new(git: Git, mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            git,
            mirror_dir: mirror_dir.into(),
        }
    }
}

#[async_trait]
impl BranchLister for MirrorBranches {
    async fn list_branches(&self, org: &str, repo: &str) -> Result<Vec<String>> {
        let path = self.mirror_dir.join(org).join(repo);
        if !path.is_dir() {
            return Ok(Vec::new());
        }
        let out = self
            .git
            .clone()
            .in_dir(path)
            .run(&["show-ref", "--heads"])
            .await?;
        Ok(parse_heads(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_heads() {
        let out = "a1b2c3\trefs/heads/main\nd4e5f6\trefs/heads/2024/x\n\n";
        assert_eq!(parse_heads(out), vec!["main", "2024/x"]);
    }

    #[test]
    fn test_parse_show_ref_format() {
        let out = "a1b2c3 refs/heads/master\n";
        assert_eq!(parse_heads(out), vec!["master"]);
    }

    #[tokio::test]
    async fn test_missing_mirror_has_no_branches() {
        let dir = tempfile::tempdir().unwrap();
        let lister = MirrorBranches::new(Git::new(std::time::Duration::from_secs(5)), dir.path());
        assert!(lister.list_branches("cs50", "problems").await.unwrap().is_empty());
    }
}
