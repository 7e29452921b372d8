//! Slug parsing and resolution
//!
//! A slug is `org/repo/branch/problem`, where both `branch` and `problem` may
//! contain slashes. The split between them is only known once the actual
//! branches of `org/repo` have been listed.

mod branches;
mod local;
mod mirror;

pub use branches::{parse_heads, BranchLister, MirrorBranches, RemoteBranches};
pub use local::{local_slugs, rank_similar};
pub use mirror::Mirror;

use crate::error::{Error, Result};
use crate::git::Git;
use crate::settings::Settings;
use crate::types::Slug;
use std::sync::Arc;

/// A slug split into case-folded owner parts and the unresolved remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugParts {
    /// Lowercased organization
    pub org: String,
    /// Lowercased repository
    pub repo: String,
    /// Everything after `org/repo/`
    pub remainder: String,
}

impl SlugParts {
    /// The slug with org and repo case-folded
    pub fn normalized(&self) -> String {
        format!("{}/{}/{}", self.org, self.repo, self.remainder)
    }
}

/// Check the shape of `raw` and split off org and repo
pub fn split(raw: &str) -> Result<SlugParts> {
    let stripped = raw.trim_matches('/');
    match (raw.starts_with('/'), raw.ends_with('/')) {
        (true, true) => {
            return Err(Error::InvalidSlug(format!(
                "Invalid slug. Did you mean {stripped}, without the leading and trailing slashes?"
            )));
        }
        (true, false) => {
            return Err(Error::InvalidSlug(format!(
                "Invalid slug. Did you mean {stripped}, without the leading slash?"
            )));
        }
        (false, true) => {
            return Err(Error::InvalidSlug(format!(
                "Invalid slug. Did you mean {stripped}, without the trailing slash?"
            )));
        }
        (false, false) => {}
    }

    let mut parts = raw.splitn(3, '/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(org), Some(repo), Some(remainder)) => Ok(SlugParts {
            org: org.to_lowercase(),
            repo: repo.to_lowercase(),
            remainder: remainder.to_string(),
        }),
        _ => Err(Error::InvalidSlug(format!("Invalid slug: {raw}"))),
    }
}

/// First branch, in listed order, that names a prefix of `remainder`.
///
/// A branch matches when it equals the remainder or is followed by `/` in it.
/// With both `foo` and `foo/x` present the outcome depends on listing order.
pub fn match_branch<'a>(remainder: &str, branches: &'a [String]) -> Option<&'a str> {
    branches
        .iter()
        .map(String::as_str)
        .find(|branch| match remainder.strip_prefix(branch) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        })
}

/// Resolves slugs against real branch listings
#[derive(Clone)]
pub struct SlugResolver {
    remote: Arc<dyn BranchLister>,
    mirror: Arc<dyn BranchLister>,
}

impl SlugResolver {
    /// Resolver using `remote` online and `mirror` offline
    pub fn new(remote: Arc<dyn BranchLister>, mirror: Arc<dyn BranchLister>) -> Self {
        Self { remote, mirror }
    }

    /// Resolver backed by git, per `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        let git = Git::new(settings.git_timeout);
        Self::new(
            Arc::new(RemoteBranches::new(
                git.clone().with_timeout(settings.branch_timeout),
                settings.host.clone(),
            )),
            Arc::new(MirrorBranches::new(git, settings.mirror_dir.clone())),
        )
    }

    /// Resolve `raw` into a [`Slug`].
    ///
    /// Failing to reach the remote in time is [`Error::ConnectionFailure`];
    /// any other listing failure counts as "no branches".
    pub async fn resolve(&self, raw: &str, offline: bool) -> Result<Slug> {
        let parts = split(raw)?;
        let lister = if offline { &self.mirror } else { &self.remote };

        let branches = match lister.list_branches(&parts.org, &parts.repo).await {
            Ok(branches) => branches,
            Err(Error::Timeout(_)) if !offline => {
                return Err(Error::ConnectionFailure(
                    "Could not connect to GitHub, it seems you are offline.".to_string(),
                ));
            }
            Err(e @ Error::Dependency(_)) => return Err(e),
            Err(e) => {
                tracing::debug!(error = %e, org = %parts.org, repo = %parts.repo, "could not list branches");
                Vec::new()
            }
        };

        let branch = match_branch(&parts.remainder, &branches)
            .ok_or_else(|| Error::InvalidSlug(format!("Invalid slug: {}", parts.normalized())))?;
        let problem = parts
            .remainder
            .get(branch.len() + 1..)
            .unwrap_or_default()
            .to_string();

        tracing::debug!(branch, problem = %problem, "resolved slug");

        Ok(Slug {
            raw: parts.normalized(),
            branch: branch.to_string(),
            org: parts.org,
            repo: parts.repo,
            problem,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(Vec<String>);

    #[async_trait]
    impl BranchLister for Fixed {
        async fn list_branches(&self, _org: &str, _repo: &str) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct TimesOut;

    #[async_trait]
    impl BranchLister for TimesOut {
        async fn list_branches(&self, _org: &str, _repo: &str) -> Result<Vec<String>> {
            Err(Error::Timeout("git ls-remote".to_string()))
        }
    }

    fn resolver(branches: &[&str]) -> SlugResolver {
        let lister = Arc::new(Fixed(branches.iter().map(ToString::to_string).collect()));
        SlugResolver::new(lister.clone(), lister)
    }

    #[test]
    fn test_split_rejects_separators_at_ends() {
        for raw in ["/cs50/probs/foo", "cs50/probs/foo/", "/cs50/probs/foo/", "/"] {
            assert!(
                matches!(split(raw), Err(Error::InvalidSlug(_))),
                "{raw} should be invalid"
            );
        }
    }

    #[test]
    fn test_split_messages_name_the_fix() {
        let msg = split("/cs50/x/y/").unwrap_err().to_string();
        assert!(msg.contains("cs50/x/y, without the leading and trailing slashes"));
        let msg = split("cs50/x/y/").unwrap_err().to_string();
        assert!(msg.contains("without the trailing slash"));
    }

    #[test]
    fn test_split_requires_three_segments() {
        assert!(matches!(split("cs50/probs"), Err(Error::InvalidSlug(_))));
        assert!(matches!(split("cs50"), Err(Error::InvalidSlug(_))));
    }

    #[test]
    fn test_split_folds_only_org_and_repo() {
        let parts = split("CS50/Probs/Main/Hello").unwrap();
        assert_eq!(parts.org, "cs50");
        assert_eq!(parts.repo, "probs");
        assert_eq!(parts.remainder, "Main/Hello");
    }

    #[test]
    fn test_match_branch_needs_separator() {
        let branches = vec!["fo".to_string(), "foo".to_string()];
        assert_eq!(match_branch("foo/bar", &branches), Some("foo"));
        assert_eq!(match_branch("foobar", &branches), None);
        assert_eq!(match_branch("foo", &branches), Some("foo"));
    }

    #[tokio::test]
    async fn test_first_listed_prefix_wins() {
        let slug = resolver(&["foo", "foo/x"])
            .resolve("cs50/probs/foo/bar", false)
            .await
            .unwrap();
        assert_eq!(slug.branch, "foo");
        assert_eq!(slug.problem, "bar");
        assert_eq!(slug.org, "cs50");
        assert_eq!(slug.repo, "probs");
    }

    #[tokio::test]
    async fn test_branch_with_slashes() {
        let slug = resolver(&["main", "2024/x"])
            .resolve("CS50/Problems/2024/x/hello", false)
            .await
            .unwrap();
        assert_eq!(slug.branch, "2024/x");
        assert_eq!(slug.problem, "hello");
        assert_eq!(slug.raw, "cs50/problems/2024/x/hello");
    }

    #[tokio::test]
    async fn test_no_matching_branch() {
        let err = resolver(&["main"])
            .resolve("cs50/probs/dev/hello", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSlug(_)));
    }

    #[tokio::test]
    async fn test_timeout_online_is_connection_failure() {
        let resolver = SlugResolver::new(Arc::new(TimesOut), Arc::new(Fixed(vec![])));
        let err = resolver
            .resolve("cs50/probs/main/hello", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionFailure(_)));
    }

    #[tokio::test]
    async fn test_timeout_offline_is_invalid_slug() {
        let resolver = SlugResolver::new(Arc::new(Fixed(vec![])), Arc::new(TimesOut));
        let err = resolver
            .resolve("cs50/probs/main/hello", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSlug(_)));
    }

    #[tokio::test]
    async fn test_offline_uses_mirror() {
        let resolver = SlugResolver::new(
            Arc::new(Fixed(vec![])),
            Arc::new(Fixed(vec!["main".to_string()])),
        );
        let slug = resolver.resolve("cs50/probs/main/hello", true).await.unwrap();
        assert_eq!(slug.branch, "main");
    }
}
