//! Hosting platform services
//!
//! Everything handin needs from the hosting platform over HTTP: raw file
//! content, the identity behind a token, and the platform's own health.

mod github;

pub use github::GitHubService;

use crate::error::Result;
use async_trait::async_trait;

/// Platform operations used by the push pipeline
///
/// Implemented by [`GitHubService`]; tests substitute scripted doubles.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// Raw contents of `path` on `org/repo@branch`, or `None` if absent
    async fn fetch_file(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<Option<String>>;

    /// Canonical login for a username/token pair
    async fn current_user(&self, login: &str, token: &str) -> Result<String>;

    /// Fail with a connection error if the platform reports degraded components
    async fn check_status(&self) -> Result<()>;
}
