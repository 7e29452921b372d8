//! Core types for handin

use crate::auth::Access;
use crate::git::Git;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A resolved submission target: `org/repo/branch/problem`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slug {
    /// Organization owning the problem repository (lowercased)
    pub org: String,
    /// Problem repository name (lowercased)
    pub repo: String,
    /// Branch of the problem repository, as listed by the remote
    pub branch: String,
    /// Path of the problem inside the branch (may be empty)
    pub problem: String,
    /// The slug exactly as given, minus case folding of org and repo
    pub raw: String,
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Files chosen for submission
///
/// `included` and `excluded` are disjoint; entries are `/`-separated paths
/// relative to the submission root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSet {
    /// Files that will be submitted
    pub included: BTreeSet<String>,
    /// Files present but left out
    pub excluded: BTreeSet<String>,
}

/// How a user was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// ssh key accepted by the remote
    LocalKey,
    /// login and token via the credential helper
    CredentialExchange,
}

/// An authenticated operator
#[derive(Clone)]
pub struct User {
    /// Canonical login on the remote host
    pub name: String,
    /// Clone/push locator for the operator's submission repository
    pub remote: String,
    /// Organization that hosts submission repositories
    pub org: String,
    /// Commit email derived from `name`
    pub email: String,
    /// Passphrase unlocking the ssh key, when one was needed
    pub passphrase: Option<String>,
    /// Protocol that produced this user
    pub protocol: Protocol,
    /// git options needed to reach `remote`
    pub access: Access,
}

impl User {
    /// Commit email for a login
    pub fn noreply_email(name: &str) -> String {
        format!("{name}@users.noreply.github.com")
    }

    /// `git` extended with whatever it needs to reach `remote`
    #[must_use]
    pub fn git(&self, git: Git) -> Git {
        self.access.apply(git, self.passphrase.as_deref())
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("name", &self.name)
            .field("remote", &self.remote)
            .field("org", &self.org)
            .field("email", &self.email)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

/// Outcome of one local-key handshake attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Remote refused the key or the handshake broke down
    Fail,
    /// Remote accepted the key
    Success {
        /// Login reported by the remote greeting
        username: String,
    },
    /// Key is locked, or the passphrase given was wrong
    PassphrasePrompt,
    /// Remote host is not yet trusted
    NewHostKey,
}

/// Where submissions for a tool end up, read from the `remote` config key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Organization holding per-user submission repositories
    pub org: String,
    /// Message shown after a successful push; `{results}` is substituted
    pub message: String,
    /// Results URL template; `{username}` and `{slug}` are substituted
    pub results: String,
    /// Webhook notified by the remote after a push
    pub callback: String,
}

impl RemoteSettings {
    /// Results URL for a user and slug
    pub fn results_url(&self, username: &str, slug: &str) -> String {
        self.results
            .replace("{username}", username)
            .replace("{slug}", slug)
    }

    /// Post-push message for a user and slug
    pub fn render_message(&self, username: &str, slug: &str) -> String {
        self.message
            .replace("{results}", &self.results_url(username, slug))
            .replace("{username}", username)
            .replace("{slug}", slug)
    }
}

/// Result of a completed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    /// Login that made the submission
    pub username: String,
    /// Hash of the submission commit
    pub commit_hash: String,
    /// Message to show the operator
    pub message: String,
}
