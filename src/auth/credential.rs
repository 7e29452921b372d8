//! git credential helper protocol
//!
//! Requests and answers are `key=value` lines terminated by a blank line, as
//! described in `git-credential(1)`.

use crate::auth::Access;
use crate::error::{Error, Result};
use crate::git::{shell_quote, Git};
use async_trait::async_trait;
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// What a credential is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    /// Usually `https`
    pub protocol: String,
    /// Host name, without scheme
    pub host: String,
    /// Repository path, when the credential is scoped to one
    pub path: Option<String>,
}

impl CredentialRequest {
    /// Request for `https://{host}`
    pub fn https(host: impl Into<String>) -> Self {
        Self {
            protocol: "https".to_string(),
            host: host.into(),
            path: None,
        }
    }

    /// Scope the request to `path`
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    fn write_to(&self, out: &mut String) -> Result<()> {
        push_line(out, "protocol", &self.protocol)?;
        push_line(out, "host", &self.host)?;
        if let Some(path) = &self.path {
            push_line(out, "path", path)?;
        }
        Ok(())
    }

    /// Encode for `git credential fill`
    pub fn encode(&self) -> Result<String> {
        let mut out = String::new();
        self.write_to(&mut out)?;
        out.push('\n');
        Ok(out)
    }
}

fn push_line(out: &mut String, key: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\0']) {
        return Err(Error::Auth(format!("{key} may not contain newlines")));
    }
    let _ = writeln!(out, "{key}={value}");
    Ok(())
}

/// A username and secret
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Login
    pub username: String,
    /// Token or password
    pub password: String,
}

impl Credential {
    /// Pick `username` and `password` out of helper output.
    ///
    /// Returns `None` unless both are present and non-empty.
    pub fn parse(output: &str) -> Option<Self> {
        let mut username = None;
        let mut password = None;
        for line in output.lines() {
            let line = line.trim_end_matches('\r');
            if let Some(v) = line.strip_prefix("username=") {
                username = Some(v.to_string());
            } else if let Some(v) = line.strip_prefix("password=") {
                password = Some(v.to_string());
            }
        }
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Self { username, password })
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A verified credential to store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialApproval {
    /// Where the credential applies
    pub request: CredentialRequest,
    /// The credential itself
    pub credential: Credential,
}

impl CredentialApproval {
    /// Encode for `git credential approve`
    pub fn encode(&self) -> Result<String> {
        let mut out = String::new();
        self.request.write_to(&mut out)?;
        push_line(&mut out, "username", &self.credential.username)?;
        push_line(&mut out, "password", &self.credential.password)?;
        out.push('\n');
        Ok(out)
    }
}

/// Storage for credentials between runs
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored credential for `request`, if any
    async fn fill(&self, request: &CredentialRequest) -> Result<Option<Credential>>;

    /// Remember a verified credential
    async fn approve(&self, approval: &CredentialApproval) -> Result<()>;

    /// Forget every stored credential
    async fn logout(&self) -> Result<()>;

    /// git options that make later commands use this store
    fn access(&self) -> Access;
}

/// git options selecting the cache helper on `socket`, replacing any
/// helpers configured by the operator
pub fn cache_options(socket: &Path) -> Vec<String> {
    if cfg!(windows) {
        // git for windows has no unix socket support
        return vec!["-c".to_string(), "credential.helper=manager".to_string()];
    }
    vec![
        "-c".to_string(),
        "credential.helper=".to_string(),
        "-c".to_string(),
        format!(
            "credential.helper=cache --socket {}",
            shell_quote(&socket.to_string_lossy())
        ),
    ]
}

/// `git credential-cache` listening on a private socket
#[derive(Debug, Clone)]
pub struct GitCredentialCache {
    git: Git,
    socket: PathBuf,
}

impl GitCredentialCache {
    /// Cache on `socket`, driven through `git`
    pub fn new(git: Git, socket: impl Into<PathBuf>) -> Self {
        let socket = socket.into();
        Self {
            git: git.with_hidden(cache_options(&socket)),
            socket,
        }
    }

    fn ensure_socket_dir(&self) -> Result<()> {
        let Some(parent) = self.socket.parent() else {
            return Ok(());
        };
        if parent.exists() {
            return Ok(());
        }
        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(parent)?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for GitCredentialCache {
    async fn fill(&self, request: &CredentialRequest) -> Result<Option<Credential>> {
        self.ensure_socket_dir()?;
        let input = request.encode()?;
        let out = self
            .git
            .clone()
            .with_env("GIT_ASKPASS", "")
            .output(&["credential", "fill"], Some(input.as_str()))
            .await?;
        if !out.success {
            // nothing cached: git wanted to prompt and could not
            tracing::debug!(stderr = %out.stderr.trim(), "credential fill missed");
            return Ok(None);
        }
        Ok(Credential::parse(&out.stdout))
    }

    async fn approve(&self, approval: &CredentialApproval) -> Result<()> {
        self.ensure_socket_dir()?;
        self.git
            .run_with_input(
                &[
                    "-c",
                    "credentialcache.ignoresighup=true",
                    "credential",
                    "approve",
                ],
                &approval.encode()?,
            )
            .await?;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let socket = self.socket.to_string_lossy();
        self.git
            .run(&["credential-cache", "--socket", &*socket, "exit"])
            .await?;
        Ok(())
    }

    fn access(&self) -> Access {
        Access::CredentialCache {
            socket: self.socket.clone(),
        }
    }
}
