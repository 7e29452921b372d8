//! Operator authentication
//!
//! A local ssh key is tried first. When the remote refuses it, or it cannot be
//! unlocked, the operator's login and personal access token are exchanged
//! through git's credential cache instead.

pub mod credential;
pub mod machine;
pub mod prompt;
pub mod ssh;

pub use credential::{
    Credential, CredentialApproval, CredentialRequest, CredentialStore, GitCredentialCache,
};
pub use machine::{KeyLogin, MAX_PASSPHRASE_ATTEMPTS};
pub use prompt::{Prompter, TerminalPrompter};
pub use ssh::{AskPass, KeyExchange, SshKeyExchange};

use crate::error::{Error, Result};
use crate::git::Git;
use crate::platform::PlatformService;
use crate::settings::Settings;
use crate::types::{Protocol, User};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

/// Login override, checked before the credential cache
pub const USER_ENV: &str = "HANDIN_GH_USER";

/// Token override, checked before the credential cache
pub const TOKEN_ENV: &str = "HANDIN_GH_TOKEN";

/// How git commands reach an authenticated user's remote
#[derive(Debug, Clone)]
pub enum Access {
    /// ssh with the key that passed the handshake
    Key(Arc<AskPass>),
    /// https with credentials held by the cache daemon on `socket`
    CredentialCache {
        /// Socket of the cache daemon
        socket: PathBuf,
    },
}

impl Access {
    /// Extend `git` so it can talk to the remote
    #[must_use]
    pub fn apply(&self, git: Git, passphrase: Option<&str>) -> Git {
        match self {
            Self::Key(askpass) => {
                let git = git
                    .with_env("SSH_ASKPASS", askpass.script())
                    .with_env("SSH_ASKPASS_REQUIRE", "force");
                match passphrase {
                    Some(passphrase) => git.with_env(ssh::SECRET_ENV, passphrase),
                    None => git,
                }
            }
            Self::CredentialCache { socket } => git.with_hidden(credential::cache_options(socket)),
        }
    }
}

/// Authenticates operators and tears their sessions down
pub struct AuthSession {
    host: String,
    ssh_host: String,
    platform: Arc<dyn PlatformService>,
    keys: Arc<dyn KeyExchange>,
    store: Arc<dyn CredentialStore>,
    prompter: Arc<dyn Prompter>,
}

impl AuthSession {
    /// Session over explicit collaborators
    pub fn new(
        settings: &Settings,
        platform: Arc<dyn PlatformService>,
        keys: Arc<dyn KeyExchange>,
        store: Arc<dyn CredentialStore>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            host: settings.host.clone(),
            ssh_host: settings.ssh_host.clone(),
            platform,
            keys,
            store,
            prompter,
        }
    }

    /// Session using the system ssh and git's credential cache
    pub fn from_settings(
        settings: &Settings,
        platform: Arc<dyn PlatformService>,
        prompter: Arc<dyn Prompter>,
    ) -> Result<Self> {
        Ok(Self::new(
            settings,
            platform,
            Arc::new(SshKeyExchange::new(settings)?),
            Arc::new(credential_cache(settings)),
            prompter,
        ))
    }

    /// Authenticate with write access to `org/repo`.
    ///
    /// `repo` defaults to the operator's login.
    pub async fn authenticate(&self, org: &str, repo: Option<&str>) -> Result<User> {
        if let Some(login) = machine::authenticate(self.keys.as_ref(), self.prompter.as_ref()).await? {
            tracing::info!(user = %login.username, "authenticated with ssh key");
            let repo = repo.unwrap_or(&login.username);
            return Ok(User {
                remote: format!("ssh://git@{}:443/{org}/{repo}", self.ssh_host),
                org: org.to_string(),
                email: User::noreply_email(&login.username),
                passphrase: login.passphrase,
                protocol: Protocol::LocalKey,
                access: self.keys.access(),
                name: login.username,
            });
        }

        let user = self.exchange_credentials(org, repo).await?;
        tracing::info!(user = %user.name, "authenticated with token");
        Ok(user)
    }

    async fn exchange_credentials(&self, org: &str, repo: Option<&str>) -> Result<User> {
        let (mut username, mut token) = env_credentials();

        if username.is_none() || token.is_none() {
            let cached = match self.store.fill(&CredentialRequest::https(&self.host)).await {
                Ok(cached) => cached,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read credential cache");
                    None
                }
            };
            if let Some(cached) = cached {
                // a cached login that disagrees with the environment is stale
                let same_user = username.as_ref().is_none_or(|u| *u == cached.username);
                let same_token = token.as_ref().is_none_or(|t| *t == cached.password);
                if same_user && same_token {
                    username = Some(cached.username);
                    token = Some(cached.password);
                }
            }
        }

        if username.is_none() || token.is_none() {
            self.prompter.warn(
                "GitHub requires that you use SSH or a personal access token instead of \
                 a password to log in.",
            );
        }
        let username = match username {
            Some(username) => username,
            None => self.prompt_username().await?,
        };
        let token = match token {
            Some(token) => token,
            None => self
                .prompter
                .secret("Enter personal access token for GitHub")
                .await?,
        };

        let login = match self.platform.current_user(&username, &token).await {
            Ok(login) => login,
            Err(e) => {
                // never leave rejected credentials behind
                self.forget().await;
                return Err(e);
            }
        };

        self.store
            .approve(&CredentialApproval {
                request: CredentialRequest::https(&self.host).with_path(format!("{org}/{login}")),
                credential: Credential {
                    username: login.clone(),
                    password: token,
                },
            })
            .await?;

        let repo = repo.unwrap_or(&login);
        Ok(User {
            remote: format!("https://{login}@{}/{org}/{repo}", self.host),
            org: org.to_string(),
            email: User::noreply_email(&login),
            passphrase: None,
            protocol: Protocol::CredentialExchange,
            access: self.store.access(),
            name: login,
        })
    }

    async fn prompt_username(&self) -> Result<String> {
        loop {
            let input = self.prompter.username("Enter username for GitHub").await?;
            match prompt::validate_username(&input) {
                Ok(()) => return Ok(input.trim().to_string()),
                Err(reason) => self.prompter.warn(reason),
            }
        }
    }

    /// Pass `result` through, logging out first if it is an error.
    ///
    /// Teardown failures are logged; the original error is what comes back.
    pub async fn finish<T>(&self, user: &User, result: Result<T>) -> Result<T> {
        let e = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        if user.protocol == Protocol::CredentialExchange
            && !matches!(e, Error::RejectedPrompt(_) | Error::Interrupted)
        {
            self.prompter.warn(
                "You might be using your GitHub password to log in, but that's no longer \
                 possible. Use a personal access token instead.",
            );
        }
        self.forget().await;
        Err(e)
    }

    /// Clear cached credentials, logging rather than returning a failure
    pub async fn forget(&self) {
        if let Err(e) = self.store.logout().await {
            tracing::warn!(error = %e, "could not clear credential cache");
        }
    }

    /// Clear cached credentials
    pub async fn logout(&self) -> Result<()> {
        self.store.logout().await
    }
}

/// The credential cache described by `settings`
pub fn credential_cache(settings: &Settings) -> GitCredentialCache {
    GitCredentialCache::new(
        Git::new(settings.git_timeout),
        settings.credential_socket.clone(),
    )
}

fn env_credentials() -> (Option<String>, Option<String>) {
    let read = |key: &str| env::var(key).ok().filter(|v| !v.is_empty());
    (read(USER_ENV), read(TOKEN_ENV))
}
