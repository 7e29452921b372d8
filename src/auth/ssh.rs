//! ssh handshakes against the git host
//!
//! ssh is run non-interactively with `SSH_ASKPASS_REQUIRE=force`, so every
//! question it asks goes to a small script instead of the terminal. The script
//! records each prompt and answers passphrase prompts from the environment;
//! reading the record back tells us why a handshake stopped.

use crate::error::Result;
use crate::process;
use crate::settings::Settings;
use crate::types::AuthState;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

/// Passphrase handed to the askpass script
pub const SECRET_ENV: &str = "HANDIN_ASKPASS_SECRET";

/// File the askpass script appends prompts to
pub const LOG_ENV: &str = "HANDIN_ASKPASS_LOG";

// With a log configured only the first passphrase prompt is answered, so a
// wrong passphrase shows up as a second prompt instead of a retry loop.
const SCRIPT: &str = r#"#!/bin/sh
printf '%s\n' "$1" >> "${HANDIN_ASKPASS_LOG:-/dev/null}"
case "$1" in
*passphrase*)
    if [ -n "$HANDIN_ASKPASS_SECRET" ]; then
        if [ -n "$HANDIN_ASKPASS_LOG" ] && [ "$(grep -c passphrase "$HANDIN_ASKPASS_LOG")" -gt 1 ]; then
            exit 1
        fi
        printf '%s\n' "$HANDIN_ASKPASS_SECRET"
        exit 0
    fi
    ;;
esac
exit 1
"#;

/// A private askpass script, removed on drop
#[derive(Debug)]
pub struct AskPass {
    dir: TempDir,
    script: PathBuf,
}

impl AskPass {
    /// Write the script into a fresh private directory
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("handin-askpass-").tempdir()?;
        let script = dir.path().join("askpass.sh");
        std::fs::write(&script, SCRIPT)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o700))?;
        }
        Ok(Self { dir, script })
    }

    /// Path to pass as `SSH_ASKPASS`
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Empty prompt log for one handshake
    fn fresh_log(&self) -> Result<PathBuf> {
        let log = self.dir.path().join("prompts.log");
        std::fs::write(&log, "")?;
        Ok(log)
    }
}

/// Work out how a handshake ended from ssh's output and the prompts it asked
pub fn classify(output: &str, prompts: &str, sent_passphrase: bool) -> AuthState {
    let greeting = Regex::new(r"Hi (.+)! You've successfully authenticated").ok();
    if let Some(caps) = greeting.as_ref().and_then(|re| re.captures(output)) {
        return AuthState::Success {
            username: caps[1].to_string(),
        };
    }

    if prompts.contains("continue connecting") || output.contains("Host key verification failed")
    {
        return AuthState::NewHostKey;
    }

    let asked = prompts.lines().filter(|l| l.contains("passphrase")).count();
    if (!sent_passphrase && asked > 0) || (sent_passphrase && asked > 1) {
        return AuthState::PassphrasePrompt;
    }

    AuthState::Fail
}

/// One step of the local-key handshake
#[async_trait]
pub trait KeyExchange: Send + Sync {
    /// Host being authenticated against
    fn host(&self) -> &str;

    /// Try the handshake once.
    ///
    /// `accept_new_host` trusts an unknown host key; `passphrase` unlocks the key.
    async fn attempt(&self, accept_new_host: bool, passphrase: Option<&str>) -> Result<AuthState>;

    /// How later git commands reach the host with the same key
    fn access(&self) -> crate::auth::Access;
}

/// Runs the system `ssh` against port 443 of the ssh host
#[derive(Debug, Clone)]
pub struct SshKeyExchange {
    host: String,
    timeout: Duration,
    askpass: Arc<AskPass>,
}

impl SshKeyExchange {
    /// Handshake against `settings.ssh_host`
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            host: settings.ssh_host.clone(),
            timeout: settings.ssh_timeout,
            askpass: Arc::new(AskPass::new()?),
        })
    }
}

#[async_trait]
impl KeyExchange for SshKeyExchange {
    fn host(&self) -> &str {
        &self.host
    }

    async fn attempt(&self, accept_new_host: bool, passphrase: Option<&str>) -> Result<AuthState> {
        // the askpass helper is a shell script
        if cfg!(windows) {
            tracing::debug!("no ssh key login on windows, falling back to token authentication");
            return Ok(AuthState::Fail);
        }
        let Ok(ssh) = which::which("ssh") else {
            tracing::warn!("ssh not found on PATH, falling back to token authentication");
            return Ok(AuthState::Fail);
        };

        let log = self.askpass.fresh_log()?;
        let checking = if accept_new_host { "accept-new" } else { "ask" };

        let mut cmd = Command::new(ssh);
        cmd.args(["-p", "443", "-T"])
            .arg("-o")
            .arg(format!("StrictHostKeyChecking={checking}"))
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.timeout.as_secs().max(1)))
            .arg(format!("git@{}", self.host))
            .env("SSH_ASKPASS", self.askpass.script())
            .env("SSH_ASKPASS_REQUIRE", "force")
            .env(LOG_ENV, &log)
            .env_remove(SECRET_ENV);
        if let Some(passphrase) = passphrase {
            cmd.env(SECRET_ENV, passphrase);
        }

        let out = process::output(cmd, None, self.timeout, "ssh").await?;
        let output = format!(
            "{}{}",
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr)
        );
        let prompts = std::fs::read_to_string(&log).unwrap_or_default();

        let state = classify(&output, &prompts, passphrase.is_some());
        tracing::debug!(?state, status = ?out.status, "ssh handshake");
        Ok(state)
    }

    fn access(&self) -> crate::auth::Access {
        crate::auth::Access::Key(Arc::clone(&self.askpass))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(windows)]
    #[tokio::test]
    async fn test_windows_falls_back_without_running_ssh() {
        let exchange = SshKeyExchange::new(&Settings::default()).unwrap();
        assert_eq!(exchange.attempt(false, None).await.unwrap(), AuthState::Fail);
        assert_eq!(exchange.attempt(true, Some("pw")).await.unwrap(), AuthState::Fail);
    }

    #[test]
    fn test_greeting_is_success() {
        let out = "Hi octocat! You've successfully authenticated, but GitHub does not provide shell access.\n";
        assert_eq!(
            classify(out, "", false),
            AuthState::Success {
                username: "octocat".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_host_is_new_host_key() {
        let prompts = "Are you sure you want to continue connecting (yes/no/[fingerprint])? \n";
        assert_eq!(
            classify("Host key verification failed.\n", prompts, false),
            AuthState::NewHostKey
        );
    }

    #[test]
    fn test_locked_key_asks_for_passphrase() {
        let prompts = "Enter passphrase for key '/home/a/.ssh/id_ed25519': \n";
        assert_eq!(
            classify("git@ssh.github.com: Permission denied (publickey).", prompts, false),
            AuthState::PassphrasePrompt
        );
    }

    #[test]
    fn test_rejected_passphrase_asks_again() {
        let one = "Enter passphrase for key 'k': \n";
        let two = "Enter passphrase for key 'k': \nEnter passphrase for key 'k': \n";
        assert_eq!(classify("", one, true), AuthState::Fail);
        assert_eq!(classify("", two, true), AuthState::PassphrasePrompt);
    }

    #[test]
    fn test_denied_without_prompts_fails() {
        assert_eq!(
            classify("git@ssh.github.com: Permission denied (publickey).", "", false),
            AuthState::Fail
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_askpass_answers_first_passphrase_prompt_only() {
        let askpass = AskPass::new().unwrap();
        let log = askpass.fresh_log().unwrap();
        let ask = |prompt: &'static str| {
            let mut cmd = Command::new(askpass.script());
            cmd.arg(prompt)
                .env(LOG_ENV, &log)
                .env(SECRET_ENV, "hunter2");
            process::output(cmd, None, Duration::from_secs(5), "askpass")
        };

        let first = ask("Enter passphrase for key 'k': ").await.unwrap();
        assert!(first.status.success());
        assert_eq!(String::from_utf8_lossy(&first.stdout), "hunter2\n");

        let second = ask("Enter passphrase for key 'k': ").await.unwrap();
        assert!(!second.status.success());

        let host = ask("Are you sure you want to continue connecting?").await.unwrap();
        assert!(!host.status.success());
        assert_eq!(std::fs::read_to_string(&log).unwrap().lines().count(), 3);
    }
}
