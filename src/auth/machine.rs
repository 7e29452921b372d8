//! Local-key authentication state machine

use crate::auth::prompt::Prompter;
use crate::auth::ssh::KeyExchange;
use crate::error::{Error, Result};
use crate::types::AuthState;

/// Wrong passphrases tolerated before falling back to token authentication
pub const MAX_PASSPHRASE_ATTEMPTS: usize = 3;

/// A key the remote accepted
#[derive(Clone, PartialEq, Eq)]
pub struct KeyLogin {
    /// Login from the remote's greeting
    pub username: String,
    /// Passphrase that unlocked the key, if one was needed
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for KeyLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyLogin")
            .field("username", &self.username)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Drive the handshake until it succeeds or gives up.
///
/// `Ok(None)` means "fall back": the key was refused, the host was not
/// trusted, the passphrase was wrong too often, or ssh itself misbehaved.
/// Only an interrupt escapes as an error.
pub async fn authenticate(
    exchange: &dyn KeyExchange,
    prompter: &dyn Prompter,
) -> Result<Option<KeyLogin>> {
    match drive(exchange, prompter).await {
        Err(Error::Interrupted) => Err(Error::Interrupted),
        Err(e) => {
            tracing::warn!(error = %e, "ssh authentication failed, falling back");
            Ok(None)
        }
        ok => ok,
    }
}

async fn drive(exchange: &dyn KeyExchange, prompter: &dyn Prompter) -> Result<Option<KeyLogin>> {
    let mut accept_new_host = false;
    let mut passphrase: Option<String> = None;
    let mut attempts = 0;

    loop {
        let state = exchange
            .attempt(accept_new_host, passphrase.as_deref())
            .await?;
        tracing::debug!(?state, attempts, "local key state");

        match state {
            AuthState::Success { username } => {
                return Ok(Some(KeyLogin {
                    username,
                    passphrase,
                }));
            }
            AuthState::Fail => {
                if passphrase.is_some() {
                    prompter.warn(
                        "Looks like that passphrase is incorrect, trying authentication \
                         with username and Personal Access Token instead.",
                    );
                }
                return Ok(None);
            }
            AuthState::NewHostKey => {
                // still unknown after accepting: something else is wrong
                if accept_new_host {
                    return Ok(None);
                }
                let question = format!(
                    "The authenticity of host '{}' can't be established. Trust it and continue connecting?",
                    exchange.host()
                );
                if !prompter.confirm(&question, true).await? {
                    return Ok(None);
                }
                accept_new_host = true;
            }
            AuthState::PassphrasePrompt => {
                if attempts >= MAX_PASSPHRASE_ATTEMPTS {
                    prompter.warn(
                        "Looks like that passphrase is incorrect, trying authentication \
                         with username and Personal Access Token instead.",
                    );
                    return Ok(None);
                }
                if attempts > 0 {
                    prompter.warn("Looks like that passphrase is incorrect, please try again.");
                }
                passphrase = Some(prompter.secret("Enter passphrase for SSH key").await?);
                attempts += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Access;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct Scripted {
        states: Mutex<VecDeque<Result<AuthState>>>,
        calls: Mutex<Vec<(bool, Option<String>)>>,
    }

    impl Scripted {
        fn new(states: Vec<Result<AuthState>>) -> Self {
            Self {
                states: Mutex::new(states.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl KeyExchange for Scripted {
        fn host(&self) -> &str {
            "ssh.github.com"
        }

        async fn attempt(&self, accept: bool, passphrase: Option<&str>) -> Result<AuthState> {
            self.calls
                .lock()
                .unwrap()
                .push((accept, passphrase.map(ToString::to_string)));
            self.states
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(AuthState::Fail))
        }

        fn access(&self) -> Access {
            Access::CredentialCache {
                socket: PathBuf::from("/dev/null"),
            }
        }
    }

    #[derive(Default)]
    struct Answers {
        trust: bool,
        interrupt: bool,
        warnings: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Prompter for Answers {
        async fn username(&self, _prompt: &str) -> Result<String> {
            Ok("unused".to_string())
        }

        async fn secret(&self, _prompt: &str) -> Result<String> {
            if self.interrupt {
                return Err(Error::Interrupted);
            }
            Ok("guess".to_string())
        }

        async fn confirm(&self, _prompt: &str, _default: bool) -> Result<bool> {
            Ok(self.trust)
        }

        fn warn(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }
    }

    fn success() -> Result<AuthState> {
        Ok(AuthState::Success {
            username: "octocat".to_string(),
        })
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let exchange = Scripted::new(vec![success()]);
        let login = authenticate(&exchange, &Answers::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(login.username, "octocat");
        assert!(login.passphrase.is_none());
    }

    #[tokio::test]
    async fn test_passphrase_then_success() {
        let exchange = Scripted::new(vec![Ok(AuthState::PassphrasePrompt), success()]);
        let login = authenticate(&exchange, &Answers::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(login.passphrase.as_deref(), Some("guess"));
        assert_eq!(
            exchange.calls.lock().unwrap().last(),
            Some(&(false, Some("guess".to_string())))
        );
    }

    #[tokio::test]
    async fn test_three_wrong_passphrases_fall_back() {
        let exchange = Scripted::new((0..4).map(|_| Ok(AuthState::PassphrasePrompt)).collect());
        let answers = Answers::default();
        let login = authenticate(&exchange, &answers).await.unwrap();
        assert!(login.is_none());
        assert_eq!(exchange.calls.lock().unwrap().len(), 1 + MAX_PASSPHRASE_ATTEMPTS);
        assert_eq!(answers.warnings.lock().unwrap().len(), MAX_PASSPHRASE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_trusted_host_is_retried_with_accept() {
        let exchange = Scripted::new(vec![Ok(AuthState::NewHostKey), success()]);
        let answers = Answers {
            trust: true,
            ..Answers::default()
        };
        assert!(authenticate(&exchange, &answers).await.unwrap().is_some());
        assert_eq!(exchange.calls.lock().unwrap()[1], (true, None));
    }

    #[tokio::test]
    async fn test_declined_host_falls_back() {
        let exchange = Scripted::new(vec![Ok(AuthState::NewHostKey)]);
        assert!(
            authenticate(&exchange, &Answers::default())
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(exchange.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_process_errors_fall_back() {
        let exchange = Scripted::new(vec![Err(Error::Timeout("ssh".to_string()))]);
        assert!(
            authenticate(&exchange, &Answers::default())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_interrupt_propagates() {
        let exchange = Scripted::new(vec![Ok(AuthState::PassphrasePrompt)]);
        let answers = Answers {
            interrupt: true,
            ..Answers::default()
        };
        assert!(matches!(
            authenticate(&exchange, &answers).await,
            Err(Error::Interrupted)
        ));
    }
}
