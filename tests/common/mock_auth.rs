//! Mock authentication collaborators
//!
//! Each mock plays back scripted answers and records what it was asked.

#![allow(dead_code)]

use async_trait::async_trait;
use handin::auth::{
    Access, AskPass, Credential, CredentialApproval, CredentialRequest, CredentialStore,
    KeyExchange, Prompter,
};
use handin::error::{Error, Result};
use handin::types::AuthState;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Record of a `KeyExchange::attempt` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub accept_new_host: bool,
    pub passphrase: Option<String>,
}

/// Key exchange answering from a script, then `Fail` once it runs out
pub struct MockKeyExchange {
    states: Mutex<VecDeque<AuthState>>,
    attempts: Mutex<Vec<Attempt>>,
    askpass: Arc<AskPass>,
}

impl MockKeyExchange {
    pub fn new(states: impl IntoIterator<Item = AuthState>) -> Self {
        Self {
            states: Mutex::new(states.into_iter().collect()),
            attempts: Mutex::new(Vec::new()),
            askpass: Arc::new(AskPass::new().unwrap()),
        }
    }

    /// Exchange whose key is always refused
    pub fn refusing() -> Self {
        Self::new([])
    }

    pub fn get_attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyExchange for MockKeyExchange {
    fn host(&self) -> &str {
        "ssh.example.invalid"
    }

    async fn attempt(&self, accept_new_host: bool, passphrase: Option<&str>) -> Result<AuthState> {
        self.attempts.lock().unwrap().push(Attempt {
            accept_new_host,
            passphrase: passphrase.map(str::to_string),
        });
        Ok(self
            .states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(AuthState::Fail))
    }

    fn access(&self) -> Access {
        Access::Key(self.askpass.clone())
    }
}

/// In-memory credential store
pub struct MockCredentialStore {
    cached: Mutex<Option<Credential>>,
    fail_logout: Mutex<bool>,
    socket: PathBuf,

    fill_calls: Mutex<Vec<CredentialRequest>>,
    approvals: Mutex<Vec<CredentialApproval>>,
    logout_calls: Mutex<usize>,
}

impl Default for MockCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self {
            cached: Mutex::new(None),
            fail_logout: Mutex::new(false),
            socket: std::env::temp_dir().join("handin-test-socket"),
            fill_calls: Mutex::new(Vec::new()),
            approvals: Mutex::new(Vec::new()),
            logout_calls: Mutex::new(0),
        }
    }

    /// Store holding `username`/`password` from an earlier run
    pub fn with_cached(username: &str, password: &str) -> Self {
        let store = Self::new();
        *store.cached.lock().unwrap() = Some(Credential {
            username: username.to_string(),
            password: password.to_string(),
        });
        store
    }

    /// Make `logout` return an error
    pub fn fail_logout(&self) {
        *self.fail_logout.lock().unwrap() = true;
    }

    pub fn get_fill_calls(&self) -> Vec<CredentialRequest> {
        self.fill_calls.lock().unwrap().clone()
    }

    pub fn get_approvals(&self) -> Vec<CredentialApproval> {
        self.approvals.lock().unwrap().clone()
    }

    pub fn logout_calls(&self) -> usize {
        *self.logout_calls.lock().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.cached.lock().unwrap().is_none()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn fill(&self, request: &CredentialRequest) -> Result<Option<Credential>> {
        self.fill_calls.lock().unwrap().push(request.clone());
        Ok(self.cached.lock().unwrap().clone())
    }

    async fn approve(&self, approval: &CredentialApproval) -> Result<()> {
        self.approvals.lock().unwrap().push(approval.clone());
        *self.cached.lock().unwrap() = Some(approval.credential.clone());
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        *self.logout_calls.lock().unwrap() += 1;
        if *self.fail_logout.lock().unwrap() {
            return Err(Error::Auth("cache daemon unreachable".to_string()));
        }
        *self.cached.lock().unwrap() = None;
        Ok(())
    }

    fn access(&self) -> Access {
        Access::CredentialCache {
            socket: self.socket.clone(),
        }
    }
}

/// Prompter answering from scripts
///
/// Running out of scripted answers is `Interrupted`, like Ctrl-C at a prompt.
#[derive(Default)]
pub struct MockPrompter {
    usernames: Mutex<VecDeque<String>>,
    secrets: Mutex<VecDeque<String>>,
    confirms: Mutex<VecDeque<bool>>,

    prompts: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
}

impl MockPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_usernames<'a>(self, answers: impl IntoIterator<Item = &'a str>) -> Self {
        self.usernames
            .lock()
            .unwrap()
            .extend(answers.into_iter().map(str::to_string));
        self
    }

    #[must_use]
    pub fn with_secrets<'a>(self, answers: impl IntoIterator<Item = &'a str>) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .extend(answers.into_iter().map(str::to_string));
        self
    }

    #[must_use]
    pub fn with_confirms(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirms.lock().unwrap().extend(answers);
        self
    }

    /// Every prompt shown, in order
    pub fn get_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn get_warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    /// Assert some warning contains `needle`
    pub fn assert_warned(&self, needle: &str) {
        let warnings = self.get_warnings();
        assert!(
            warnings.iter().any(|w| w.contains(needle)),
            "Expected a warning containing {needle:?} but got: {warnings:?}"
        );
    }
}

#[async_trait]
impl Prompter for MockPrompter {
    async fn username(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.usernames
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(Error::Interrupted)
    }

    async fn secret(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.secrets
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(Error::Interrupted)
    }

    async fn confirm(&self, prompt: &str, _default: bool) -> Result<bool> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(Error::Interrupted)
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}
