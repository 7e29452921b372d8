//! Mock platform service for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use handin::error::{Error, Result};
use handin::platform::PlatformService;
use std::collections::HashMap;
use std::sync::Mutex;

/// Record of a `fetch_file` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub org: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
}

/// Mock implementation of `PlatformService` for testing
///
/// Files are keyed by their path inside the problem repository; `org`,
/// `repo` and `branch` are recorded but not matched.
pub struct MockPlatformService {
    files: Mutex<HashMap<String, String>>,
    logins: Mutex<HashMap<(String, String), String>>,
    status_error: Mutex<Option<String>>,

    fetch_calls: Mutex<Vec<FetchCall>>,
    user_calls: Mutex<Vec<String>>,
    status_calls: Mutex<usize>,
}

impl Default for MockPlatformService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatformService {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            logins: Mutex::new(HashMap::new()),
            status_error: Mutex::new(None),
            fetch_calls: Mutex::new(Vec::new()),
            user_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(0),
        }
    }

    // === Response setup ===

    /// Serve `content` at `path`
    pub fn add_file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    /// Accept `username` with `token`, canonicalized to `login`
    pub fn accept_token(&self, username: &str, token: &str, login: &str) {
        self.logins.lock().unwrap().insert(
            (username.to_string(), token.to_string()),
            login.to_string(),
        );
    }

    /// Make `check_status` report an outage of `component`
    pub fn fail_status(&self, component: &str) {
        *self.status_error.lock().unwrap() = Some(component.to_string());
    }

    // === Call verification ===

    pub fn get_fetch_calls(&self) -> Vec<FetchCall> {
        self.fetch_calls.lock().unwrap().clone()
    }

    /// Usernames `current_user` was called with
    pub fn get_user_calls(&self) -> Vec<String> {
        self.user_calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn fetch_file(
        &self,
        org: &str,
        repo: &str,
        branch: &str,
        path: &str,
    ) -> Result<Option<String>> {
        self.fetch_calls.lock().unwrap().push(FetchCall {
            org: org.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            path: path.to_string(),
        });
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    async fn current_user(&self, login: &str, token: &str) -> Result<String> {
        self.user_calls.lock().unwrap().push(login.to_string());
        self.logins
            .lock()
            .unwrap()
            .get(&(login.to_string(), token.to_string()))
            .cloned()
            .ok_or_else(|| Error::Auth("Invalid username and/or token.".to_string()))
    }

    async fn check_status(&self) -> Result<()> {
        *self.status_calls.lock().unwrap() += 1;
        match self.status_error.lock().unwrap().as_ref() {
            Some(component) => Err(Error::ConnectionFailure(format!(
                "GitHub is having some issues with {component}."
            ))),
            None => Ok(()),
        }
    }
}
