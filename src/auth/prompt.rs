//! Interactive input

use crate::error::{Error, Result};
use async_trait::async_trait;
use dialoguer::{Confirm, Input, Password};
use owo_colors::OwoColorize;
use std::io::ErrorKind;

/// Source of operator input during authentication
///
/// Prompts are async so that a pending one can lose a race against an
/// interrupt.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask for a plain-text value
    async fn username(&self, prompt: &str) -> Result<String>;

    /// Ask for a value without echoing it
    async fn secret(&self, prompt: &str) -> Result<String>;

    /// Ask a yes/no question
    async fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Show a warning; never fails
    fn warn(&self, message: &str);
}

/// Check a GitHub username as typed
pub fn validate_username(input: &str) -> std::result::Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Username cannot be empty, please try again.")
    } else if input.contains('@') {
        Err("Please enter your GitHub username, not email.")
    } else {
        Ok(())
    }
}

/// Prompts on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

fn prompt_error(err: dialoguer::Error) -> Error {
    match err {
        dialoguer::Error::IO(e) if e.kind() == ErrorKind::Interrupted => Error::Interrupted,
        dialoguer::Error::IO(e) => Error::Io(e),
    }
}

/// Run a dialoguer prompt on the blocking pool
async fn blocking<T, F>(ask: F) -> Result<T>
where
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(ask)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
        .map_err(prompt_error)
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn username(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_string();
        let value: String = blocking(move || {
            Input::new()
                .with_prompt(prompt)
                .validate_with(|input: &String| validate_username(input))
                .interact_text()
        })
        .await?;
        Ok(value.trim().to_string())
    }

    async fn secret(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_string();
        blocking(move || {
            Password::new()
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()
        })
        .await
    }

    async fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        let prompt = prompt.to_string();
        blocking(move || {
            Confirm::new()
                .with_prompt(prompt)
                .default(default)
                .interact()
        })
        .await
    }

    fn warn(&self, message: &str) {
        anstream::eprintln!("{}", message.yellow().bold());
    }
}
