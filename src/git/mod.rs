//! git invocation
//!
//! [`Git`] is a value describing *how* to call git: hidden options (credential
//! cache, work tree), extra environment and a timeout. Call sites clone and
//! extend it instead of sharing mutable state, so every command states its
//! full context explicitly.

mod working_area;

pub use working_area::WorkingArea;

use crate::error::{Error, Result};
use crate::process;
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Oldest git that supports every command used here
pub const MIN_GIT_VERSION: (u32, u32) = (2, 7);

/// Captured result of a git command
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Whether git exited with status zero
    pub success: bool,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// How to invoke git
#[derive(Debug, Clone)]
pub struct Git {
    program: OsString,
    hidden: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    dir: Option<PathBuf>,
    timeout: Duration,
}

impl Git {
    /// git from `PATH` with the given timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: OsString::from("git"),
            hidden: Vec::new(),
            envs: Vec::new(),
            dir: None,
            timeout,
        }
    }

    /// Add options that precede every subcommand but stay out of logs
    #[must_use]
    pub fn with_hidden<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.hidden
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable for every invocation
    #[must_use]
    pub fn with_env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Run git as if started in `dir` (`git -C dir`)
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Replace the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Visible command line, as logged
    pub fn display<S: AsRef<OsStr>>(args: &[S]) -> String {
        args.iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run and capture, whatever the exit status
    pub async fn output<S: AsRef<OsStr>>(
        &self,
        args: &[S],
        input: Option<&str>,
    ) -> Result<GitOutput> {
        let visible = Self::display(args);
        tracing::debug!(command = %format!("git {visible}"), "running");

        let mut cmd = Command::new(&self.program);
        if let Some(dir) = &self.dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(&self.hidden)
            .args(args)
            // never block on a terminal prompt; credentials come from helpers
            .env("GIT_TERMINAL_PROMPT", "0");
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        let out = process::output(
            cmd,
            input.map(str::as_bytes),
            self.timeout,
            &format!("git {visible}"),
        )
        .await?;

        Ok(GitOutput {
            success: out.status.success(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    /// Run, returning stdout; non-zero exit is [`Error::Git`]
    pub async fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<String> {
        self.checked(args, None).await
    }

    /// Run with `input` on stdin, returning stdout
    pub async fn run_with_input<S: AsRef<OsStr>>(&self, args: &[S], input: &str) -> Result<String> {
        self.checked(args, Some(input)).await
    }

    async fn checked<S: AsRef<OsStr>>(&self, args: &[S], input: Option<&str>) -> Result<String> {
        let out = self.output(args, input).await?;
        if out.success {
            Ok(out.stdout)
        } else {
            Err(Error::Git {
                command: Self::display(args),
                stderr: out.stderr.trim().to_string(),
            })
        }
    }
}

/// Quote `value` for the shell git uses to start credential helpers
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:@".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Parse `git version 2.39.2 (Apple Git-143)` into `(2, 39)`
pub fn parse_version(output: &str) -> Option<(u32, u32)> {
    let re = Regex::new(r"(\d+)\.(\d+)").ok()?;
    let caps = re.captures(output)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Ensure git is installed and recent enough
pub async fn check_dependencies(git: &Git) -> Result<()> {
    which::which("git").map_err(|_| {
        Error::Dependency("You don't have git. Install git, then re-run!".to_string())
    })?;

    let out = git.run(&["--version"]).await?;
    let version = parse_version(&out)
        .ok_or_else(|| Error::Parse(format!("unrecognized git version: {}", out.trim())))?;
    if version < MIN_GIT_VERSION {
        return Err(Error::Dependency(format!(
            "You have an old version of git. Install version {}.{} or later, then re-run!",
            MIN_GIT_VERSION.0, MIN_GIT_VERSION.1
        )));
    }
    Ok(())
}
