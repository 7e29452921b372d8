//! Error types for handin

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using handin's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while submitting
#[derive(Error, Debug)]
pub enum Error {
    /// Slug is malformed or names no known branch
    #[error("{0}")]
    InvalidSlug(String),

    /// Required files are absent from the submission directory
    #[error("You seem to be missing these required files:\n{}\nYou are currently in: {}, did you perhaps intend another directory?", .files.join("\n"), .dir.display())]
    MissingFiles {
        /// Missing paths, relative to `dir`
        files: Vec<String>,
        /// Directory the selection ran in
        dir: PathBuf,
    },

    /// A glob expanded past the configured cap
    #[error("Looks like you are in a directory with too many (> {limit}) files.\nYou are currently in: {}, did you perhaps intend another directory?", .dir.display())]
    TooManyFiles {
        /// Configured cap
        limit: usize,
        /// Directory the selection ran in
        dir: PathBuf,
    },

    /// Configuration has no section for the tool
    #[error("{0} is not enabled for this problem")]
    MissingTool(String),

    /// Configuration is malformed or uses an unknown tag
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// External process or request exceeded its timeout
    #[error("timed out: {0}")]
    Timeout(String),

    /// Remote host unreachable or degraded
    #[error("{0}")]
    ConnectionFailure(String),

    /// Push rejected because the branch name conflicts with an existing ref
    #[error("{0}")]
    InvalidBranch(String),

    /// Operator declined a required confirmation
    #[error("{0}")]
    RejectedPrompt(String),

    /// Operator interrupted an interactive prompt
    #[error("interrupted")]
    Interrupted,

    /// Authentication failed on every available protocol
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Tool is not provisioned for the operator's account
    #[error("{0}")]
    NotEnabled(String),

    /// Files exceed what the remote accepts
    #[error("These files are too large to be submitted:\n{}\nRemove these files from your directory and then re-run!", .0.join("\n"))]
    TooLarge(Vec<String>),

    /// Selection left nothing to submit
    #[error("No files in this directory are expected for submission.")]
    NoFiles,

    /// Required executable is missing or too old
    #[error("{0}")]
    Dependency(String),

    /// git exited unsuccessfully
    #[error("git {command} failed: {stderr}")]
    Git {
        /// Visible part of the command line
        command: String,
        /// Captured standard error
        stderr: String,
    },

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed response payload
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Process exit code for this error kind.
    ///
    /// Each kind maps to a distinct code so wrappers can branch on it.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidSlug(_) => 2,
            Self::MissingFiles { .. } => 3,
            Self::TooManyFiles { .. } => 4,
            Self::MissingTool(_) => 5,
            Self::InvalidConfig(_) => 6,
            Self::Timeout(_) => 7,
            Self::ConnectionFailure(_) => 8,
            Self::InvalidBranch(_) => 9,
            Self::RejectedPrompt(_) => 10,
            Self::Auth(_) => 11,
            Self::NotEnabled(_) => 12,
            Self::NoFiles => 13,
            Self::Dependency(_) => 14,
            Self::TooLarge(_) => 15,
            Self::Interrupted => 130,
            Self::Git { .. } | Self::Io(_) | Self::Http(_) | Self::Parse(_) => 1,
        }
    }
}
