//! Runtime settings
//!
//! Defaults target github.com. Every field can be overridden through a
//! `HANDIN_*` environment variable, which is how tests point the pipeline at
//! local mock servers.

use crate::types::RemoteSettings;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Files larger than this go through git-lfs
pub const DEFAULT_LFS_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Files larger than this are refused outright
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Cap on the number of paths a single glob may produce
pub const DEFAULT_FILE_LIMIT: usize = 10_000;

/// Accepted configuration filenames, in lookup order
pub const CONFIG_FILENAMES: [&str; 2] = [".cs50.yaml", ".cs50.yml"];

/// Runtime settings for a submission
#[derive(Debug, Clone)]
pub struct Settings {
    /// Host serving problem repositories over https
    pub host: String,
    /// Host accepting ssh on port 443
    pub ssh_host: String,
    /// Base URL for raw file content
    pub raw_url: String,
    /// Base URL of the REST API (identity endpoint)
    pub api_url: String,
    /// Statuspage components endpoint
    pub status_url: String,
    /// Timeout for listing remote branches
    pub branch_timeout: Duration,
    /// Timeout for an ssh handshake
    pub ssh_timeout: Duration,
    /// Timeout for other git invocations
    pub git_timeout: Duration,
    /// Timeout for HTTP requests
    pub http_timeout: Duration,
    /// Cap on files per glob
    pub file_limit: usize,
    /// Size at which files switch to git-lfs
    pub lfs_threshold: u64,
    /// Size at which files are refused
    pub max_file_size: u64,
    /// Socket of the git credential cache daemon
    pub credential_socket: PathBuf,
    /// Root of local problem mirrors
    pub mirror_dir: PathBuf,
    /// Parent of the per-push working areas
    pub staging_dir: PathBuf,
    /// Submission destination when the config has no `remote` key
    pub remote: RemoteSettings,
    /// Where operators enable a tool for the default org
    pub enable_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let data = dirs::data_local_dir().unwrap_or_else(|| home.join(".local").join("share"));
        Self {
            host: "github.com".to_string(),
            ssh_host: "ssh.github.com".to_string(),
            raw_url: "https://github.com".to_string(),
            api_url: "https://api.github.com".to_string(),
            status_url: "https://kctbh9vrtdwd.statuspage.io/api/v2/components.json".to_string(),
            branch_timeout: Duration::from_secs(10),
            ssh_timeout: Duration::from_secs(20),
            git_timeout: Duration::from_secs(300),
            http_timeout: Duration::from_secs(30),
            file_limit: DEFAULT_FILE_LIMIT,
            lfs_threshold: DEFAULT_LFS_THRESHOLD,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            credential_socket: home.join(".git-credential-cache").join("handin"),
            mirror_dir: data.join("handin"),
            staging_dir: env::temp_dir(),
            remote: RemoteSettings {
                org: "me50".to_string(),
                message: "Go to {results} to see your results.".to_string(),
                results: "https://submit.cs50.io/{username}/{slug}".to_string(),
                callback: "https://submit.cs50.io/hooks/results".to_string(),
            },
            enable_url: "https://submit.cs50.io".to_string(),
        }
    }
}

impl Settings {
    /// Defaults with `HANDIN_*` environment overrides applied
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(v) = env::var("HANDIN_HOST") {
            settings.host = v;
        }
        if let Ok(v) = env::var("HANDIN_SSH_HOST") {
            settings.ssh_host = v;
        }
        if let Ok(v) = env::var("HANDIN_RAW_URL") {
            settings.raw_url = v;
        }
        if let Ok(v) = env::var("HANDIN_API_URL") {
            settings.api_url = v;
        }
        if let Ok(v) = env::var("HANDIN_STATUS_URL") {
            settings.status_url = v;
        }
        if let Some(secs) = env_number("HANDIN_TIMEOUT") {
            settings.git_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = env_number("HANDIN_FILE_LIMIT") {
            settings.file_limit = usize::try_from(limit).unwrap_or(usize::MAX);
        }
        if let Ok(v) = env::var("HANDIN_CREDENTIAL_SOCKET") {
            settings.credential_socket = PathBuf::from(v);
        }
        if let Ok(v) = env::var("HANDIN_MIRROR_DIR") {
            settings.mirror_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("HANDIN_STAGING_DIR") {
            settings.staging_dir = PathBuf::from(v);
        }

        settings
    }
}

fn env_number(key: &str) -> Option<u64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("ignoring {key}={raw}: not a number");
            None
        }
    }
}
