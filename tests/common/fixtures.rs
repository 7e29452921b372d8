//! Test data factories for handin types
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use handin::error::Result;
use handin::settings::Settings;
use handin::slug::{BranchLister, SlugResolver};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

/// Branch lister returning the same branches for every repository
pub struct FixedBranches(pub Vec<String>);

#[async_trait]
impl BranchLister for FixedBranches {
    async fn list_branches(&self, _org: &str, _repo: &str) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Resolver that knows `branches` both online and offline
pub fn make_resolver(branches: &[&str]) -> SlugResolver {
    let lister = Arc::new(FixedBranches(
        branches.iter().map(|b| (*b).to_string()).collect(),
    ));
    SlugResolver::new(lister.clone(), lister)
}

/// Settings that never reach a real host
pub fn make_settings() -> Settings {
    let mut settings = Settings::default();
    settings.host = "example.invalid".to_string();
    settings.ssh_host = "ssh.example.invalid".to_string();
    settings.git_timeout = Duration::from_secs(30);
    settings
}

/// Write `files` (path, content) under `root`, creating directories
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let dest = root.join(path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(dest, content).unwrap();
    }
}

/// Whether a usable git is on PATH
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Run git in `dir`, panicking on failure; returns trimmed stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create an empty bare repository at `path`
pub fn init_bare(path: &Path) {
    fs::create_dir_all(path).unwrap();
    git(path, &["init", "--bare", "--quiet"]);
}

/// Config section for `submit50` submitting only `patterns`
pub fn submit50_config(patterns: &[&str]) -> String {
    let mut config = String::from("submit50:\n  files:\n    - !exclude \"*\"\n");
    for pattern in patterns {
        config.push_str(&format!("    - !include \"{pattern}\"\n"));
    }
    config
}
