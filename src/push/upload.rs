//! Phase 4: upload

use crate::error::{Error, Result};
use crate::push::prepare::Prepared;
use crate::types::User;
use std::collections::BTreeMap;

/// `automated commit by {tool}` followed by ` [key=value]` per data entry
pub fn commit_message(tool: &str, data: &BTreeMap<String, String>) -> String {
    let mut message = format!("automated commit by {tool}");
    for (key, value) in data {
        message.push_str(&format!(" [{key}={value}]"));
    }
    message
}

/// Whether git's push failure is a branch naming conflict on the remote
pub fn is_ref_conflict(stderr: &str) -> bool {
    stderr.contains("cannot lock ref") || stderr.contains("exists; cannot create")
}

/// Commit the staged files and push them; returns the login and commit hash
pub async fn upload(
    prepared: &Prepared,
    branch: &str,
    user: &User,
    tool: &str,
    data: &BTreeMap<String, String>,
) -> Result<(String, String)> {
    let git = prepared.git();
    let message = commit_message(tool, data);
    git.run(&["commit", "-m", &message, "--allow-empty"]).await?;

    let push = user
        .git(git.clone())
        .output(&["push", "origin", branch], None)
        .await?;
    if !push.success {
        let stderr = push.stderr.trim().to_string();
        if is_ref_conflict(&stderr) {
            return Err(Error::InvalidBranch(format!(
                "Could not push to {branch}: it conflicts with an existing branch in your \
                 submission repository.\n{stderr}"
            )));
        }
        return Err(Error::Git {
            command: format!("push origin {branch}"),
            stderr,
        });
    }

    let hash = git.run(&["rev-parse", "HEAD"]).await?;
    Ok((user.name.clone(), hash.trim().to_string()))
}
