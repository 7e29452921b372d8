//! Slugs available from local mirrors, for "did you mean" suggestions

use crate::config::{find_config_file, ConfigLoader};
use crate::error::Result;
use crate::git::Git;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Slugs of every mirrored problem whose configuration has a `tool` section.
///
/// With a non-empty `similar_to`, the search is narrowed to its `org/repo`
/// mirror when one exists and the result is ranked by [`rank_similar`].
pub async fn local_slugs(
    git: &Git,
    mirror_dir: &Path,
    tool: &str,
    similar_to: &str,
) -> Result<Vec<String>> {
    let similar_to = similar_to.trim_matches('/');
    let mut parts = similar_to.split('/');
    let org = parts.next().unwrap_or_default().to_lowercase();
    let repo = parts.next().unwrap_or_default().to_lowercase();

    let narrowed = mirror_dir.join(&org).join(&repo);
    let search = if narrowed.is_dir() {
        narrowed
    } else {
        mirror_dir.to_path_buf()
    };

    let mut configs = Vec::new();
    config_files(&search, &mut configs);
    configs.sort();

    let loader = ConfigLoader::new(tool);
    let mut branches: HashMap<(String, String), String> = HashMap::new();
    let mut slugs = Vec::new();
    for config in configs {
        let Ok(content) = fs::read_to_string(&config) else {
            continue;
        };
        if loader.load(&content, false).is_err() {
            continue;
        }
        let Ok(rel) = config.strip_prefix(mirror_dir) else {
            continue;
        };
        let parts: Vec<String> = rel
            .iter()
            .map(|c| c.to_string_lossy().into_owned())
            .collect();
        // org, repo, problem directories..., config file
        let [org, repo, problem @ .., _file] = parts.as_slice() else {
            continue;
        };

        let key = (org.clone(), repo.clone());
        let branch = match branches.get(&key) {
            Some(branch) => branch.clone(),
            None => {
                let head = git
                    .clone()
                    .in_dir(mirror_dir.join(org).join(repo))
                    .run(&["rev-parse", "--abbrev-ref", "HEAD"])
                    .await;
                let Ok(head) = head else {
                    tracing::debug!(org = %org, repo = %repo, "mirror has no checked out branch");
                    continue;
                };
                let branch = head.trim().to_string();
                branches.insert(key, branch.clone());
                branch
            }
        };

        let mut slug = vec![org.as_str(), repo.as_str(), branch.as_str()];
        slug.extend(problem.iter().map(String::as_str));
        slugs.push(slug.join("/"));
    }

    Ok(if similar_to.is_empty() {
        slugs
    } else {
        rank_similar(similar_to, slugs)
    })
}

/// Order `slugs` from most to least similar to `target` (Jaro-Winkler).
///
/// When `target` names an `org/repo` that some slugs share, only those are kept.
pub fn rank_similar(target: &str, slugs: Vec<String>) -> Vec<String> {
    let owner = |slug: &str| -> Vec<String> {
        slug.split('/').take(2).map(str::to_lowercase).collect()
    };
    let wanted = owner(target);

    let slugs = if wanted.len() == 2 {
        let same: Vec<String> = slugs
            .iter()
            .filter(|s| owner(s) == wanted)
            .cloned()
            .collect();
        if same.is_empty() { slugs } else { same }
    } else {
        slugs
    };

    let mut scored: Vec<(f64, String)> = slugs
        .into_iter()
        .map(|slug| (strsim::jaro_winkler(target, &slug), slug))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, slug)| slug).collect()
}

fn config_files(dir: &Path, out: &mut Vec<PathBuf>) {
    match find_config_file(dir) {
        Ok(Some(config)) => out.push(config),
        Ok(None) => {}
        Err(e) => tracing::debug!(dir = %dir.display(), error = %e, "skipping ambiguous config"),
    }

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.file_name() == ".git" {
            continue;
        }
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            config_files(&entry.path(), out);
        }
    }
}
