//! Phase 1: connect
//!
//! Resolve the slug, read the problem's configuration and decide which files
//! are submitted. Nothing here needs credentials.

use crate::config::{ConfigLoader, ConfigValue, Tag, TaggedValue};
use crate::error::{Error, Result};
use crate::files::FileSelector;
use crate::platform::PlatformService;
use crate::settings::CONFIG_FILENAMES;
use crate::types::{FileSet, RemoteSettings, Slug};

/// Everything learned while connecting
#[derive(Debug, Clone)]
pub struct Connection {
    /// The resolved slug
    pub slug: Slug,
    /// Where the submission goes
    pub remote: RemoteSettings,
    /// Files to submit and files left out
    pub files: FileSet,
}

/// Loader for `tool` with the `files` key scoped to the selection tags
pub fn config_loader(tool: &str) -> ConfigLoader {
    let mut loader = ConfigLoader::new(tool);
    loader.scope(
        "files",
        [Tag::Include, Tag::Exclude, Tag::Require],
        Some(Tag::Include),
    );
    loader
}

/// Raw configuration document for `slug`.
///
/// Exactly one accepted filename must exist under the problem directory.
pub async fn fetch_config(platform: &dyn PlatformService, slug: &Slug) -> Result<String> {
    let mut found = Vec::new();
    for name in CONFIG_FILENAMES {
        let path = if slug.problem.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", slug.problem)
        };
        if let Some(content) = platform
            .fetch_file(&slug.org, &slug.repo, &slug.branch, &path)
            .await?
        {
            found.push(content);
        }
    }

    match found.len() {
        0 => {
            // an outage looks exactly like a missing file
            platform.check_status().await?;
            Err(Error::InvalidSlug(format!(
                "Invalid slug: {slug}. Did you mean something else?"
            )))
        }
        1 => Ok(found.remove(0)),
        _ => Err(Error::InvalidSlug(format!(
            "Invalid slug: {slug}. Multiple configurations (both .yaml and .yml) found."
        ))),
    }
}

/// Load the tool's section; a bare truthy value reads as an empty mapping
pub fn load_config(loader: &ConfigLoader, content: &str) -> Result<ConfigValue> {
    let config = match loader.load(content, true) {
        Ok(config) => config,
        Err(Error::MissingTool(tool)) => {
            return Err(Error::InvalidSlug(format!(
                "Invalid slug for {tool}. Did you mean something else?"
            )));
        }
        Err(e) => return Err(e),
    };
    Ok(match config {
        ConfigValue::Mapping(_) => config,
        _ => ConfigValue::Mapping(Default::default()),
    })
}

/// `defaults` overridden by the config's `remote` section
pub fn remote_settings(config: &ConfigValue, defaults: &RemoteSettings) -> Result<RemoteSettings> {
    let mut remote = defaults.clone();
    let Some(section) = config.get("remote") else {
        return Ok(remote);
    };
    if !matches!(section, ConfigValue::Mapping(_)) {
        return Err(Error::InvalidConfig("remote must be a mapping".to_string()));
    }

    for (key, field) in [
        ("org", &mut remote.org),
        ("message", &mut remote.message),
        ("results", &mut remote.results),
        ("callback", &mut remote.callback),
    ] {
        match section.get(key) {
            None => {}
            Some(value) => {
                *field = value
                    .as_str()
                    .ok_or_else(|| Error::InvalidConfig(format!("remote.{key} must be a string")))?
                    .to_string();
            }
        }
    }
    Ok(remote)
}

/// Patterns under the `files` key, in document order
pub fn file_patterns(config: &ConfigValue) -> Result<Vec<&TaggedValue>> {
    let Some(files) = config.get("files") else {
        return Ok(Vec::new());
    };
    let entries: Vec<&ConfigValue> = match files {
        ConfigValue::Sequence(items) => items.iter().collect(),
        ConfigValue::Null => Vec::new(),
        other => vec![other],
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            ConfigValue::Tagged(tagged) => Ok(tagged),
            other => Err(Error::InvalidConfig(format!(
                "files entries must be tagged paths, found {}",
                serde_yaml::to_string(&other.to_yaml())
                    .unwrap_or_default()
                    .trim()
            ))),
        })
        .collect()
}

/// Select files under the selector's root; an empty selection is an error
pub fn select_files(selector: &FileSelector, config: &ConfigValue) -> Result<FileSet> {
    let files = selector.select(file_patterns(config)?)?;
    if files.included.is_empty() {
        return Err(Error::NoFiles);
    }
    Ok(files)
}
