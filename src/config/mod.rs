//! Tool configuration (`.cs50.yaml`)
//!
//! Configuration documents are YAML with custom tags (`!include`, `!exclude`,
//! `!require`, or tool-specific ones). [`ConfigLoader`] extracts one tool's
//! section, fills in default tags and validates them per top-level key.

mod loader;
mod value;

pub use loader::ConfigLoader;
pub use value::{ConfigValue, Tag, TaggedValue};

use crate::error::{Error, Result};
use crate::settings::CONFIG_FILENAMES;
use std::path::{Path, PathBuf};

/// Locate the configuration file in `dir`.
///
/// Exactly one accepted filename may exist; `Ok(None)` when neither does.
pub fn find_config_file(dir: &Path) -> Result<Option<PathBuf>> {
    let found: Vec<PathBuf> = CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| path.is_file())
        .collect();

    match found.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(one.clone())),
        _ => Err(Error::InvalidConfig(format!(
            "Multiple configurations ({}) found in {}",
            CONFIG_FILENAMES.join(", "),
            dir.display()
        ))),
    }
}
