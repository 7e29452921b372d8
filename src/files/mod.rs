//! File selection
//!
//! Starting from every non-hidden file under a root, tagged patterns are
//! applied in document order: `!include` and `!exclude` move glob matches
//! between the two sets, `!require` insists a literal path exists. Later
//! patterns win over earlier ones.

mod matcher;

use crate::config::{Tag, TaggedValue};
use crate::error::{Error, Result};
use crate::settings::DEFAULT_FILE_LIMIT;
use crate::types::FileSet;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

pub use matcher::normalize;

/// Path components that are never submitted, matched at any depth
pub const ALWAYS_EXCLUDE: [&str; 4] = [".git*", ".lfs*", ".c9*", ".~c9*"];

/// Rule-based file selector rooted at a directory
#[derive(Debug, Clone)]
pub struct FileSelector {
    root: PathBuf,
    limit: usize,
    require_tags: Vec<Tag>,
    include_tags: Vec<Tag>,
    exclude_tags: Vec<Tag>,
}

impl FileSelector {
    /// Selector over `root` with the standard tags
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            limit: DEFAULT_FILE_LIMIT,
            require_tags: vec![Tag::Require],
            include_tags: vec![Tag::Include],
            exclude_tags: vec![Tag::Exclude],
        }
    }

    /// Cap the number of files a single pattern may produce
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Replace the tags treated as require/include/exclude.
    ///
    /// Names may carry a leading `!`. A tag in none of the lists is ignored.
    #[must_use]
    pub fn with_tags<R, I, E>(mut self, require: R, include: I, exclude: E) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        self.require_tags = require.into_iter().map(|t| Tag::new(t.as_ref())).collect();
        self.include_tags = include.into_iter().map(|t| Tag::new(t.as_ref())).collect();
        self.exclude_tags = exclude.into_iter().map(|t| Tag::new(t.as_ref())).collect();
        self
    }

    /// Root the selection runs in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the included and excluded files for `patterns`.
    ///
    /// Every missing `!require` path is collected before failing.
    pub fn select<'a, I>(&self, patterns: I) -> Result<FileSet>
    where
        I: IntoIterator<Item = &'a TaggedValue>,
    {
        let mut included = matcher::walk_all(&self.root, self.limit)?;
        let mut excluded = BTreeSet::new();
        let mut missing = Vec::new();

        for pattern in patterns {
            if self.require_tags.contains(&pattern.tag) {
                let file = normalize(Path::new(&pattern.value));
                if self.root.join(&file).exists() {
                    if excluded.remove(&file) {
                        included.insert(file);
                    }
                } else {
                    missing.push(file.to_string_lossy().into_owned());
                }
            } else if self.include_tags.contains(&pattern.tag) {
                let matched = self.glob(&pattern.value)?;
                excluded.retain(|f| !matched.contains(f));
                included.extend(matched);
            } else if self.exclude_tags.contains(&pattern.tag) {
                let matched = self.glob(&pattern.value)?;
                included.retain(|f| !matched.contains(f));
                excluded.extend(matched);
            } else {
                tracing::debug!(tag = %pattern.tag, value = %pattern.value, "ignoring pattern");
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingFiles {
                files: missing,
                dir: self.root.clone(),
            });
        }

        included.retain(|f| !always_excluded(f));

        let mut files = FileSet::default();
        for file in excluded {
            files.excluded.insert(matcher::display(&file));
        }
        for file in included {
            match matcher::to_utf8(&file) {
                Some(name) => {
                    files.included.insert(name);
                }
                None => {
                    tracing::warn!(file = %file.display(), "skipping file with non-UTF-8 name");
                    files.excluded.insert(matcher::display(&file));
                }
            }
        }

        Ok(files)
    }

    fn glob(&self, pattern: &str) -> Result<BTreeSet<PathBuf>> {
        matcher::expand(&self.root, pattern, self.limit)
    }
}

fn always_excluded(path: &Path) -> bool {
    static PATTERNS: OnceLock<Vec<::glob::Pattern>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        ALWAYS_EXCLUDE
            .iter()
            .filter_map(|p| ::glob::Pattern::new(p).ok())
            .collect()
    });
    path.components().any(|c| match c {
        Component::Normal(name) => name
            .to_str()
            .is_some_and(|n| patterns.iter().any(|p| p.matches(n))),
        _ => false,
    })
}
