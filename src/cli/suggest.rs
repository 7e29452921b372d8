//! "Did you mean" hints for slugs that do not resolve

use handin::error::Error;
use handin::git::Git;
use handin::settings::Settings;
use handin::slug::local_slugs;

const MAX_SUGGESTIONS: usize = 3;

/// `err` with the closest locally mirrored slugs appended, if it is
/// [`Error::InvalidSlug`] and any are known
pub async fn with_suggestions(settings: &Settings, tool: &str, raw: &str, err: Error) -> Error {
    let Error::InvalidSlug(message) = err else {
        return err;
    };

    let git = Git::new(settings.git_timeout);
    let slugs = match local_slugs(&git, &settings.mirror_dir, tool, raw).await {
        Ok(slugs) => slugs,
        Err(e) => {
            tracing::debug!(error = %e, "could not list local slugs");
            Vec::new()
        }
    };
    if slugs.is_empty() {
        return Error::InvalidSlug(message);
    }

    let mut message = format!("{message}\nDid you mean one of these?");
    for slug in slugs.iter().take(MAX_SUGGESTIONS) {
        message.push_str("\n    ");
        message.push_str(slug);
    }
    Error::InvalidSlug(message)
}
