//! Local command - keep a local copy of a problem repository

use crate::cli::style::{check, Stylize};
use crate::cli::suggest::with_suggestions;
use anstream::println;
use handin::error::Result;
use handin::git::{check_dependencies, Git};
use handin::settings::Settings;
use handin::slug::{self, Mirror, SlugResolver};

/// Run the local command
pub async fn run_local(raw: &str, tool: &str, offline: bool) -> Result<()> {
    // shape errors need neither git nor the network
    slug::split(raw)?;

    let settings = Settings::from_env();
    let git = Git::new(settings.git_timeout);
    check_dependencies(&git).await?;

    let mirror = Mirror::new(git, settings.mirror_dir.clone(), settings.host.clone());
    let synced = async {
        let slug = SlugResolver::from_settings(&settings)
            .resolve(raw, offline)
            .await?;
        mirror.sync(&slug, offline).await
    };
    let path = match synced.await {
        Ok(path) => path,
        Err(e) => return Err(with_suggestions(&settings, tool, raw, e).await),
    };

    println!("{} {}", check(), path.display().accent());
    Ok(())
}
