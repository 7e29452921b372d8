//! Logout command - forget cached credentials

use crate::cli::style::check;
use anstream::println;
use handin::auth::{credential_cache, CredentialStore};
use handin::error::Result;
use handin::settings::Settings;

/// Run the logout command
pub async fn run_logout() -> Result<()> {
    let settings = Settings::from_env();
    credential_cache(&settings).logout().await?;
    println!("{} Logged out", check());
    Ok(())
}
