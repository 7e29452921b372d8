//! Submit command - push a directory to the operator's submission repository

use crate::cli::progress::CliProgress;
use crate::cli::style::{check, linkify, Stream, Stylize};
use crate::cli::suggest::with_suggestions;
use anstream::println;
use handin::auth::{AuthSession, Prompter, TerminalPrompter};
use handin::error::Result;
use handin::platform::{GitHubService, PlatformService};
use handin::push::{Confirmation, Interrupt, PushOrchestrator, PushRequest};
use handin::settings::Settings;
use handin::slug::SlugResolver;
use handin::types::FileSet;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Options for `handin submit`
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Slug to submit to
    pub slug: String,
    /// Tool whose configuration applies
    pub tool: String,
    /// Submission repository override
    pub repo: Option<String>,
    /// Skip the confirmation
    pub yes: bool,
    /// Directory to submit
    pub path: PathBuf,
}

const HONESTY: &str = "Keeping in mind the course's policy on academic honesty, \
                       are you sure you want to submit these files?";

/// Run the submit command
pub async fn run_submit(options: SubmitOptions) -> Result<()> {
    let settings = Settings::from_env();
    let platform: Arc<dyn PlatformService> = Arc::new(GitHubService::new(&settings));
    let prompter = Arc::new(TerminalPrompter);
    let auth = AuthSession::from_settings(&settings, Arc::clone(&platform), prompter.clone())?;
    let progress = Arc::new(CliProgress::new());

    let orchestrator = PushOrchestrator::new(
        settings.clone(),
        SlugResolver::from_settings(&settings),
        platform,
        auth,
    )
    .with_progress(progress.clone())
    .with_interrupt(Interrupt::ctrl_c());

    let mut request = PushRequest::new(options.tool, options.slug, options.path);
    request.repo = options.repo;

    let yes = options.yes;
    let spinner = Arc::clone(&progress);
    let ask = move |_files: &FileSet| {
        let spinner = Arc::clone(&spinner);
        let prompter = Arc::clone(&prompter);
        Box::pin(async move {
            if yes {
                return Ok(true);
            }
            // the spinner would draw over the question
            spinner.stop();
            prompter.confirm(HONESTY, false).await
        }) as Pin<Box<dyn Future<Output = Result<bool>> + Send>>
    };
    let confirm: &Confirmation = &ask;

    let result = orchestrator.push(&request, Some(confirm)).await;
    progress.stop();
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => return Err(with_suggestions(&settings, &request.tool, &request.slug, e).await),
    };

    println!(
        "{} Submitted {} as {}",
        check(),
        request.slug.accent(),
        outcome.username.emphasis()
    );
    println!("  {}", format!("commit {}", outcome.commit_hash).muted());
    println!("{}", linkify(Stream::Stdout, &outcome.message));
    Ok(())
}
