//! Four-phase submission engine
//!
//! Handles the workflow of pushing a directory to a submission repository:
//! 1. Connect - resolve the slug, load the configuration, select files
//! 2. Authenticate - ssh key first, token second
//! 3. Prepare - stage the files in a working area
//! 4. Upload - commit and push
//!
//! Once authenticated, any failure clears cached credentials before it is
//! returned.

mod connect;
mod interrupt;
mod prepare;
mod progress;
mod upload;

pub use connect::{
    config_loader, fetch_config, file_patterns, load_config, remote_settings, select_files,
    Connection,
};
pub use interrupt::{Interrupt, InterruptHandle};
pub use prepare::{not_enabled_message, prepare, Prepared};
pub use progress::{NoopProgress, Phase, ProgressCallback};
pub use upload::{commit_message, is_ref_conflict, upload};

use crate::auth::AuthSession;
use crate::error::{Error, Result};
use crate::files::FileSelector;
use crate::git::Git;
use crate::platform::PlatformService;
use crate::settings::Settings;
use crate::slug::SlugResolver;
use crate::types::{FileSet, PushOutcome, User};
use std::collections::BTreeMap;
use std::env;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

/// Confirmation asked once files are staged; `false` aborts the push
pub type Confirmation =
    dyn Fn(&FileSet) -> Pin<Box<dyn Future<Output = Result<bool>> + Send>> + Send + Sync;

/// One submission
#[derive(Debug, Clone)]
pub struct PushRequest {
    /// Tool whose configuration section applies (`submit50`, ...)
    pub tool: String,
    /// Slug as typed by the operator
    pub slug: String,
    /// Directory whose files are submitted
    pub root: PathBuf,
    /// Submission repository; the operator's login when `None`
    pub repo: Option<String>,
    /// Extra `[key=value]` items for the commit message
    pub data: BTreeMap<String, String>,
}

impl PushRequest {
    /// Request for `tool` and `slug` from `root`
    pub fn new(tool: impl Into<String>, slug: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            slug: slug.into(),
            root: root.into(),
            repo: None,
            data: BTreeMap::new(),
        }
    }
}

/// Drives connect, authenticate, prepare and upload
pub struct PushOrchestrator {
    settings: Settings,
    git: Git,
    resolver: SlugResolver,
    platform: Arc<dyn PlatformService>,
    auth: AuthSession,
    progress: Arc<dyn ProgressCallback>,
    interrupt: Interrupt,
}

impl PushOrchestrator {
    /// Orchestrator over explicit collaborators
    pub fn new(
        settings: Settings,
        resolver: SlugResolver,
        platform: Arc<dyn PlatformService>,
        auth: AuthSession,
    ) -> Self {
        Self {
            git: Git::new(settings.git_timeout),
            settings,
            resolver,
            platform,
            auth,
            progress: Arc::new(NoopProgress),
            interrupt: Interrupt::never(),
        }
    }

    /// Report progress to `progress`
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Use `git` as the base for every git command
    #[must_use]
    pub fn with_git(mut self, git: Git) -> Self {
        self.git = git;
        self
    }

    /// Abandon the push with [`Error::Interrupted`] once `interrupt` fires
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// The authentication session, for logout
    pub const fn auth(&self) -> &AuthSession {
        &self.auth
    }

    /// Phase 1: resolve `slug`, read `tool`'s configuration, select files in `root`
    pub async fn connect(&self, slug: &str, tool: &str, root: &Path) -> Result<Connection> {
        self.progress.on_phase(Phase::Connecting).await;

        let slug = self.resolver.resolve(slug, false).await?;
        let content = fetch_config(self.platform.as_ref(), &slug).await?;
        let config = load_config(&config_loader(tool), &content)?;
        let remote = remote_settings(&config, &self.settings.remote)?;

        // errors name the directory the operator is actually in
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let selector = FileSelector::new(root).with_limit(self.settings.file_limit);
        let files = select_files(&selector, &config)?;
        tracing::info!(
            slug = %slug,
            included = files.included.len(),
            excluded = files.excluded.len(),
            "connected"
        );
        self.progress.on_files_selected(&files).await;

        Ok(Connection {
            slug,
            remote,
            files,
        })
    }

    /// Phase 2: authenticate against `org`
    pub async fn authenticate(&self, org: &str, repo: Option<&str>) -> Result<User> {
        self.progress.on_phase(Phase::Authenticating).await;
        self.auth.authenticate(org, repo).await
    }

    /// Run every phase for `request`.
    ///
    /// `confirm` sees the selection after staging; declining is
    /// [`Error::RejectedPrompt`].
    pub async fn push(
        &self,
        request: &PushRequest,
        confirm: Option<&Confirmation>,
    ) -> Result<PushOutcome> {
        let mut data = request.data.clone();
        if let Ok(language) = env::var("LANGUAGE") {
            if !language.is_empty() {
                data.entry("lang".to_string()).or_insert(language);
            }
        }

        // a malformed slug is reported before anything touches git or the network
        crate::slug::split(&request.slug)?;
        self.interruptible(crate::git::check_dependencies(&self.git))
            .await?;

        let connection = self
            .interruptible(self.connect(&request.slug, &request.tool, &request.root))
            .await?;
        let user = match self
            .interruptible(self.authenticate(&connection.remote.org, request.repo.as_deref()))
            .await
        {
            Ok(user) => user,
            Err(Error::Interrupted) => {
                // a token may already be cached
                self.auth.forget().await;
                return Err(Error::Interrupted);
            }
            Err(e) => return Err(e),
        };

        // dropping the submit future removes its working area
        let result = self
            .interruptible(self.submit(request, &connection, &user, &data, confirm))
            .await;
        let (username, commit_hash) = self.auth.finish(&user, result).await?;

        self.progress.on_phase(Phase::Complete).await;
        let slug = &connection.slug.raw;
        Ok(PushOutcome {
            message: connection.remote.render_message(&username, slug),
            username,
            commit_hash,
        })
    }

    async fn interruptible<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.interrupt.wait() => Err(Error::Interrupted),
            result = work => result,
        }
    }

    async fn submit(
        &self,
        request: &PushRequest,
        connection: &Connection,
        user: &User,
        data: &BTreeMap<String, String>,
        confirm: Option<&Confirmation>,
    ) -> Result<(String, String)> {
        let branch = &connection.slug.raw;

        self.progress.on_phase(Phase::Preparing).await;
        let prepared = prepare(
            &self.settings,
            &self.git,
            &request.tool,
            branch,
            user,
            &request.root,
            &connection.files.included,
        )
        .await?;

        if let Some(confirm) = confirm {
            if !confirm(&connection.files).await? {
                return Err(Error::RejectedPrompt("No files were submitted.".to_string()));
            }
        }

        self.progress.on_phase(Phase::Uploading).await;
        let uploaded = upload(&prepared, branch, user, &request.tool, data).await?;
        tracing::info!(commit = %uploaded.1, "pushed");
        Ok(uploaded)
    }
}
