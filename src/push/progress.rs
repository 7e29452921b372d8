//! Progress callback trait for interface-agnostic updates
//!
//! The CLI drives a spinner from these callbacks; tests record them.

use crate::types::FileSet;
use async_trait::async_trait;

/// Push phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Resolving the slug and reading the configuration
    Connecting,
    /// Establishing who the operator is; may prompt
    Authenticating,
    /// Staging files in the working area
    Preparing,
    /// Committing and pushing
    Uploading,
    /// Push complete
    Complete,
}

impl Phase {
    /// Label shown next to the spinner
    pub const fn label(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Authenticating => "Authenticating",
            Self::Preparing => "Preparing",
            Self::Uploading => "Uploading",
            Self::Complete => "Done",
        }
    }

    /// Whether the operator may be asked something during this phase
    pub const fn is_interactive(self) -> bool {
        matches!(self, Self::Authenticating)
    }
}

/// Progress callback trait
///
/// Implement this trait to receive progress updates during a push.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    /// Called when entering a new phase
    async fn on_phase(&self, phase: Phase);

    /// Called once the file selection is known
    async fn on_files_selected(&self, files: &FileSet);
}

/// No-op progress callback for testing or when progress isn't needed
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_phase(&self, _phase: Phase) {}
    async fn on_files_selected(&self, _files: &FileSet) {}
}
