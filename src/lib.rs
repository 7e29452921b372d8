//! handin - submit coursework to GitHub-hosted course repositories
//!
//! A submission is named by a slug, `org/repo/branch/problem`. The problem's
//! configuration file decides which local files are sent; the operator is
//! authenticated with an ssh key or a personal access token; the files are
//! committed on a branch named after the slug and pushed.
//!
//! The pipeline lives in [`push::PushOrchestrator`]. Its pieces can be used
//! on their own:
//!
//! - [`slug::SlugResolver`] splits a slug at a real branch
//! - [`config::ConfigLoader`] reads a tool's tagged configuration section
//! - [`files::FileSelector`] applies include/exclude/require patterns
//! - [`auth::AuthSession`] authenticates and tears sessions down

pub mod auth;
pub mod config;
pub mod error;
pub mod files;
pub mod git;
pub mod platform;
pub mod process;
pub mod push;
pub mod settings;
pub mod slug;
pub mod types;

pub use error::{Error, Result};
