//! CLI commands
//!
//! Command implementations for the `handin` binary.

mod local;
mod logout;
pub mod progress;
pub mod style;
mod submit;
mod suggest;

pub use local::run_local;
pub use logout::run_logout;
pub use submit::{run_submit, SubmitOptions};
