//! Shared CLI progress callback with a phase spinner

use crate::cli::style::{skip, spinner_style, Stylize};
use anstream::println;
use async_trait::async_trait;
use handin::push::{Phase, ProgressCallback};
use handin::types::FileSet;
use indicatif::ProgressBar;
use std::sync::Mutex;
use std::time::Duration;

/// Spinner per phase; stopped whenever the operator may be asked something
#[derive(Default)]
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Progress with no spinner running yet
    pub fn new() -> Self {
        Self::default()
    }

    fn start(&self, label: &'static str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(label);
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(old) = slot.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    /// Stop and clear the spinner, if one is running
    pub fn stop(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }
    }

    /// Run `f` with the spinner hidden, so it can print or prompt
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        let bar = self.spinner.lock().ok().and_then(|slot| slot.clone());
        match bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_phase(&self, phase: Phase) {
        if phase.is_interactive() || phase == Phase::Complete {
            self.stop();
        } else {
            self.start(phase.label());
        }
    }

    async fn on_files_selected(&self, files: &FileSet) {
        self.suspend(|| {
            println!("{}", "Files that will be submitted:".emphasis());
            for file in &files.included {
                println!("  {} {}", "./".muted(), file.accent());
            }
            if !files.excluded.is_empty() {
                println!("{}", "Files that won't be submitted:".emphasis());
                for file in &files.excluded {
                    println!("  {} {}", skip(), file.muted());
                }
            }
        });
    }
}
