//! handin - submit coursework to GitHub
//!
//! CLI binary over the `handin` library.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

mod cli;

use cli::style::{cross, Stylize};

#[derive(Parser)]
#[command(name = "handin")]
#[command(about = "Submit coursework to a GitHub-hosted course repository")]
#[command(version)]
struct Cli {
    /// Log every git command and HTTP request
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit the files in a directory
    Submit {
        /// Slug, e.g. cs50/problems/2024/x/hello
        slug: String,

        /// Tool whose configuration section applies
        #[arg(long, default_value = "submit50")]
        tool: String,

        /// Submission repository (defaults to your GitHub login)
        #[arg(long)]
        repo: Option<String>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Directory to submit (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Create or update the local copy of a problem
    Local {
        /// Slug, e.g. cs50/problems/2024/x/hello
        slug: String,

        /// Tool whose problems are suggested when the slug is wrong
        #[arg(long, default_value = "submit50")]
        tool: String,

        /// Use only what was fetched before
        #[arg(long)]
        offline: bool,
    },

    /// Forget cached GitHub credentials
    Logout,
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Submit {
            slug,
            tool,
            repo,
            yes,
            path,
        } => {
            cli::run_submit(cli::SubmitOptions {
                slug,
                tool,
                repo,
                yes,
                path: path.unwrap_or_else(|| PathBuf::from(".")),
            })
            .await?;
        }
        Commands::Local {
            slug,
            tool,
            offline,
        } => cli::run_local(&slug, &tool, offline).await?,
        Commands::Logout => cli::run_logout().await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // stderr, so logs never mix with command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
            }),
        )
        .init();

    if let Err(e) = run(cli).await {
        anstream::eprintln!("{} {}", cross(), e.to_string().error());

        let err = e.downcast_ref::<handin::error::Error>();
        if matches!(err, Some(handin::error::Error::Interrupted)) {
            restore_terminal();
        }
        process::exit(err.map_or(1, handin::error::Error::exit_code));
    }
}

/// Undo what an abandoned prompt may have left behind: hidden cursor, no echo
fn restore_terminal() {
    let term = dialoguer::console::Term::stderr();
    if !term.is_term() {
        return;
    }
    let _ = term.show_cursor();
    #[cfg(unix)]
    {
        let _ = process::Command::new("stty")
            .arg("echo")
            .stdin(process::Stdio::inherit())
            .status();
    }
}
