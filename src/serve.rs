//! serve command: Optional fix cycle, then the site server
//!
//! The manifest must exist before anything else runs. The server command is
//! run as a child process with inherited stdio.

use crate::config::{CommonArgs, Settings};
use crate::error::DocError;
use crate::fix::{run_cycle, CycleOptions, Prompt};
use crate::templates::TemplateSource;
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Site manifest passed to the server
    #[arg(long, env = "DOCMEND_MANIFEST", default_value = "mkdocs.yml")]
    pub manifest: PathBuf,

    /// Run the scan and fix cycle before serving
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub scan: bool,

    /// Answer yes to every prompt of the fix cycle
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Server command line (default: mkdocs serve -f <manifest>)
    #[arg(long)]
    pub command: Option<String>,

    /// Directory holding <kind>.md templates for missing targets
    #[arg(long, env = "DOCMEND_TEMPLATES")]
    pub templates: Option<PathBuf>,
}

/// Program and arguments of the server command.
pub fn server_command(command: Option<&str>, manifest: &Path) -> Vec<String> {
    match command {
        Some(line) => line.split_whitespace().map(str::to_string).collect(),
        None => vec![
            "mkdocs".to_string(),
            "serve".to_string(),
            "-f".to_string(),
            manifest.display().to_string(),
        ],
    }
}

/// Run the serve command
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    if !args.manifest.is_file() {
        return Err(DocError::MissingManifest(args.manifest.clone()).into());
    }
    let settings = Settings::from_args(&args.common)?;

    if args.scan {
        eprintln!("Checking documentation under {}...", settings.root.display());
        let options = CycleOptions {
            assume_yes: args.yes,
            templates: TemplateSource::from_option(args.templates.clone()),
            ..CycleOptions::default()
        };
        let summary = run_cycle(&settings, &options, &mut Prompt::terminal()).await?;
        eprintln!(
            "Fixes: {} edits applied, {} files created",
            summary.applied_edits,
            summary.created.len()
        );
    }

    let argv = server_command(args.command.as_deref(), &args.manifest);
    let Some((program, rest)) = argv.split_first() else {
        bail!("Empty server command");
    };

    info!(command = %argv.join(" "), "starting site server");
    let status = Command::new(program)
        .args(rest)
        .status()
        .await
        .with_context(|| format!("Failed to start {}", program))?;

    if !status.success() {
        bail!("{} exited with {}", program, status);
    }
    Ok(())
}
