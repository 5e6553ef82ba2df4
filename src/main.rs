//! docmend CLI
//!
//! Reference integrity toolkit for markdown documentation trees.
//! Logs go to stderr; machine-readable results go to stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docmend::check_links::{run_check_links, CheckLinksArgs};
use docmend::fix::{run_anchors, run_fix, AnchorsArgs, FixArgs};
use docmend::nav::{run_nav, NavArgs};
use docmend::scan::{run_scan, ScanArgs};
use docmend::serve::{run_serve, ServeArgs};
use docmend::templates::{run_template, TemplateArgs};

#[derive(Parser)]
#[command(name = "docmend")]
#[command(author = "RoyalBit Inc.")]
#[command(version)]
#[command(about = "Reference integrity toolkit for markdown documentation trees")]
#[command(long_about = "Finds broken links, normalizes heading anchors, creates stubs for missing documents and rebuilds site navigation.\n\nCommands:\n  scan          Report every proposed change as JSON\n  check-links   Report references to missing documents\n  anchors       Normalize heading anchors\n  fix           Scan, confirm and apply fixes\n  template      Synthesize a stub document\n  nav           Rebuild the manifest navigation\n  serve         Fix cycle, then the site server")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the tree and print the issue report as JSON
    Scan(ScanArgs),
    /// Report references to documents that do not exist
    CheckLinks(CheckLinksArgs),
    /// Normalize heading anchors to the {: #id} form
    Anchors(AnchorsArgs),
    /// Scan, report, confirm and apply fixes
    Fix(FixArgs),
    /// Synthesize starter content for a missing document
    Template(TemplateArgs),
    /// Rebuild the navigation of the site manifest
    Nav(NavArgs),
    /// Run the fix cycle, then the site server
    Serve(ServeArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(args) => run_scan(args).await,
        Commands::CheckLinks(args) => run_check_links(args).await,
        Commands::Anchors(args) => run_anchors(args).await,
        Commands::Fix(args) => run_fix(args).await,
        Commands::Template(args) => run_template(args).await,
        Commands::Nav(args) => run_nav(args).await,
        Commands::Serve(args) => run_serve(args).await,
    }
}
