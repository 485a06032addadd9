use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use picklistctl::cmd_check;
use picklistctl::cmd_sort;

#[derive(Parser, Debug)]
#[command(
    name = "picklistctl",
    version,
    about = "Check and sort dependent picklist valueSettings in Custom Object files"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Output JSON where applicable
    #[arg(long)]
    json: bool,
    /// Process files even if they do not look like Custom Object files
    #[arg(long)]
    all: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Report files with unsorted dependent picklists
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Sort dependent picklist valueSettings
    Sort {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Replace the file content instead of printing the sorted text
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let Cli {
        verbose,
        json,
        all,
        cmd,
    } = Cli::parse();

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()),
        ))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cmd {
        Cmd::Check { paths } => cmd_check::run(paths, all, json)?,
        Cmd::Sort { paths, write } => cmd_sort::run(paths, all, write, json)?,
    };

    Ok(())
}
