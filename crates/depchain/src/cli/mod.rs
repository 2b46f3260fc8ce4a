//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new depchain repository
//! - `ingest`: Ingest a JSONL scan file for a project and source
//! - `resolve`: Show every dependency path that pulled an occurrence in
//! - `reachable`: Look up the closure distance between two occurrences
//! - `list`: List occurrences with filters and sorting
//! - `search`: Search registered components by name
//! - `rebuild`: Re-derive closure indexes from stored occurrences
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! depchain ingest scan.jsonl --project 1 --source 2 --commit c0ffee
//! depchain resolve 17 --project 1
//! depchain list --project 1 --license unknown --sort severity --desc
//! ```

mod args;
mod execute;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{
    validate_commit_sha, IngestArgs, InitArgs, ListArgs, ReachableArgs, RebuildArgs, ResolveArgs,
    SearchArgs, SortFieldArg,
};

/// depchain - dependency path analysis for SBOM scans
///
/// Stores scanned components and their ancestry, and explains how each
/// component ended up in a project.
#[derive(Parser, Debug)]
#[command(name = "depchain")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new depchain repository
    ///
    /// Creates the `.depchain/` directory with configuration and an empty snapshot.
    Init(InitArgs),

    /// Ingest a scan file
    ///
    /// Replaces everything the same source previously reported for the
    /// project, then updates the closure index.
    Ingest(IngestArgs),

    /// Show the dependency paths to an occurrence
    Resolve(ResolveArgs),

    /// Check whether one occurrence is upstream of another
    Reachable(ReachableArgs),

    /// List occurrences
    List(ListArgs),

    /// Search components by name
    Search(SearchArgs),

    /// Rebuild closure indexes
    Rebuild(RebuildArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("depchain dependency path analysis");
            println!("Use --help for more information");
            return Ok(());
        };

        if let Commands::Init(args) = command {
            return execute::execute_init(args).await;
        }

        let app = App::from_directory(&std::env::current_dir()?).await?;
        match command {
            Commands::Init(_) => Ok(()),
            Commands::Ingest(args) => execute::execute_ingest(&app, args, output_mode).await,
            Commands::Resolve(args) => execute::execute_resolve(&app, args, output_mode).await,
            Commands::Reachable(args) => execute::execute_reachable(&app, args, output_mode).await,
            Commands::List(args) => execute::execute_list(&app, args, output_mode).await,
            Commands::Search(args) => execute::execute_search(&app, args, output_mode).await,
            Commands::Rebuild(args) => execute::execute_rebuild(&app, args, output_mode).await,
        }
    }
}
