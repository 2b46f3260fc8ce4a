//! CLI argument structs for all commands.

use crate::domain::{NullsOrder, OccurrenceSort, SortDirection, SortField};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `ingest` command
#[derive(Parser, Debug, Clone)]
pub struct IngestArgs {
    /// JSONL file with one scan entry per line
    pub file: PathBuf,

    /// Project the scan belongs to
    #[arg(short, long)]
    pub project: u64,

    /// Scan source (lockfile, image, ...); re-ingesting a source replaces it
    #[arg(short, long, default_value = "1")]
    pub source: u64,

    /// Commit SHA the scan ran against
    #[arg(short, long, value_parser = validate_commit_sha)]
    pub commit: String,

    /// Organization owning the component namespace
    #[arg(short, long, default_value = "1")]
    pub organization: u64,
}

/// Arguments for the `resolve` command
#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    /// Occurrence id to explain
    pub occurrence: u64,

    /// Project the occurrence belongs to
    #[arg(short, long)]
    pub project: u64,
}

/// Arguments for the `reachable` command
#[derive(Parser, Debug, Clone)]
pub struct ReachableArgs {
    /// Upstream occurrence id
    pub ancestor: u64,

    /// Downstream occurrence id
    pub descendant: u64,
}

/// Sort keys accepted by `list --sort`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortFieldArg {
    /// Component name
    Name,
    /// Package manager
    PackageManager,
    /// Highest vulnerability severity
    Severity,
    /// First license identifier
    License,
}

impl From<SortFieldArg> for SortField {
    fn from(arg: SortFieldArg) -> Self {
        match arg {
            SortFieldArg::Name => SortField::Name,
            SortFieldArg::PackageManager => SortField::PackageManager,
            SortFieldArg::Severity => SortField::Severity,
            SortFieldArg::License => SortField::License,
        }
    }
}

/// Arguments for the `list` command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Filter by project
    #[arg(short, long)]
    pub project: Option<u64>,

    /// Filter by scan source
    #[arg(short, long)]
    pub source: Option<u64>,

    /// Case-insensitive substring of the component name
    #[arg(long)]
    pub name: Option<String>,

    /// Package managers (comma-separated)
    #[arg(long = "package-manager", value_delimiter = ',')]
    pub package_managers: Vec<String>,

    /// SPDX license identifiers (comma-separated); "unknown" matches no license
    #[arg(short, long = "license", value_delimiter = ',')]
    pub licenses: Vec<String>,

    /// Maximum number of occurrences to display
    #[arg(short = 'n', long, default_value = "50")]
    pub limit: usize,

    /// Sort key
    #[arg(long, value_enum, default_value = "name")]
    pub sort: SortFieldArg,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Put rows without the sort key first
    #[arg(long)]
    pub nulls_first: bool,
}

impl ListArgs {
    /// The ordering these arguments select
    pub fn sort(&self) -> OccurrenceSort {
        OccurrenceSort::by(self.sort.into())
            .direction(if self.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            })
            .nulls(if self.nulls_first {
                NullsOrder::First
            } else {
                NullsOrder::Last
            })
    }
}

/// Arguments for the `search` command
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Case-insensitive substring of the component name
    pub query: String,

    /// Organization to search in
    #[arg(short, long, default_value = "1")]
    pub organization: u64,

    /// Maximum number of components to display
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Arguments for the `rebuild` command
#[derive(Parser, Debug, Clone)]
pub struct RebuildArgs {
    /// Project to rebuild; every project if omitted
    #[arg(short, long)]
    pub project: Option<u64>,
}

/// Validate a commit SHA: non-empty hexadecimal.
pub fn validate_commit_sha(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Commit SHA cannot be empty".to_string());
    }
    if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("Commit SHA must be hexadecimal, got '{trimmed}'"));
    }
    Ok(trimmed.to_string())
}
