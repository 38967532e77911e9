//! Argument structs for each subcommand.

use clap::Args;
use std::path::PathBuf;

/// Arguments for `docstore match`.
#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// Filter document, e.g. '{"age": {"$gte": 18}}'
    #[arg(short, long)]
    pub filter: String,

    /// JSON Lines file to read (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Stop after this many matches
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// Print only the number of matching documents
    #[arg(short, long)]
    pub count: bool,
}

/// Arguments for `docstore check`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Filter document to validate
    #[arg(short, long)]
    pub filter: String,
}
