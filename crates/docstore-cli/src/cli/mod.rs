//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `match`: print the JSON Lines documents a filter matches
//! - `check`: validate a filter and list the operators it uses
//!
//! # Global Flags
//!
//! - `--config <FILE>`: YAML store configuration
//! - `--json`: Output in JSON format
//!
//! # Example
//!
//! ```bash
//! docstore match --filter '{"age": {"$gte": 18}}' --input people.jsonl
//! cat people.jsonl | docstore match -f '{"tags": {"$size": 0}}' --count
//! docstore check --filter '{"$or": [{"a": 1}, {"b": {"$regex": "x"}}]}'
//! ```

mod args;
mod execute;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docstore::StoreConfig;
use std::path::PathBuf;

pub use args::{CheckArgs, MatchArgs};

use crate::output::OutputMode;

/// Docstore - evaluate MongoDB-style filters over JSON documents
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML store configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the documents a filter matches
    ///
    /// Reads one JSON document per line from --input or stdin. Blank lines
    /// are skipped; an invalid line aborts with its line number.
    Match(MatchArgs),

    /// Validate a filter and list its operators
    ///
    /// Fails when the filter uses an operator the store does not know.
    Check(CheckArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Execute the CLI command
    pub fn execute(&self) -> Result<()> {
        let mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        let config = self.store_config()?;

        match &self.command {
            Commands::Match(args) => execute::execute_match(args, &config, mode),
            Commands::Check(args) => execute::execute_check(args, mode),
        }
    }

    fn store_config(&self) -> Result<StoreConfig> {
        match &self.config {
            Some(path) => StoreConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display())),
            None => Ok(StoreConfig::default()),
        }
    }
}
