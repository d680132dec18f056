//! CLI command definitions for contest-env
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod exec;
pub mod format;

use clap::{Parser, Subcommand, ValueEnum};
use exec::ExecConfigArgs;
use format::FormatArgs;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON
    Json,
}

/// Competitive-programming environment config tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// System config directory (overrides CONTEST_ENV_SYSTEM_DIR)
    #[arg(long, global = true)]
    pub system_dir: Option<String>,

    /// Contest env directory (overrides CONTEST_ENV_ENV_DIR)
    #[arg(long, global = true)]
    pub env_dir: Option<String>,

    /// Language whose env.json is merged (overrides CONTEST_ENV_LANGUAGE)
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    /// JSON or YAML file of runtime values merged over every tier
    #[arg(long, value_name = "FILE", global = true)]
    pub runtime: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a config path and print the best match
    Resolve {
        /// Path segments, e.g. `python commands run steps`
        #[arg(required = true)]
        path: Vec<String>,

        /// Print every ranked match instead of only the best
        #[arg(long)]
        all: bool,
    },

    /// Interpolate a `{key}` template against the config
    Format(FormatArgs),

    /// List languages that have an env.json
    Languages,

    /// Show the execution config for a problem
    ExecConfig(ExecConfigArgs),

    /// Show the workflow steps of a command for the selected language
    Steps {
        /// Command name, e.g. `run` or `test`
        command: String,
    },

    /// Validate the config tree and print its metrics
    Check,
}
