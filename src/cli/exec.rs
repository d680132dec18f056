//! Exec-config subcommand for contest-env CLI

use clap::Args;

/// Arguments for the exec-config subcommand
#[derive(Args, Debug)]
pub struct ExecConfigArgs {
    /// Contest name, e.g. abc300
    #[arg(long)]
    pub contest: String,

    /// Problem name, e.g. a
    #[arg(long)]
    pub problem: String,

    /// Environment type
    #[arg(long, default_value = "local")]
    pub env_type: String,

    /// Command type
    #[arg(long = "command", default_value = "run")]
    pub command_type: String,

    /// Instead of the config, print this template filled with its values
    #[arg(long)]
    pub template: Option<String>,
}
