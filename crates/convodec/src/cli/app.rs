use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{clean::CleanArgs, report::ReportArgs, validate::ValidateArgs};

#[derive(Debug, Parser)]
#[command(name = "convodec", version, about = "Strict conversation-export decoding")]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Validate(ValidateArgs),
    Clean(CleanArgs),
    Report(ReportArgs),
}
