#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use convodec::cli::app::{Cli, Command, RuntimeArgs};
use convodec::cli::commands;
use convodec::config::RuntimePaths;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_VALIDATION_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    let command_name = command_name(&cli.command);

    match execute(cli) {
        Ok(()) => EXIT_SUCCESS,
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            eprintln!("convodec: failed `{command_name}` (exit_code={exit_code})");
            eprintln!("{error:#}");
            exit_code
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Validate(args) => commands::validate::run(&args),
        Command::Clean(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::clean::run(&args, &runtime_paths)
        }
        Command::Report(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::report::run(&args, &runtime_paths)
        }
    }
}

fn resolve_runtime_paths(runtime: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = std::env::var_os("HOME")
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .unwrap_or_else(|| PathBuf::from("/"));
    let cwd = std::env::current_dir()
        .map_err(|error| anyhow!("failed to resolve current directory: {error}"))?;
    convodec::config::resolve_runtime_paths(&home_dir, &cwd, runtime.out_dir.as_deref())
}

const fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Validate(_) => "validate",
        Command::Clean(_) => "clean",
        Command::Report(_) => "report",
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    let kind = error.kind();
    let _ = error.print();
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_SUCCESS,
        _ => EXIT_USAGE_ERROR,
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if error
        .downcast_ref::<commands::validate::ValidationCommandFailure>()
        .is_some()
        || error.downcast_ref::<convodec::error::DecodeError>().is_some()
    {
        EXIT_VALIDATION_FAILURE
    } else {
        EXIT_RUNTIME_FAILURE
    }
}
