#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use ecomreport::cli::app::{Cli, Command, RuntimeArgs};
use ecomreport::cli::commands;
use ecomreport::config::RuntimePaths;
use ecomreport::store::SqlGuardrailViolation;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_GUARDRAIL_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    init_tracing();

    let command_name = command_name(&cli.command);
    tracing::info!(command = command_name, "starting");

    match execute(cli) {
        Ok(()) => {
            tracing::info!(command = command_name, exit_code = EXIT_SUCCESS, "completed");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            if let Some(violation) = error.downcast_ref::<SqlGuardrailViolation>() {
                tracing::warn!(details = %violation.details, "statement rejected");
            }
            tracing::error!(command = command_name, exit_code, "failed");
            eprintln!("ecomreport: failed `{command_name}` (exit_code={exit_code})");
            eprintln!("{error:#}");
            exit_code
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::run::run(&args, &runtime_paths)
        }
        Command::List(args) => commands::list::run(&args),
        Command::Sql(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::sql::run(&args, &runtime_paths)
        }
        Command::Init(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::init::run(&args, &runtime_paths)
        }
        Command::Schema(args) => commands::schema::run(&args),
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<SqlGuardrailViolation>().is_some() {
        EXIT_GUARDRAIL_FAILURE
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Run(_) => "run",
        Command::List(_) => "list",
        Command::Sql(_) => "sql",
        Command::Init(_) => "init",
        Command::Schema(_) => "schema",
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    ecomreport::config::resolve_runtime_paths(
        &home_dir,
        &cwd,
        args.out_dir.as_deref(),
        args.database.as_deref(),
    )
}
