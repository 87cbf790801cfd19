use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DATABASE_ENV_VAR;

use super::commands::{
    init::InitArgs, list::ListArgs, run::RunArgs, schema::SchemaArgs, sql::SqlArgs,
};

#[derive(Debug, Parser)]
#[command(
    name = "ecomreport",
    version,
    about = "Analytical reports over the e-commerce order store"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,

    /// SQLite database holding the order store.
    #[arg(long, global = true, value_name = "PATH", env = DATABASE_ENV_VAR)]
    pub database: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the report catalogue, or selected steps of it, in order.
    Run(RunArgs),
    /// List the catalogue steps.
    List(ListArgs),
    /// Run one ad-hoc read-only statement.
    Sql(SqlArgs),
    /// Create the store tables in an empty database.
    Init(InitArgs),
    /// Print the JSON schema of the report artifact.
    Schema(SchemaArgs),
}
