use anyhow::Result;
use clap::Args;

use crate::config::RuntimePaths;
use crate::store::{ensure_store_schema, open_store_read_write};

#[derive(Debug, Clone, Args)]
pub struct InitArgs {}

/// Creates any missing store tables. Existing tables and rows are left as
/// they are.
pub fn run(_args: &InitArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let connection = open_store_read_write(&runtime_paths.database)?;
    ensure_store_schema(&connection)?;
    println!(
        "init: store ready database={}",
        runtime_paths.database.display()
    );
    Ok(())
}
