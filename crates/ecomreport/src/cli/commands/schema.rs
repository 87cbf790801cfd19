use anyhow::{Context, Result};
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {}

pub fn run(_args: &SchemaArgs) -> Result<()> {
    let schema = crate::models::json_schema();
    let encoded =
        serde_json::to_string_pretty(&schema).context("failed to encode report schema")?;
    println!("{encoded}");
    Ok(())
}
