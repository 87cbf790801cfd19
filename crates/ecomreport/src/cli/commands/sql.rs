use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::store::{fetch_table_capped, open_store_read_only, validate_read_only_sql};

#[derive(Debug, Clone, Args)]
pub struct SqlArgs {
    #[arg(value_name = "SQL")]
    pub sql: String,

    #[arg(long, default_value_t = 1_000)]
    pub row_cap: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &SqlArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    validate_read_only_sql(&args.sql)?;
    if args.row_cap == 0 {
        bail!("row_cap must be greater than zero");
    }

    let connection = open_store_read_only(&runtime_paths.database)?;
    let fetched = fetch_table_capped(&connection, &args.sql, args.row_cap)?;
    tracing::info!(
        rows = fetched.table.len(),
        truncated = fetched.truncated,
        "ad-hoc query finished"
    );

    if args.json {
        let payload = json!({
            "columns": fetched.table.columns(),
            "rows": fetched.table.to_json_rows(),
            "row_count": fetched.table.len(),
            "truncated": fetched.truncated,
            "row_cap": args.row_cap,
        });
        let encoded = serde_json::to_string(&payload).context("failed to encode query rows")?;
        println!("{encoded}");
    } else {
        println!("{}", fetched.table.render_text(args.row_cap));
        if fetched.truncated {
            println!("sql: truncated at row_cap={}", args.row_cap);
        }
    }

    Ok(())
}
