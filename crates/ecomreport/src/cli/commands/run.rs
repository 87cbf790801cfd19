use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use rusqlite::Connection;

use crate::catalogue::{self, StepId};
use crate::config::RuntimePaths;
use crate::models::{ReportEnvelope, StepRecord};
use crate::store::open_store_read_only;
use crate::utils::time::generated_at_utc_now;

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Run only these steps (repeatable); catalogue order is kept.
    #[arg(long = "step", value_name = "ID")]
    pub steps: Vec<StepId>,

    /// Print the report envelope as JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Skip writing SVG charts.
    #[arg(long, default_value_t = false)]
    pub no_charts: bool,

    /// Table rows printed per step; the JSON artifact keeps every row.
    #[arg(long, default_value_t = 10)]
    pub preview_rows: usize,
}

pub fn run(args: &RunArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    if args.preview_rows == 0 {
        bail!("preview_rows must be greater than zero");
    }

    let connection = open_store_read_only(&runtime_paths.database)?;
    let charts_dir = (!args.no_charts).then(|| runtime_paths.charts_dir());
    let selected = catalogue::select(&args.steps);
    let total = selected.len();
    let mut position = 0usize;

    let envelope = execute_report(
        &connection,
        &args.steps,
        charts_dir.as_deref(),
        &runtime_paths.database.display().to_string(),
        |record| {
            position += 1;
            if !args.json {
                println!("{}", render_step_block(record, position, total, args.preview_rows));
            }
        },
    )?;

    let report_path = runtime_paths.report_json();
    write_report_artifact(&report_path, &envelope)?;

    if args.json {
        let encoded =
            serde_json::to_string(&envelope).context("failed to encode report envelope")?;
        println!("{encoded}");
    } else {
        println!(
            "run: complete steps={} report={}",
            envelope.steps.len(),
            report_path.display()
        );
    }

    Ok(())
}

/// Runs the selected steps in catalogue order over one connection. The first
/// failing step aborts the whole run.
pub fn execute_report(
    connection: &Connection,
    steps: &[StepId],
    charts_dir: Option<&Path>,
    database_label: &str,
    mut on_step: impl FnMut(&StepRecord),
) -> Result<ReportEnvelope> {
    let mut envelope = ReportEnvelope::new(generated_at_utc_now()?, database_label);

    for descriptor in catalogue::select(steps) {
        let timed = catalogue::run_step_timed(connection, descriptor.id)?;
        let chart_path = match (timed.output.chart(), charts_dir) {
            (Some(chart), Some(dir)) => {
                let path = chart_artifact_path(dir, descriptor.id);
                chart.write_svg(&path)?;
                Some(path.display().to_string())
            }
            _ => None,
        };

        let record = StepRecord {
            id: descriptor.id.as_str().to_string(),
            title: descriptor.title.to_string(),
            duration_ms: timed.duration_ms,
            chart_path,
            output: timed.output,
        };
        on_step(&record);
        envelope.push_step(record);
    }

    Ok(envelope)
}

#[must_use]
pub fn chart_artifact_path(charts_dir: &Path, id: StepId) -> PathBuf {
    charts_dir.join(format!("{}.svg", id.as_str()))
}

pub fn write_report_artifact(path: &Path, envelope: &ReportEnvelope) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create report directory: {}", parent.display())
        })?;
    }
    let encoded =
        serde_json::to_string_pretty(envelope).context("failed to encode report artifact")?;
    std::fs::write(path, format!("{encoded}\n"))
        .with_context(|| format!("failed to write report artifact: {}", path.display()))
}

#[must_use]
pub fn render_step_block(
    record: &StepRecord,
    position: usize,
    total: usize,
    preview_rows: usize,
) -> String {
    let mut block = format!(
        "== [{position}/{total}] {}: {}\n{}",
        record.id,
        record.title,
        record.output.render_text(preview_rows)
    );
    if let Some(path) = &record.chart_path {
        block.push_str(&format!("\nchart: {path}"));
    }
    block.push('\n');
    block
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{chart_artifact_path, render_step_block};
    use crate::catalogue::StepId;
    use crate::models::{ScalarSummary, StepOutput, StepRecord};
    use crate::table::Cell;

    #[test]
    fn chart_artifacts_are_named_after_the_step() {
        assert_eq!(
            chart_artifact_path(Path::new("/out/charts"), StepId::CustomersPerState),
            Path::new("/out/charts/customers-per-state.svg")
        );
    }

    #[test]
    fn step_block_has_header_body_and_chart_line() {
        let record = StepRecord {
            id: "orders-2017".to_string(),
            title: "Number of orders placed in 2017".to_string(),
            duration_ms: 1,
            chart_path: Some("/out/charts/x.svg".to_string()),
            output: StepOutput::Scalar {
                scalar: ScalarSummary::new("Number of orders placed in 2017", Cell::Integer(2)),
            },
        };

        let block = render_step_block(&record, 2, 14, 10);
        assert_eq!(
            block,
            "== [2/14] orders-2017: Number of orders placed in 2017\n\
             Number of orders placed in 2017: 2\n\
             chart: /out/charts/x.svg\n"
        );
    }
}
