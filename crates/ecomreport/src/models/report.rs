use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chart::BarChart;
use crate::table::{Cell, LabeledTable};

pub const REPORT_SCHEMA_VERSION: &str = "ecomreport.report.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    Table,
    Scalar,
    Chart,
}

impl OutputMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Scalar => "scalar",
            Self::Chart => "chart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScalarSummary {
    pub label: String,
    pub value: Cell,
}

impl ScalarSummary {
    #[must_use]
    pub fn new(label: impl Into<String>, value: Cell) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// What one catalogue step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StepOutput {
    Table {
        table: LabeledTable,
    },
    Scalar {
        scalar: ScalarSummary,
    },
    Chart {
        table: LabeledTable,
        chart: BarChart,
    },
}

impl StepOutput {
    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        match self {
            Self::Table { .. } => OutputMode::Table,
            Self::Scalar { .. } => OutputMode::Scalar,
            Self::Chart { .. } => OutputMode::Chart,
        }
    }

    #[must_use]
    pub fn table(&self) -> Option<&LabeledTable> {
        match self {
            Self::Table { table } | Self::Chart { table, .. } => Some(table),
            Self::Scalar { .. } => None,
        }
    }

    #[must_use]
    pub fn scalar(&self) -> Option<&ScalarSummary> {
        match self {
            Self::Scalar { scalar } => Some(scalar),
            _ => None,
        }
    }

    #[must_use]
    pub fn chart(&self) -> Option<&BarChart> {
        match self {
            Self::Chart { chart, .. } => Some(chart),
            _ => None,
        }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.table().map_or(1, LabeledTable::len)
    }

    #[must_use]
    pub fn render_text(&self, preview_rows: usize) -> String {
        match self {
            Self::Table { table } => table.render_text(preview_rows),
            Self::Scalar { scalar } => format!("{}: {}", scalar.label, scalar.value.display()),
            Self::Chart { table, chart } => format!(
                "{}\n\n{}",
                table.render_text(preview_rows),
                chart.render_text()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepRecord {
    pub id: String,
    pub title: String,
    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_path: Option<String>,

    pub output: StepOutput,
}

/// Serialized record of one report run, written to `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportEnvelope {
    pub schema_version: String,
    pub generated_at_utc: String,
    pub database: String,
    pub steps: Vec<StepRecord>,
}

impl ReportEnvelope {
    #[must_use]
    pub fn new(generated_at_utc: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at_utc: generated_at_utc.into(),
            database: database.into(),
            steps: Vec::new(),
        }
    }

    pub fn push_step(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    #[must_use]
    pub fn step(&self, id: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|record| record.id == id)
    }
}

#[must_use]
pub fn json_schema() -> Value {
    let schema = schemars::schema_for!(ReportEnvelope);
    match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(error) => {
            panic!("failed to serialize generated report schema: {error}");
        }
    }
}
