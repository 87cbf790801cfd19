use std::cmp::Ordering;

use anyhow::{Result, anyhow, bail};
use rusqlite::types::Value as SqlValue;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// One scalar from a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Real(value) => Some(*value),
            Self::Text(value) => value.trim().parse::<f64>().ok(),
            Self::Null => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Real(value) if value.fract() == 0.0 => Some(*value as i64),
            Self::Text(value) => value.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) if value.is_finite() && value.fract() == 0.0 => {
                format!("{value:.1}")
            }
            Self::Real(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(value) => json!(value),
            Self::Real(value) => json!(value),
            Self::Text(value) => json!(value),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            (Self::Text(left), Self::Text(right)) => left.cmp(right),
            (left, right) => match (left.as_f64(), right.as_f64()) {
                (Some(left), Some(right)) => left.total_cmp(&right),
                _ => left.display().cmp(&right.display()),
            },
        }
    }
}

impl From<SqlValue> for Cell {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Null,
            SqlValue::Integer(value) => Self::Integer(value),
            SqlValue::Real(value) => Self::Real(value),
            SqlValue::Text(value) => Self::Text(value),
            SqlValue::Blob(bytes) => Self::Text(encode_blob_hex(&bytes)),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

/// Result rows with their column labels. Every row has one cell per label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LabeledTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl LabeledTable {
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "row arity {} does not match column count {}",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, label: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column == label)
            .ok_or_else(|| anyhow!("unknown column `{label}`"))
    }

    pub fn column(&self, label: &str) -> Result<Vec<&Cell>> {
        let index = self.column_index(label)?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn numeric_column(&self, label: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.column(label)?.into_iter().map(Cell::as_f64).collect())
    }

    pub fn text_column(&self, label: &str) -> Result<Vec<String>> {
        Ok(self.column(label)?.into_iter().map(Cell::display).collect())
    }

    /// First cell of the first row, the shape of every scalar query.
    pub fn scalar(&self) -> Result<&Cell> {
        self.rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| anyhow!("scalar query returned no rows"))
    }

    /// Stable sort on one column. Nulls sort last in both directions.
    pub fn sort_by_column(mut self, label: &str, descending: bool) -> Result<Self> {
        let index = self.column_index(label)?;
        self.rows.sort_by(|left, right| {
            let (left, right) = (&left[index], &right[index]);
            match (left.is_null(), right.is_null()) {
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                _ if descending => right.compare(left),
                _ => left.compare(right),
            }
        });
        Ok(self)
    }

    #[must_use]
    pub fn head(mut self, count: usize) -> Self {
        self.rows.truncate(count);
        self
    }

    #[must_use]
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (column, cell) in self.columns.iter().zip(row) {
                    record.insert(column.clone(), cell.to_json());
                }
                Value::Object(record)
            })
            .collect()
    }

    #[must_use]
    pub fn render_text(&self, max_rows: usize) -> String {
        let shown = self.rows.len().min(max_rows);
        let rendered_rows = self.rows[..shown]
            .iter()
            .map(|row| row.iter().map(Cell::display).collect::<Vec<_>>())
            .collect::<Vec<_>>();

        let mut widths = self
            .columns
            .iter()
            .map(|column| column.chars().count())
            .collect::<Vec<_>>();
        for row in &rendered_rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.chars().count());
            }
        }

        let mut lines = Vec::with_capacity(shown + 3);
        lines.push(format_line(&self.columns, &widths));
        lines.push(
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &rendered_rows {
            lines.push(format_line(row, &widths));
        }
        if self.rows.len() > shown {
            lines.push(format!("... {} more rows", self.rows.len() - shown));
        }
        lines.push(format!("({} rows)", self.rows.len()));

        lines.join("\n")
    }
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(value, width)| format!("{value:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}
