use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::table::LabeledTable;

const PALETTE: &[&str] = &[
    "#e24a33", "#348abd", "#988ed5", "#777777", "#fbc15e", "#8eba42", "#ffb5b8",
];
const TEXT_BAR_WIDTH: usize = 40;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const LEGEND_WIDTH: f64 = 160.0;
const PLOT_HEIGHT: f64 = 300.0;
const MIN_PLOT_WIDTH: f64 = 240.0;
const Y_TICKS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// Bar chart over string categories. Each series carries one value per
/// category; more than one series renders as grouped bars with a legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
    pub tick_rotation_degrees: u16,
    pub value_labels: bool,
}

impl BarChart {
    pub fn single(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        categories: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if categories.len() != values.len() {
            bail!(
                "bar chart has {} categories but {} values",
                categories.len(),
                values.len()
            );
        }
        let y_label = y_label.into();

        Ok(Self {
            title: title.into(),
            x_label: x_label.into(),
            series: vec![BarSeries {
                name: y_label.clone(),
                values,
            }],
            y_label,
            categories,
            tick_rotation_degrees: 0,
            value_labels: false,
        })
    }

    /// Builds one series per distinct group from `(category, group, value)`
    /// triples. Categories and groups keep first-seen order; a category
    /// missing from a group plots as zero.
    #[must_use]
    pub fn grouped(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        points: &[(String, String, f64)],
    ) -> Self {
        let mut categories: Vec<String> = Vec::new();
        let mut groups: Vec<String> = Vec::new();
        for (category, group, _) in points {
            if !categories.contains(category) {
                categories.push(category.clone());
            }
            if !groups.contains(group) {
                groups.push(group.clone());
            }
        }

        let series = groups
            .iter()
            .map(|group| {
                let values = categories
                    .iter()
                    .map(|category| {
                        points
                            .iter()
                            .filter(|(c, g, _)| c == category && g == group)
                            .map(|(_, _, value)| *value)
                            .sum()
                    })
                    .collect();
                BarSeries {
                    name: group.clone(),
                    values,
                }
            })
            .collect();

        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            categories,
            series,
            tick_rotation_degrees: 0,
            value_labels: false,
        }
    }

    /// Single-series chart from two columns of a result table. Null values
    /// plot as zero.
    pub fn from_table(
        table: &LabeledTable,
        category_column: &str,
        value_column: &str,
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Result<Self> {
        let categories = table.text_column(category_column)?;
        let values = table
            .numeric_column(value_column)?
            .into_iter()
            .map(|value| value.unwrap_or(0.0))
            .collect();
        Self::single(title, x_label, y_label, categories, values)
    }

    pub fn grouped_from_table(
        table: &LabeledTable,
        category_column: &str,
        group_column: &str,
        value_column: &str,
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Result<Self> {
        let categories = table.text_column(category_column)?;
        let groups = table.text_column(group_column)?;
        let values = table.numeric_column(value_column)?;
        let points = categories
            .into_iter()
            .zip(groups)
            .zip(values)
            .map(|((category, group), value)| (category, group, value.unwrap_or(0.0)))
            .collect::<Vec<_>>();
        Ok(Self::grouped(title, x_label, y_label, &points))
    }

    #[must_use]
    pub fn with_tick_rotation(mut self, degrees: u16) -> Self {
        self.tick_rotation_degrees = degrees;
        self
    }

    #[must_use]
    pub fn with_value_labels(mut self) -> Self {
        self.value_labels = true;
        self
    }

    fn max_value(&self) -> f64 {
        let max = self
            .series
            .iter()
            .flat_map(|series| series.values.iter().copied())
            .fold(0.0_f64, f64::max);
        if max > 0.0 { max } else { 1.0 }
    }

    /// Terminal rendering: one line per bar, scaled to the largest value.
    #[must_use]
    pub fn render_text(&self) -> String {
        let max = self.max_value();
        let grouped = self.series.len() > 1;
        let label_for = |category: &str, series: &BarSeries| {
            if grouped {
                format!("{category} [{}]", series.name)
            } else {
                category.to_string()
            }
        };

        let label_width = self
            .categories
            .iter()
            .flat_map(|category| {
                self.series
                    .iter()
                    .map(move |series| label_for(category, series).chars().count())
            })
            .max()
            .unwrap_or(0);

        let mut lines = vec![self.title.clone()];
        for (index, category) in self.categories.iter().enumerate() {
            for series in &self.series {
                let value = series.values.get(index).copied().unwrap_or(0.0);
                let length = ((value.max(0.0) / max) * TEXT_BAR_WIDTH as f64).round() as usize;
                let label = label_for(category, series);
                lines.push(format!(
                    "{label:<label_width$} | {} {}",
                    "#".repeat(length),
                    format_value(value)
                ));
            }
        }
        lines.push(format!("x: {} / y: {}", self.x_label, self.y_label));
        lines.join("\n")
    }

    #[must_use]
    pub fn render_svg(&self) -> String {
        let series_count = self.series.len().max(1);
        let slot_width = (18.0 * series_count as f64 + 12.0).max(28.0);
        let plot_width = (slot_width * self.categories.len() as f64).max(MIN_PLOT_WIDTH);
        let legend = self.series.len() > 1;
        let bottom = if self.tick_rotation_degrees > 0 {
            140.0
        } else {
            70.0
        };
        let width = MARGIN_LEFT
            + plot_width
            + MARGIN_RIGHT
            + if legend { LEGEND_WIDTH } else { 0.0 };
        let height = MARGIN_TOP + PLOT_HEIGHT + bottom;
        let baseline = MARGIN_TOP + PLOT_HEIGHT;
        let max = self.max_value();
        let bar_width = (slot_width - 12.0) / series_count as f64;

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.0}" height="{height:.0}" viewBox="0 0 {width:.0} {height:.0}" font-family="sans-serif" font-size="11">"#
        );
        let _ = writeln!(
            svg,
            r##"<rect x="0" y="0" width="{width:.0}" height="{height:.0}" fill="#ffffff"/>"##
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="28" text-anchor="middle" font-size="15">{}</text>"#,
            MARGIN_LEFT + plot_width / 2.0,
            escape_xml(&self.title)
        );

        for tick in 0..=Y_TICKS {
            let value = max * tick as f64 / Y_TICKS as f64;
            let y = baseline - PLOT_HEIGHT * tick as f64 / Y_TICKS as f64;
            let _ = writeln!(
                svg,
                r##"<line x1="{MARGIN_LEFT:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#e5e5e5"/>"##,
                MARGIN_LEFT + plot_width
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
                MARGIN_LEFT - 6.0,
                y + 4.0,
                format_value(value)
            );
        }

        for (series_index, series) in self.series.iter().enumerate() {
            let color = PALETTE[series_index % PALETTE.len()];
            for (category_index, value) in series.values.iter().enumerate() {
                let bar_height = PLOT_HEIGHT * value.max(0.0) / max;
                let x = MARGIN_LEFT
                    + slot_width * category_index as f64
                    + 6.0
                    + bar_width * series_index as f64;
                let y = baseline - bar_height;
                let _ = writeln!(
                    svg,
                    r#"<rect class="bar" x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{bar_height:.1}" fill="{color}"/>"#
                );
                if self.value_labels {
                    let _ = writeln!(
                        svg,
                        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="9">{}</text>"#,
                        x + bar_width / 2.0,
                        y - 3.0,
                        format_value(*value)
                    );
                }
            }
        }

        for (index, category) in self.categories.iter().enumerate() {
            let x = MARGIN_LEFT + slot_width * (index as f64 + 0.5);
            let y = baseline + 14.0;
            if self.tick_rotation_degrees > 0 {
                let _ = writeln!(
                    svg,
                    r#"<text x="{x:.1}" y="{y:.1}" text-anchor="end" transform="rotate(-{} {x:.1} {y:.1})">{}</text>"#,
                    self.tick_rotation_degrees,
                    escape_xml(category)
                );
            } else {
                let _ = writeln!(
                    svg,
                    r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle">{}</text>"#,
                    escape_xml(category)
                );
            }
        }

        let _ = writeln!(
            svg,
            r##"<line x1="{MARGIN_LEFT:.1}" y1="{MARGIN_TOP:.1}" x2="{MARGIN_LEFT:.1}" y2="{baseline:.1}" stroke="#333333"/>"##
        );
        let _ = writeln!(
            svg,
            r##"<line x1="{MARGIN_LEFT:.1}" y1="{baseline:.1}" x2="{:.1}" y2="{baseline:.1}" stroke="#333333"/>"##,
            MARGIN_LEFT + plot_width
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{}</text>"#,
            MARGIN_LEFT + plot_width / 2.0,
            height - 12.0,
            escape_xml(&self.x_label)
        );
        let _ = writeln!(
            svg,
            r#"<text x="18" y="{:.1}" text-anchor="middle" font-size="12" transform="rotate(-90 18 {:.1})">{}</text>"#,
            MARGIN_TOP + PLOT_HEIGHT / 2.0,
            MARGIN_TOP + PLOT_HEIGHT / 2.0,
            escape_xml(&self.y_label)
        );

        if legend {
            let legend_x = MARGIN_LEFT + plot_width + MARGIN_RIGHT;
            for (index, series) in self.series.iter().enumerate() {
                let y = MARGIN_TOP + 18.0 * index as f64;
                let color = PALETTE[index % PALETTE.len()];
                let _ = writeln!(
                    svg,
                    r#"<rect class="legend" x="{legend_x:.1}" y="{y:.1}" width="12" height="12" fill="{color}"/>"#
                );
                let _ = writeln!(
                    svg,
                    r#"<text x="{:.1}" y="{:.1}">{}</text>"#,
                    legend_x + 18.0,
                    y + 10.0,
                    escape_xml(&series.name)
                );
            }
        }

        svg.push_str("</svg>\n");
        svg
    }

    pub fn write_svg(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create chart directory: {}", parent.display())
            })?;
        }
        std::fs::write(path, self.render_svg())
            .with_context(|| format!("failed to write chart: {}", path.display()))
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
