use anyhow::{Context, Result, anyhow};
use time::format_description::well_known::Rfc3339;
use time::{Month, OffsetDateTime};

/// Calendar order used for month-labeled charts. Fixed, never locale-derived.
pub const MONTH_ORDER: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Maps a `strftime('%m')` value ("01".."12") onto a month.
pub fn month_from_sql(raw: &str) -> Result<Month> {
    let number = raw
        .trim()
        .parse::<u8>()
        .with_context(|| format!("month number is not an integer: {raw}"))?;
    Month::try_from(number).map_err(|_| anyhow!("month number out of range: {number}"))
}

#[must_use]
pub fn month_position(month: Month) -> usize {
    MONTH_ORDER
        .iter()
        .position(|candidate| *candidate == month)
        .unwrap_or(MONTH_ORDER.len())
}

pub fn generated_at_utc_now() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("failed to format report generation timestamp")
}
