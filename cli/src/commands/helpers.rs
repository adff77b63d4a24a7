use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use chartbook_core::date_range::{DateRangeFilter, DateWindow};
use chartbook_core::models::Measurement;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    match s {
        "today" => Ok(Local::now().date_naive()),
        "yesterday" => Ok(Local::now().date_naive() - Duration::days(1)),
        _ => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday")),
    }
}

/// Parse a reading time. A bare date keeps the current time of day.
pub(crate) fn parse_timestamp(input: Option<String>) -> Result<DateTime<Local>> {
    let Some(s) = input else {
        return Ok(Local::now());
    };
    let s = s.trim();
    if s == "now" {
        return Ok(Local::now());
    }

    let naive = TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok());
    let naive = match naive {
        Some(n) => n,
        None => parse_date(s)
            .with_context(|| {
                format!("Invalid time '{s}'. Use 'YYYY-MM-DD HH:MM[:SS]', a date, or 'now'")
            })?
            .and_time(Local::now().time()),
    };
    to_local(naive)
}

fn to_local(naive: NaiveDateTime) -> Result<DateTime<Local>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("{naive} does not exist in the local time zone"))
}

/// Build the listing window from `--range`, `--from` and `--to`. Giving
/// either bound switches to a custom range.
pub(crate) fn resolve_window(
    range: &str,
    from: Option<String>,
    to: Option<String>,
) -> Result<DateWindow> {
    let mut filter: DateRangeFilter = range.parse()?;
    if from.is_some() || to.is_some() {
        filter = DateRangeFilter::Custom;
    }
    let midday = |s: String| -> Result<DateTime<Local>> {
        let date = parse_date(&s)?;
        to_local(date.and_time(NaiveTime::MIN) + Duration::hours(12))
    };
    let start = from.map(midday).transpose()?;
    let end = to.map(midday).transpose()?;
    Ok(filter.window(start, end))
}

pub(crate) fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

pub(crate) fn print_measurement_table(measurements: &[Measurement]) {
    #[derive(Tabled)]
    struct MeasurementRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Type")]
        kind: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let rows: Vec<MeasurementRow> = measurements
        .iter()
        .map(|m| MeasurementRow {
            id: m.id,
            time: format_timestamp(&m.timestamp),
            kind: m
                .measurement_type
                .as_ref()
                .map(|t| truncate(&t.name, 20))
                .unwrap_or_default(),
            value: format!("{}", m.value),
            unit: m
                .measurement_type
                .as_ref()
                .map(|t| t.unit.clone())
                .unwrap_or_default(),
            notes: m
                .notes
                .as_deref()
                .map(|n| truncate(n, 40))
                .unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
