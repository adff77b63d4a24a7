//! CSV export and import of measurements.
//!
//! Format:
//! `Date,Time,Measurement Type,Value,Unit,Notes`
//!
//! There is no quoting. Commas inside the type name, unit or notes are
//! written as `;` and stay that way on re-import. A newline inside notes
//! breaks the row in two; nothing guards against it.

use std::io::{Read, Write};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;

use crate::error::{CodecError, ImportError, RowError};
use crate::models::{Measurement, MeasurementType, NewMeasurement};
use crate::store::RecordStore;

pub const CSV_HEADER: [&str; 6] = ["Date", "Time", "Measurement Type", "Value", "Unit", "Notes"];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MIN_FIELDS: usize = 5;

/// Outcome of an import. Counts and messages always agree: every error
/// contributes exactly one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub success_count: usize,
    pub error_count: usize,
    pub messages: Vec<String>,
}

impl ImportReport {
    /// Report for an import that ended before any row was read.
    #[must_use]
    pub fn fatal(err: &ImportError) -> Self {
        Self {
            success_count: 0,
            error_count: 1,
            messages: vec![err.to_string()],
        }
    }
}

/// Rows that passed validation plus the ones that did not.
#[derive(Debug, Default)]
pub struct ParsedRows {
    pub staged: Vec<NewMeasurement>,
    pub errors: Vec<RowError>,
}

// --- Export ---

#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("ChartAnything_Export_{}.csv", date.format(DATE_FORMAT))
}

/// Render every measurement that still has a type, oldest first.
pub fn export_csv(measurements: &[Measurement]) -> Result<String, CodecError> {
    let mut buf = Vec::new();
    write_export(measurements, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Write the export payload and return the number of data rows written.
pub fn write_export<W: Write>(measurements: &[Measurement], writer: W) -> Result<usize, CodecError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(CSV_HEADER)?;

    let mut sorted: Vec<&Measurement> = measurements.iter().collect();
    sorted.sort_by_key(|m| m.timestamp);

    let mut rows = 0;
    for m in sorted {
        let Some(measurement_type) = &m.measurement_type else {
            continue;
        };
        wtr.write_record([
            m.timestamp.format(DATE_FORMAT).to_string(),
            m.timestamp.format(TIME_FORMAT).to_string(),
            escape_field(&measurement_type.name),
            format_value(m.value),
            escape_field(&measurement_type.unit),
            escape_field(m.notes.as_deref().unwrap_or_default()),
        ])?;
        rows += 1;
    }
    wtr.flush()?;
    tracing::info!(rows, "exported measurements to CSV");
    Ok(rows)
}

fn escape_field(field: &str) -> String {
    field.replace(',', ";")
}

// Debug formatting keeps the decimal point on whole numbers ("100.0").
fn format_value(value: f64) -> String {
    format!("{value:?}")
}

// --- Import ---

/// Read a CSV payload and persist every valid row in one batch.
///
/// Bad rows are skipped and reported; they never abort the import. If the
/// final batch insert fails nothing is stored, the success count drops to
/// zero and the failure is appended as one more error.
pub fn import_csv<R: Read, S: RecordStore + ?Sized>(
    mut reader: R,
    types: &[MeasurementType],
    store: &S,
) -> ImportReport {
    let mut text = String::new();
    if let Err(err) = reader.read_to_string(&mut text) {
        let err = ImportError::from(err);
        tracing::warn!(error = %err, "could not read CSV payload");
        return ImportReport::fatal(&err);
    }
    import_csv_str(&text, types, store)
}

pub fn import_csv_str<S: RecordStore + ?Sized>(
    text: &str,
    types: &[MeasurementType],
    store: &S,
) -> ImportReport {
    let parsed = match parse_rows(text, types) {
        Ok(parsed) => parsed,
        Err(err) => return ImportReport::fatal(&err),
    };

    let mut report = ImportReport {
        success_count: parsed.staged.len(),
        error_count: parsed.errors.len(),
        messages: parsed.errors.iter().map(ToString::to_string).collect(),
    };

    if !parsed.staged.is_empty() {
        if let Err(err) = store.insert_measurements(&parsed.staged) {
            let err = ImportError::Commit(err);
            tracing::warn!(error = %err, staged = parsed.staged.len(), "import commit failed");
            report.success_count = 0;
            report.error_count += 1;
            report.messages.push(err.to_string());
            return report;
        }
    }

    tracing::info!(
        imported = report.success_count,
        errors = report.error_count,
        "imported measurements from CSV"
    );
    report
}

/// Validate every data row without touching storage.
///
/// Fails only when the payload has no data lines at all.
pub fn parse_rows(text: &str, types: &[MeasurementType]) -> Result<ParsedRows, ImportError> {
    let lines = split_lines(text);
    if lines.len() < 2 {
        return Err(ImportError::Empty);
    }

    let mut parsed = ParsedRows::default();
    for (row, line) in lines.iter().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(row, line, types) {
            Ok(measurement) => parsed.staged.push(measurement),
            Err(err) => {
                tracing::debug!(%err, "skipping CSV row");
                parsed.errors.push(err);
            }
        }
    }
    Ok(parsed)
}

fn parse_row(row: usize, line: &str, types: &[MeasurementType]) -> Result<NewMeasurement, RowError> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return Err(RowError::InvalidFormat { row });
    }

    let (date, time, type_name, raw_value) = (fields[0], fields[1], fields[2], fields[3]);
    // fields[4] is the unit; the resolved type's unit wins
    let notes = fields.get(5).copied().unwrap_or_default();

    let measurement_type = types
        .iter()
        .find(|t| t.name == type_name)
        .ok_or_else(|| RowError::UnknownType {
            row,
            name: type_name.to_string(),
        })?;

    let timestamp =
        parse_timestamp(date, time).ok_or(RowError::InvalidDateTime { row })?;

    // NaN parses as a float but has no stored form
    let value: f64 = raw_value
        .parse()
        .ok()
        .filter(|v: &f64| !v.is_nan())
        .ok_or_else(|| RowError::InvalidValue {
            row,
            raw: raw_value.to_string(),
        })?;

    Ok(NewMeasurement {
        type_id: measurement_type.id,
        value,
        timestamp,
        notes: (!notes.is_empty()).then(|| notes.to_string()),
    })
}

/// Parse `yyyy-MM-dd` + `HH:mm:ss` as local time. Times that fall in a DST
/// gap do not exist locally and are rejected.
fn parse_timestamp(date: &str, time: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(&format!("{date} {time}"), DATE_TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// Split on `\n`, `\r\n` or a lone `\r`, keeping empty lines so indices
/// match line positions in the file.
fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .flat_map(|line| line.strip_suffix('\r').unwrap_or(line).split('\r'))
        .collect()
}
