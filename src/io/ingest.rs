//! CSV ingestion of device profiles, duty cycles and the curtailment target.
//!
//! Every file is a table of `timestamp<delim>value[<delim>value]` rows. The
//! delimiter, decimal separator and timestamp format are configurable so
//! exports from spreadsheet tools with a decimal comma read unchanged.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ConfigurationError;
use crate::sim::types::TimeSeries;

/// Failure while reading an input table.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{series}: {source}")]
    Csv {
        series: String,
        #[source]
        source: csv::Error,
    },
    #[error("{series}, line {line}: invalid timestamp \"{value}\"")]
    Timestamp {
        series: String,
        line: u64,
        value: String,
    },
    #[error("{series}, line {line}: invalid number \"{value}\"")]
    Value {
        series: String,
        line: u64,
        value: String,
    },
    #[error("{series}, line {line}: expected {expected} columns")]
    MissingColumn {
        series: String,
        line: u64,
        expected: usize,
    },
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Layout of the input tables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvDialect {
    /// Column delimiter (single ASCII character).
    pub delimiter: char,
    /// Numbers use `,` as decimal separator and `.` for thousands.
    pub decimal_comma: bool,
    /// `chrono` format string of the timestamp column.
    pub timestamp_format: String,
    /// First row holds column names.
    pub has_header: bool,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_comma: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
            has_header: true,
        }
    }
}

impl CsvDialect {
    fn reader<R: Read>(&self, input: R) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter as u8)
            .has_headers(self.has_header)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(input)
    }
}

/// Parses one number, honouring the decimal separator.
///
/// # Examples
///
/// ```
/// use loadshift_sim::io::ingest::parse_number;
///
/// assert_eq!(parse_number("1.234,5", true), Some(1234.5));
/// assert_eq!(parse_number("0.25", false), Some(0.25));
/// assert_eq!(parse_number("", false), None);
/// ```
pub fn parse_number(raw: &str, decimal_comma: bool) -> Option<f32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if decimal_comma {
        raw.replace('.', "").replace(',', ".").parse().ok()
    } else {
        raw.parse().ok()
    }
}

/// Reads rows of a timestamp followed by `columns` numbers.
fn read_rows<R: Read>(
    input: R,
    series: &str,
    dialect: &CsvDialect,
    columns: usize,
) -> Result<Vec<(NaiveDateTime, Vec<f32>)>, IngestError> {
    let mut reader = dialect.reader(input);
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Csv {
            series: series.to_string(),
            source,
        })?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.len() < columns + 1 {
            return Err(IngestError::MissingColumn {
                series: series.to_string(),
                line,
                expected: columns + 1,
            });
        }

        let stamp = &record[0];
        let timestamp = NaiveDateTime::parse_from_str(stamp, &dialect.timestamp_format)
            .map_err(|_| IngestError::Timestamp {
                series: series.to_string(),
                line,
                value: stamp.to_string(),
            })?;

        let mut values = Vec::with_capacity(columns);
        for field in record.iter().skip(1).take(columns) {
            let value = parse_number(field, dialect.decimal_comma).ok_or_else(|| {
                IngestError::Value {
                    series: series.to_string(),
                    line,
                    value: field.to_string(),
                }
            })?;
            values.push(value);
        }
        rows.push((timestamp, values));
    }

    Ok(rows)
}

/// Reads a single power series (`timestamp, kW`).
///
/// # Arguments
///
/// * `input` - CSV source
/// * `series` - Label used in error messages
/// * `dialect` - Table layout
/// * `default_step_minutes` - Step used when the table has a single row
///
/// # Errors
///
/// Returns an `IngestError` for malformed rows, an empty table or a
/// non-uniform time step.
pub fn read_series<R: Read>(
    input: R,
    series: &str,
    dialect: &CsvDialect,
    default_step_minutes: u32,
) -> Result<TimeSeries, IngestError> {
    let points: Vec<(NaiveDateTime, f32)> = read_rows(input, series, dialect, 1)?
        .into_iter()
        .map(|(ts, values)| (ts, values[0]))
        .collect();
    Ok(TimeSeries::from_points(series, &points, default_step_minutes)?)
}

/// Reads a power series from a file; see [`read_series`].
///
/// # Errors
///
/// Returns `IngestError::Io` if the file cannot be opened.
pub fn read_series_file(
    path: &Path,
    series: &str,
    dialect: &CsvDialect,
    default_step_minutes: u32,
) -> Result<TimeSeries, IngestError> {
    read_series(open(path)?, series, dialect, default_step_minutes)
}

/// Reads the target table (`timestamp, PV kW, curtailment kW`).
///
/// # Returns
///
/// The PV production and the reference curtailment on a shared axis.
///
/// # Errors
///
/// Returns an `IngestError` for malformed rows, an empty table or a
/// non-uniform time step.
pub fn read_target<R: Read>(
    input: R,
    dialect: &CsvDialect,
    default_step_minutes: u32,
) -> Result<(TimeSeries, TimeSeries), IngestError> {
    let rows = read_rows(input, "target", dialect, 2)?;
    let pv: Vec<(NaiveDateTime, f32)> = rows.iter().map(|(ts, v)| (*ts, v[0])).collect();
    let curtailment: Vec<(NaiveDateTime, f32)> = rows.iter().map(|(ts, v)| (*ts, v[1])).collect();
    Ok((
        TimeSeries::from_points("pv", &pv, default_step_minutes)?,
        TimeSeries::from_points("reference curtailment", &curtailment, default_step_minutes)?,
    ))
}

/// Reads the target table from a file; see [`read_target`].
///
/// # Errors
///
/// Returns `IngestError::Io` if the file cannot be opened.
pub fn read_target_file(
    path: &Path,
    dialect: &CsvDialect,
    default_step_minutes: u32,
) -> Result<(TimeSeries, TimeSeries), IngestError> {
    read_target(open(path)?, dialect, default_step_minutes)
}

fn open(path: &Path) -> Result<File, IngestError> {
    File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })
}
