//! Descriptive statistics over delimited text with a header row.
//!
//! `analyze` is a pure function: bytes in, `StatisticsRecord` out. A table
//! with a header but no data rows is a valid, empty result; input that cannot
//! be read as delimited text at all is a `ParseError`.

use crate::models::statistics::{ColumnSummary, ColumnType, StatisticsRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Number of leading rows echoed back in the record.
pub const SAMPLE_SIZE: usize = 5;

/// Cell contents treated as "no value".
const MISSING_MARKERS: [&str; 10] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A",
];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("no columns to parse from input")]
    NoColumns,
    #[error("malformed input: {0}")]
    Malformed(String),
}

/// Parse `data` as comma-delimited text and summarize it.
pub fn analyze(data: &[u8]) -> Result<StatisticsRecord, ParseError> {
    if let Some(line) = unterminated_quote_line(data) {
        return Err(ParseError::Malformed(format!(
            "line {line}: EOF inside quoted field"
        )));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let header = reader
        .headers()
        .map_err(|err| ParseError::Malformed(err.to_string()))?
        .clone();
    if header.is_empty() || (header.len() == 1 && header[0].trim().is_empty()) {
        return Err(ParseError::NoColumns);
    }
    let names = dedupe_headers(&header);

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for result in reader.records() {
        let record = result.map_err(|err| ParseError::Malformed(err.to_string()))?;
        if record.len() > names.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(ParseError::Malformed(format!(
                "line {line}: expected {} fields, saw {}",
                names.len(),
                record.len()
            )));
        }
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(record.get(idx).and_then(cell_value));
        }
    }

    let row_count = columns.first().map(Vec::len).unwrap_or_default();
    let mut column_types = BTreeMap::new();
    let mut missing_counts = BTreeMap::new();
    let mut summary = BTreeMap::new();
    let mut kinds = Vec::with_capacity(names.len());

    for (name, column) in names.iter().zip(&columns) {
        let kind = infer_type(column);
        kinds.push(kind);
        column_types.insert(name.clone(), kind);
        missing_counts.insert(name.clone(), column.iter().filter(|v| v.is_none()).count());

        if kind.is_numeric() {
            let values: Vec<f64> = column
                .iter()
                .flatten()
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .collect();
            if let Some(stats) = describe(&values) {
                summary.insert(name.clone(), stats);
            }
        }
    }

    let sample_rows = (0..row_count.min(SAMPLE_SIZE))
        .map(|row| {
            names
                .iter()
                .zip(&columns)
                .zip(&kinds)
                .map(|((name, column), kind)| (name.clone(), typed_value(column[row].as_deref(), *kind)))
                .collect::<Map<String, Value>>()
        })
        .collect();

    Ok(StatisticsRecord {
        row_count,
        column_names: names,
        column_types,
        missing_counts,
        summary,
        sample_rows,
    })
}

/// Line on which a quoted field opens without ever being closed.
///
/// The csv reader accepts such input and folds the rest of the file into one
/// cell. A quote only opens a field when it is the field's first byte; `""`
/// inside a quoted field is an escaped quote.
fn unterminated_quote_line(data: &[u8]) -> Option<usize> {
    let mut line = 1;
    let mut opened_on = None;
    let mut at_field_start = true;
    let mut bytes = data.iter().peekable();

    while let Some(&byte) = bytes.next() {
        if byte == b'\n' {
            line += 1;
        }
        if opened_on.is_some() {
            if byte == b'"' {
                if bytes.peek() == Some(&&b'"') {
                    bytes.next();
                } else {
                    opened_on = None;
                }
            }
            at_field_start = false;
            continue;
        }
        match byte {
            b'"' if at_field_start => {
                opened_on = Some(line);
                at_field_start = false;
            }
            b',' | b'\n' | b'\r' => at_field_start = true,
            _ => at_field_start = false,
        }
    }
    opened_on
}

/// Make header names unique by suffixing repeats with `.1`, `.2`, ...
fn dedupe_headers(header: &StringRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .map(|raw| {
            let mut name = raw.to_string();
            let mut n = 0;
            while !seen.insert(name.clone()) {
                n += 1;
                name = format!("{raw}.{n}");
            }
            name
        })
        .collect()
}

fn cell_value(raw: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&raw.trim()) {
        None
    } else {
        Some(raw.to_string())
    }
}

fn infer_type(column: &[Option<String>]) -> ColumnType {
    let mut present = column.iter().flatten().map(|v| v.trim()).peekable();
    if present.peek().is_none() {
        return ColumnType::Text;
    }
    let values: Vec<&str> = present.collect();

    if values.iter().all(|v| v.parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if values.iter().all(|v| v.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if values.iter().all(|v| parse_bool(v).is_some()) {
        ColumnType::Boolean
    } else if values.iter().all(|v| is_datetime(v)) {
        ColumnType::DateTime
    } else {
        ColumnType::Text
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn is_datetime(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

fn typed_value(raw: Option<&str>, kind: ColumnType) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };
    let trimmed = raw.trim();
    match kind {
        ColumnType::Integer => trimmed.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
        ColumnType::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ColumnType::Boolean => parse_bool(trimmed).map(Value::Bool).unwrap_or(Value::Null),
        ColumnType::DateTime | ColumnType::Text => Value::String(raw.to_string()),
    }
}

/// count / mean / sample std / min / quartiles / max. `None` for no values.
fn describe(values: &[f64]) -> Option<ColumnSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let std = (sorted.len() > 1).then(|| {
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    });

    Some(ColumnSummary {
        count: sorted.len(),
        mean: finite(mean),
        std: std.and_then(finite),
        min: finite(sorted[0]),
        p25: finite(quantile(&sorted, 0.25)),
        p50: finite(quantile(&sorted, 0.50)),
        p75: finite(quantile(&sorted, 0.75)),
        max: finite(sorted[sorted.len() - 1]),
    })
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
