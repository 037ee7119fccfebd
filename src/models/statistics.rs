//! Statistics produced by the analytics worker for one tabular upload.
//!
//! Field names on the wire (`rows`, `columns`, `data_types`, ...) are shared
//! by the worker that produces the record and the gateway that embeds it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Storage type inferred for a column from its non-missing values.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "datetime")]
    DateTime,
    #[serde(rename = "text")]
    Text,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Wire label of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::Text => "text",
        }
    }
}

/// Descriptive statistics of one numeric column.
///
/// Every aggregate is optional so that non-finite results (and the standard
/// deviation of a single value) travel as `null`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

/// Summary of a parsed table. Built once per request and never mutated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatisticsRecord {
    /// Number of data rows, header excluded.
    #[serde(rename = "rows")]
    pub row_count: usize,

    /// Header names in file order.
    #[serde(rename = "columns")]
    pub column_names: Vec<String>,

    #[serde(rename = "data_types")]
    pub column_types: BTreeMap<String, ColumnType>,

    #[serde(rename = "missing_values")]
    pub missing_counts: BTreeMap<String, usize>,

    /// Numeric columns only.
    pub summary: BTreeMap<String, ColumnSummary>,

    /// Up to the first five rows, values typed per column.
    #[serde(rename = "sample")]
    pub sample_rows: Vec<Map<String, Value>>,
}
