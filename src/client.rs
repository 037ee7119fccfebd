//! Terminal client of the gateway: health check, upload with a rendered
//! analysis report, and file listing.

use crate::{
    handlers::multipart::FILE_FIELD,
    models::{
        gateway::{FileList, HealthReport},
        statistics::StatisticsRecord,
    },
};
use anyhow::{Context, Result, bail};
use reqwest::{
    Response,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{fmt::Write as _, path::Path};

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .with_context(|| format!("contacting gateway at {}", self.base_url))?;
        decode(response).await
    }

    /// Upload the file at `path` and return the raw gateway response.
    pub async fn upload(&self, path: &Path) -> Result<Value> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("{} has no usable file name", path.display()))?
            .to_string();

        let part = Part::bytes(data)
            .file_name(filename)
            .mime_str(guess_content_type(path))?;
        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(Form::new().part(FILE_FIELD, part))
            .send()
            .await
            .with_context(|| format!("contacting gateway at {}", self.base_url))?;
        decode(response).await
    }

    pub async fn list(&self) -> Result<FileList> {
        let response = self
            .http
            .get(format!("{}/files", self.base_url))
            .send()
            .await
            .with_context(|| format!("contacting gateway at {}", self.base_url))?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        bail!("gateway returned {}: {}", status, message);
    }
    response.json::<T>().await.context("decoding gateway response")
}

fn guess_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

pub fn render_health(report: &HealthReport) -> String {
    if report.is_healthy() {
        format!(
            "Backend online ({}), bucket `{}`, storage connected",
            report.status, report.bucket
        )
    } else {
        format!(
            "Backend reachable but {}: {}",
            report.status,
            report.error.as_deref().unwrap_or("storage not connected")
        )
    }
}

/// Human-readable report of an upload response.
pub fn render_upload(response: &Value) -> String {
    let mut out = String::new();
    let text = |key: &str| response.get(key).and_then(Value::as_str).unwrap_or("");

    let _ = writeln!(out, "{}", text("message"));
    let _ = writeln!(
        out,
        "File: {}  Size: {} bytes  Bucket: {}",
        text("filename"),
        response.get("size_bytes").and_then(Value::as_u64).unwrap_or(0),
        text("bucket")
    );

    let analytics = response.get("analytics").cloned().unwrap_or(Value::Null);
    if let Some(error) = analytics.get("error").and_then(Value::as_str) {
        let _ = writeln!(out, "Analysis unavailable: {}", error);
        return out;
    }
    match serde_json::from_value::<StatisticsRecord>(analytics) {
        Ok(record) => render_record(&mut out, &record),
        Err(_) => {
            let _ = writeln!(out, "No analysis for this file type.");
        }
    }
    out
}

fn render_record(out: &mut String, record: &StatisticsRecord) {
    let _ = writeln!(out, "Rows: {}  Columns: {}", record.row_count, record.column_names.len());
    for name in &record.column_names {
        let kind = record
            .column_types
            .get(name)
            .map(|t| t.as_str())
            .unwrap_or("");
        let missing = record.missing_counts.get(name).copied().unwrap_or(0);
        let _ = writeln!(out, "  {:<20} {:<9} missing: {}", name, kind, missing);
    }

    if record.summary.is_empty() {
        return;
    }
    let _ = writeln!(
        out,
        "{:<20} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for (name, s) in &record.summary {
        let _ = writeln!(
            out,
            "{:<20} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            name,
            s.count,
            cell(s.mean),
            cell(s.std),
            cell(s.min),
            cell(s.p25),
            cell(s.p50),
            cell(s.p75),
            cell(s.max)
        );
    }
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".into())
}

pub fn render_list(list: &FileList) -> String {
    let mut out = format!("{} file(s) in bucket `{}`\n", list.file_count, list.bucket);
    for file in &list.files {
        let modified = file
            .last_modified
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".into());
        let _ = writeln!(out, "  {:<40} {:>12} bytes  {}", file.name, file.size, modified);
    }
    out
}
