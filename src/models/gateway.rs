//! Request and response shapes of the gateway HTTP surface.

use crate::models::{
    object::{ObjectSummary, StoredObject},
    statistics::StatisticsRecord,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use std::collections::BTreeMap;

/// A file received in a multipart form, before any validation.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Result of the best-effort analysis step of an upload.
///
/// The gateway turns every path through the analytics call into one of these
/// tags, so building the response never has to branch on errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsOutcome {
    /// The file name does not look tabular; analysis was not attempted.
    Skipped,
    /// The worker produced statistics.
    Completed(StatisticsRecord),
    /// The worker answered with an error response.
    ServiceError(String),
    /// The worker could not be reached or did not answer in time.
    Unreachable(String),
}

impl AnalyticsOutcome {
    pub fn error_message(&self) -> Option<String> {
        match self {
            AnalyticsOutcome::ServiceError(msg) => Some(format!("analytics service error: {msg}")),
            AnalyticsOutcome::Unreachable(cause) => {
                Some(format!("could not connect to analytics: {cause}"))
            }
            AnalyticsOutcome::Skipped | AnalyticsOutcome::Completed(_) => None,
        }
    }
}

impl Serialize for AnalyticsOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AnalyticsOutcome::Completed(record) => record.serialize(serializer),
            AnalyticsOutcome::Skipped => serializer.serialize_map(Some(0))?.end(),
            AnalyticsOutcome::ServiceError(_) | AnalyticsOutcome::Unreachable(_) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &self.error_message())?;
                map.end()
            }
        }
    }
}

/// `POST /upload` response.
#[derive(Serialize, Debug, Clone)]
pub struct UploadResult {
    pub filename: String,
    pub status: String,
    pub storage: String,
    pub bucket: String,
    pub size_bytes: u64,
    pub analytics: AnalyticsOutcome,
    pub message: String,
}

/// One row of `GET /files`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

impl From<ObjectSummary> for FileEntry {
    fn from(obj: ObjectSummary) -> Self {
        Self {
            name: obj.name,
            size: obj.size,
            last_modified: obj.last_modified,
            etag: obj.etag,
        }
    }
}

/// `GET /files` response.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileList {
    pub bucket: String,
    pub file_count: usize,
    pub files: Vec<FileEntry>,
}

/// `GET /files/{name}` response.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileInfo {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl From<StoredObject> for FileInfo {
    fn from(obj: StoredObject) -> Self {
        Self {
            filename: obj.name,
            size: obj.size,
            content_type: obj.content_type,
            last_modified: obj.last_modified,
            etag: obj.etag,
            metadata: obj.metadata,
        }
    }
}

/// `DELETE /files/{name}` response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeleteResult {
    pub filename: String,
    pub status: String,
    pub message: String,
}

/// `GET /health` response. Storage problems show up as `degraded`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub storage_connected: bool,
    pub available_buckets: Vec<String>,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.storage_connected
    }
}

/// `GET /` response.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServiceInfo {
    pub service: String,
    pub status: String,
    pub bucket: String,
    pub endpoint: String,
}
