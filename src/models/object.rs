//! Represents an object (file) held by the remote object store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content type recorded when the uploader does not supply one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Full metadata of a single object, as returned by a stat (HEAD) call.
///
/// The store owns this record; the gateway never caches it and re-reads it
/// on every request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredObject {
    /// Object name, unique within its bucket (last write wins).
    pub name: String,

    /// Size in bytes.
    pub size: u64,

    /// Content type (MIME type), defaulted when the store has none.
    pub content_type: String,

    /// Timestamp when the object was last written.
    pub last_modified: Option<DateTime<Utc>>,

    /// Content fingerprint supplied by the store, without surrounding quotes.
    pub etag: Option<String>,

    /// User metadata attached to the object (`x-amz-meta-*`).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// One entry of a bucket listing. Listings carry no content type.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ObjectSummary {
    pub name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// What the store acknowledges after a successful write.
#[derive(Clone, Debug, PartialEq)]
pub struct PutReceipt {
    pub size: u64,
    pub etag: Option<String>,
}

/// Strip the double quotes S3 wraps around etags.
pub fn normalize_etag(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}
