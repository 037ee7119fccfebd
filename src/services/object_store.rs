//! The object store seam.
//!
//! The gateway only talks to storage through [`ObjectStore`], so the real S3
//! client and the in-memory store are interchangeable at construction time.

use crate::models::object::{ObjectSummary, PutReceipt, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object `{name}` not found in bucket `{bucket}`")]
    NotFound { bucket: String, name: String },
    #[error("store rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid store response: {0}")]
    InvalidResponse(String),
    #[error("invalid store configuration: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Bucket-oriented byte storage with metadata.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` if it does not exist yet. Idempotent.
    async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Store `data` under `name`, replacing any previous object of that name.
    async fn put(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<PutReceipt>;

    async fn get_metadata(&self, bucket: &str, name: &str) -> StoreResult<StoredObject>;

    /// Enumerate the whole bucket. The stream is lazy and every call starts
    /// over from the first object.
    fn list<'a>(&'a self, bucket: &'a str) -> BoxStream<'a, StoreResult<ObjectSummary>>;

    /// Remove `name`. Removing an absent object is not an error.
    async fn delete(&self, bucket: &str, name: &str) -> StoreResult<()>;

    async fn list_buckets(&self) -> StoreResult<Vec<String>>;

    /// Human-readable address of the store, for service info.
    fn location(&self) -> String;
}
