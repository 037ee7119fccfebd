//! S3-compatible [`ObjectStore`] backed by the `minio-rsc` client.
//!
//! The adapter only translates: names and bytes go to `Minio`, listings and
//! stats come back as the gateway's own models, and client errors are folded
//! into [`StoreError`].

use crate::{
    config::StorageConfig,
    errors::error_chain,
    models::object::{
        DEFAULT_CONTENT_TYPE, ObjectSummary, PutReceipt, StoredObject, normalize_etag,
    },
    services::object_store::{ObjectStore, StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{
    StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};
use minio_rsc::{
    Minio,
    client::{KeyArgs, ListObjectsArgs},
    error::Error as MinioError,
    provider::StaticProvider,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Codes S3 answers with when the bucket is already there.
const BUCKET_EXISTS_CODES: [&str; 2] = ["BucketAlreadyOwnedByYou", "BucketAlreadyExists"];

#[derive(Clone)]
pub struct S3ObjectStore {
    minio: Minio,
    location: String,
}

impl S3ObjectStore {
    pub fn new(config: &StorageConfig) -> StoreResult<Self> {
        let provider = StaticProvider::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
        );
        let minio = Minio::builder()
            .endpoint(config.endpoint.clone())
            .region(config.region.clone())
            .provider(provider)
            .secure(config.secure)
            .multi_chunked_encoding(false)
            .build()
            .map_err(|err| StoreError::Config(err.to_string()))?;
        let scheme = if config.secure { "https" } else { "http" };

        Ok(Self {
            minio,
            location: format!("{scheme}://{}", config.endpoint),
        })
    }
}

/// S3 error replies become `Rejected`, undecodable replies `InvalidResponse`,
/// everything else (connect, TLS, timeouts) `Unavailable`.
fn store_error(err: MinioError) -> StoreError {
    match err {
        MinioError::S3Error(reply) => StoreError::Rejected {
            code: reply.code,
            message: reply.message,
        },
        MinioError::XmlError(err) => StoreError::InvalidResponse(err.to_string()),
        other => StoreError::Unavailable(error_chain(&other)),
    }
}

/// `Last-Modified` is RFC 2822 on HEAD and RFC 3339 in listings.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(raw: &str) -> Option<&str> {
    Some(raw.trim()).filter(|v| !v.is_empty())
}

fn summary_from_listing(key: String, size: u64, last_modified: &str, etag: &str) -> ObjectSummary {
    ObjectSummary {
        name: key,
        size,
        last_modified: parse_timestamp(last_modified),
        etag: non_empty(etag).map(normalize_etag),
    }
}

fn stored_object(
    name: &str,
    size: usize,
    content_type: &str,
    last_modified: &str,
    etag: &str,
    metadata: BTreeMap<String, String>,
) -> StoredObject {
    StoredObject {
        name: name.to_string(),
        size: size as u64,
        content_type: non_empty(content_type)
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string(),
        last_modified: parse_timestamp(last_modified),
        etag: non_empty(etag).map(normalize_etag),
        metadata,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()> {
        if self.minio.bucket_exists(bucket).await.map_err(store_error)? {
            debug!("bucket `{}` already exists", bucket);
            return Ok(());
        }
        match self.minio.make_bucket(bucket, false).await.map_err(store_error) {
            Ok(_) => {
                debug!("bucket `{}` created", bucket);
                Ok(())
            }
            Err(StoreError::Rejected { code, .. }) if BUCKET_EXISTS_CODES.contains(&code.as_str()) => {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn put(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<PutReceipt> {
        let size = data.len() as u64;
        let key = KeyArgs::new(name).content_type(Some(content_type.to_string()));
        self.minio
            .put_object(bucket, key, data)
            .await
            .map_err(store_error)?;

        Ok(PutReceipt { size, etag: None })
    }

    async fn get_metadata(&self, bucket: &str, name: &str) -> StoreResult<StoredObject> {
        let stat = self
            .minio
            .stat_object(bucket, name)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })?;

        let metadata = stat
            .metadata()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(stored_object(
            name,
            stat.size(),
            stat.content_type(),
            stat.last_modified(),
            stat.etag(),
            metadata,
        ))
    }

    fn list<'a>(&'a self, bucket: &'a str) -> BoxStream<'a, StoreResult<ObjectSummary>> {
        // State: Some(token) while pages remain; the first page has no token.
        stream::try_unfold(Some(None::<String>), move |state| async move {
            let Some(token) = state else {
                return Ok::<_, StoreError>(None);
            };
            let args = match token {
                Some(token) => ListObjectsArgs::default().continuation_token(token),
                None => ListObjectsArgs::default(),
            };
            let page = self
                .minio
                .list_objects(bucket, args)
                .await
                .map_err(store_error)?;

            let next = (page.is_truncated && !page.next_continuation_token.is_empty())
                .then(|| Some(page.next_continuation_token.clone()));
            let items: Vec<StoreResult<ObjectSummary>> = page
                .contents
                .into_iter()
                .map(|obj| Ok(summary_from_listing(obj.key, obj.size, &obj.last_modified, &obj.e_tag)))
                .collect();
            Ok(Some((stream::iter(items), next)))
        })
        .try_flatten()
        .boxed()
    }

    async fn delete(&self, bucket: &str, name: &str) -> StoreResult<()> {
        match self.minio.remove_object(bucket, name).await.map_err(store_error) {
            Ok(_) => Ok(()),
            Err(StoreError::Rejected { code, .. }) if code == "NoSuchKey" => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        let (buckets, _owner) = self.minio.list_buckets().await.map_err(store_error)?;
        Ok(buckets.into_iter().map(|b| b.name).collect())
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}
