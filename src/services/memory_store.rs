//! In-process [`ObjectStore`] with the same contract as the S3 client.
//!
//! Etags are MD5 hex digests like the disk-backed stores produce. The
//! `offline` switch makes every call fail as if the network were down.

use crate::{
    models::object::{ObjectSummary, PutReceipt, StoredObject},
    services::object_store::{ObjectStore, StoreError, StoreResult},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{
    StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};
use std::{
    collections::BTreeMap,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
    etag: String,
}

type Buckets = BTreeMap<String, BTreeMap<String, MemoryObject>>;

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<Buckets>,
    offline: AtomicBool,
}

impl MemoryObjectStore {
    /// Store with `bucket` already created.
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        store.write().insert(bucket.to_string(), BTreeMap::new());
        store
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Raw bytes of a stored object.
    pub fn object_data(&self, bucket: &str, name: &str) -> Option<Bytes> {
        self.read()
            .get(bucket)
            .and_then(|objects| objects.get(name))
            .map(|obj| obj.data.clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Buckets> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Buckets> {
        self.buckets.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".into()))
        } else {
            Ok(())
        }
    }

    fn summaries(&self, bucket: &str) -> StoreResult<Vec<ObjectSummary>> {
        self.check_online()?;
        let buckets = self.read();
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        Ok(objects
            .iter()
            .map(|(name, obj)| ObjectSummary {
                name: name.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
                etag: Some(obj.etag.clone()),
            })
            .collect())
    }
}

fn no_such_bucket(bucket: &str) -> StoreError {
    StoreError::Rejected {
        code: "NoSuchBucket".into(),
        message: format!("bucket `{bucket}` does not exist"),
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.check_online()?;
        self.write().entry(bucket.to_string()).or_default();
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        name: &str,
        data: Bytes,
        content_type: &str,
    ) -> StoreResult<PutReceipt> {
        self.check_online()?;
        let etag = format!("{:x}", md5::compute(&data));
        let size = data.len() as u64;

        let mut buckets = self.write();
        let objects = buckets.get_mut(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        objects.insert(
            name.to_string(),
            MemoryObject {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
                etag: etag.clone(),
            },
        );

        Ok(PutReceipt {
            size,
            etag: Some(etag),
        })
    }

    async fn get_metadata(&self, bucket: &str, name: &str) -> StoreResult<StoredObject> {
        self.check_online()?;
        let buckets = self.read();
        let objects = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
        let obj = objects.get(name).ok_or_else(|| StoreError::NotFound {
            bucket: bucket.to_string(),
            name: name.to_string(),
        })?;

        Ok(StoredObject {
            name: name.to_string(),
            size: obj.data.len() as u64,
            content_type: obj.content_type.clone(),
            last_modified: Some(obj.last_modified),
            etag: Some(obj.etag.clone()),
            metadata: BTreeMap::new(),
        })
    }

    fn list<'a>(&'a self, bucket: &'a str) -> BoxStream<'a, StoreResult<ObjectSummary>> {
        stream::once(async move { self.summaries(bucket) })
            .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, StoreError>)))
            .try_flatten()
            .boxed()
    }

    async fn delete(&self, bucket: &str, name: &str) -> StoreResult<()> {
        self.check_online()?;
        if let Some(objects) = self.write().get_mut(bucket) {
            objects.remove(name);
        }
        Ok(())
    }

    async fn list_buckets(&self) -> StoreResult<Vec<String>> {
        self.check_online()?;
        Ok(self.read().keys().cloned().collect())
    }

    fn location(&self) -> String {
        "memory://".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_and_reports_md5_etag() {
        let store = MemoryObjectStore::with_bucket("datasets");

        store
            .put("datasets", "a.csv", Bytes::from_static(b"old"), "text/csv")
            .await
            .unwrap();
        let receipt = store
            .put("datasets", "a.csv", Bytes::from_static(b"hello"), "text/csv")
            .await
            .unwrap();

        assert_eq!(receipt.size, 5);
        assert_eq!(
            receipt.etag.as_deref(),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
        let meta = store.get_metadata("datasets", "a.csv").await.unwrap();
        assert_eq!(meta.size, 5);
        assert_eq!(meta.content_type, "text/csv");
    }

    #[tokio::test]
    async fn list_restarts_on_every_call() {
        let store = MemoryObjectStore::with_bucket("datasets");
        for name in ["b", "a", "c"] {
            store
                .put("datasets", name, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap();
        }

        for _ in 0..2 {
            let names: Vec<String> = store
                .list("datasets")
                .map_ok(|obj| obj.name)
                .try_collect()
                .await
                .unwrap();
            assert_eq!(names, vec!["a", "b", "c"]);
        }
    }

    #[tokio::test]
    async fn missing_object_and_bucket() {
        let store = MemoryObjectStore::with_bucket("datasets");

        let err = store.get_metadata("datasets", "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = store
            .put("other", "a", Bytes::new(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { ref code, .. } if code == "NoSuchBucket"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryObjectStore::with_bucket("datasets");
        store
            .put("datasets", "a", Bytes::from_static(b"x"), "text/plain")
            .await
            .unwrap();

        store.delete("datasets", "a").await.unwrap();
        store.delete("datasets", "a").await.unwrap();
        assert!(store.object_data("datasets", "a").is_none());
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryObjectStore::with_bucket("datasets");
        store.set_offline(true);

        assert!(matches!(
            store.list_buckets().await,
            Err(StoreError::Unavailable(_))
        ));
        let listed: Vec<_> = store.list("datasets").collect().await;
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_err());

        store.set_offline(false);
        assert_eq!(store.list_buckets().await.unwrap(), vec!["datasets"]);
    }
}
