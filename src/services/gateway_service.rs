//! Upload-then-analyze orchestration.
//!
//! Each upload is written to the object store and, when the file name looks
//! tabular, sent to the analytics worker. Both calls run concurrently. The
//! store write is mandatory: its failure fails the request. The analysis is
//! best-effort: whatever happens to it is reported inside the response.
//!
//! The service holds no mutable state; the store and the analytics client are
//! injected at construction and shared between requests.

use crate::{
    models::{
        gateway::{
            AnalyticsOutcome, DeleteResult, FileEntry, FileInfo, FileList, HealthReport,
            IncomingFile, ServiceInfo, UploadResult,
        },
        object::DEFAULT_CONTENT_TYPE,
    },
    services::{
        analytics_client::AnalyticsClient,
        object_store::{ObjectStore, StoreError},
    },
};
use bytes::Bytes;
use futures::TryStreamExt;
use std::{sync::Arc, time::Instant};
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

pub const SERVICE_NAME: &str = "dataset-gateway";

/// Name suffixes routed to the analytics worker (compared case-insensitively).
const TABULAR_SUFFIXES: [&str; 1] = [".csv"];

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),
    #[error("file '{0}' not found")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(#[source] StoreError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Clone)]
pub struct GatewayService {
    store: Arc<dyn ObjectStore>,
    analytics: Arc<dyn AnalyticsClient>,
    bucket: String,
}

/// True when `filename` should be analyzed.
pub fn is_tabular(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    TABULAR_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

impl GatewayService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        analytics: Arc<dyn AnalyticsClient>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            analytics,
            bucket: bucket.into(),
        }
    }

    pub fn info(&self) -> ServiceInfo {
        ServiceInfo {
            service: SERVICE_NAME.to_string(),
            status: "running".to_string(),
            bucket: self.bucket.clone(),
            endpoint: self.store.location(),
        }
    }

    /// Validate, persist, and (for tabular files) analyze one upload.
    pub async fn upload(&self, file: IncomingFile) -> GatewayResult<UploadResult> {
        let filename = file
            .filename
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| GatewayError::Validation("no filename provided".into()))?;
        let content_type = file
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let span = info_span!("upload", request_id = %Uuid::new_v4(), filename = %filename);
        self.persist_and_analyze(filename, content_type, file.data)
            .instrument(span)
            .await
    }

    async fn persist_and_analyze(
        &self,
        filename: String,
        content_type: String,
        data: Bytes,
    ) -> GatewayResult<UploadResult> {
        let started = Instant::now();
        info!("uploading {} bytes ({})", data.len(), content_type);

        let persist = self
            .store
            .put(&self.bucket, &filename, data.clone(), &content_type);
        let analyze = self.analyze(&filename, &content_type, data);
        let (stored, analytics) = tokio::join!(persist, analyze);

        let receipt = stored.map_err(|err| {
            error!("storage write failed: {}", err);
            GatewayError::Storage(err)
        })?;

        info!(
            "stored {} bytes in bucket `{}` (etag {:?}) in {:?}",
            receipt.size,
            self.bucket,
            receipt.etag,
            started.elapsed()
        );

        Ok(UploadResult {
            message: format!(
                "File '{}' uploaded successfully to bucket '{}'",
                filename, self.bucket
            ),
            filename,
            status: "uploaded".to_string(),
            storage: "object-store".to_string(),
            bucket: self.bucket.clone(),
            size_bytes: receipt.size,
            analytics,
        })
    }

    async fn analyze(&self, filename: &str, content_type: &str, data: Bytes) -> AnalyticsOutcome {
        if !is_tabular(filename) {
            debug!("not tabular, skipping analysis");
            return AnalyticsOutcome::Skipped;
        }

        let started = Instant::now();
        let outcome = self.analytics.analyze(filename, content_type, data).await;
        match &outcome {
            AnalyticsOutcome::Completed(record) => info!(
                "analysis finished: {} rows x {} columns in {:?}",
                record.row_count,
                record.column_names.len(),
                started.elapsed()
            ),
            AnalyticsOutcome::ServiceError(msg) => warn!("analytics service error: {}", msg),
            AnalyticsOutcome::Unreachable(cause) => warn!("analytics unreachable: {}", cause),
            AnalyticsOutcome::Skipped => {}
        }
        outcome
    }

    /// Enumerate every object in the bucket.
    pub async fn list_files(&self) -> GatewayResult<FileList> {
        let files: Vec<FileEntry> = self
            .store
            .list(&self.bucket)
            .map_ok(FileEntry::from)
            .try_collect()
            .await
            .map_err(GatewayError::Storage)?;

        Ok(FileList {
            bucket: self.bucket.clone(),
            file_count: files.len(),
            files,
        })
    }

    pub async fn file_info(&self, name: &str) -> GatewayResult<FileInfo> {
        match self.store.get_metadata(&self.bucket, name).await {
            Ok(obj) => Ok(FileInfo::from(obj)),
            Err(StoreError::NotFound { .. }) => Err(GatewayError::NotFound(name.to_string())),
            Err(err) => Err(GatewayError::Storage(err)),
        }
    }

    /// Delete `name`; reports success whether or not it existed.
    pub async fn delete_file(&self, name: &str) -> GatewayResult<DeleteResult> {
        self.store
            .delete(&self.bucket, name)
            .await
            .map_err(GatewayError::Storage)?;
        info!("deleted `{}` from bucket `{}`", name, self.bucket);

        Ok(DeleteResult {
            filename: name.to_string(),
            status: "deleted".to_string(),
            message: format!("File '{}' deleted successfully", name),
        })
    }

    /// Check the store. A failing check yields a degraded report, never an error.
    pub async fn health(&self) -> HealthReport {
        match self.store.list_buckets().await {
            Ok(buckets) => HealthReport {
                status: "healthy".to_string(),
                service: SERVICE_NAME.to_string(),
                storage_connected: true,
                available_buckets: buckets,
                bucket: self.bucket.clone(),
                error: None,
            },
            Err(err) => {
                warn!("storage health check failed: {}", err);
                HealthReport {
                    status: "degraded".to_string(),
                    service: SERVICE_NAME.to_string(),
                    storage_connected: false,
                    available_buckets: Vec::new(),
                    bucket: self.bucket.clone(),
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::statistics::StatisticsRecord, services::memory_store::MemoryObjectStore,
        services::statistics,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Runs the statistics engine in-process, like a healthy worker would.
    struct InlineAnalytics {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalyticsClient for InlineAnalytics {
        async fn analyze(&self, _: &str, _: &str, data: Bytes) -> AnalyticsOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match statistics::analyze(&data) {
                Ok(record) => AnalyticsOutcome::Completed(record),
                Err(err) => AnalyticsOutcome::ServiceError(format!("analysis failed: {err}")),
            }
        }
    }

    /// Always answers with the same outcome.
    struct FixedAnalytics(AnalyticsOutcome);

    #[async_trait]
    impl AnalyticsClient for FixedAnalytics {
        async fn analyze(&self, _: &str, _: &str, _: Bytes) -> AnalyticsOutcome {
            self.0.clone()
        }
    }

    fn service_with(
        store: Arc<MemoryObjectStore>,
        analytics: Arc<dyn AnalyticsClient>,
    ) -> GatewayService {
        GatewayService::new(store, analytics, "datasets")
    }

    fn inline() -> Arc<InlineAnalytics> {
        Arc::new(InlineAnalytics {
            calls: AtomicUsize::new(0),
        })
    }

    fn csv_file(name: &str, body: &'static [u8]) -> IncomingFile {
        IncomingFile {
            filename: Some(name.to_string()),
            content_type: Some("text/csv".to_string()),
            data: Bytes::from_static(body),
        }
    }

    #[test]
    fn tabular_classification_ignores_case() {
        assert!(is_tabular("data.csv"));
        assert!(is_tabular("DATA.CSV"));
        assert!(is_tabular("nested/report.Csv"));
        assert!(!is_tabular("notes.txt"));
        assert!(!is_tabular("csv"));
        assert!(!is_tabular("data.csv.gz"));
    }

    #[tokio::test]
    async fn csv_upload_is_stored_and_analyzed() {
        let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
        let service = service_with(store.clone(), inline());

        let result = service
            .upload(csv_file("data.csv", b"a,b\n1,2\n3,4\n"))
            .await
            .unwrap();

        assert_eq!(result.status, "uploaded");
        assert_eq!(result.bucket, "datasets");
        assert_eq!(result.size_bytes, 12);
        assert_eq!(
            store.object_data("datasets", "data.csv").as_deref(),
            Some(&b"a,b\n1,2\n3,4\n"[..])
        );

        let AnalyticsOutcome::Completed(record) = &result.analytics else {
            panic!("expected statistics, got {:?}", result.analytics);
        };
        assert_eq!(record.row_count, 2);
        assert_eq!(record.column_names, vec!["a", "b"]);
        assert_eq!(record.summary["a"].mean, Some(2.0));
    }

    #[tokio::test]
    async fn non_tabular_upload_skips_analysis() {
        let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
        let analytics = inline();
        let service = service_with(store, analytics.clone());

        let result = service
            .upload(IncomingFile {
                filename: Some("notes.txt".into()),
                content_type: None,
                data: Bytes::from_static(b"hello"),
            })
            .await
            .unwrap();

        assert_eq!(result.analytics, AnalyticsOutcome::Skipped);
        assert_eq!(analytics.calls.load(Ordering::SeqCst), 0);
        assert_eq!(serde_json::to_value(&result).unwrap()["analytics"], json!({}));
    }

    #[tokio::test]
    async fn missing_filename_is_rejected_before_storage() {
        let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
        let service = service_with(store.clone(), inline());

        for filename in [None, Some("   ".to_string())] {
            let err = service
                .upload(IncomingFile {
                    filename,
                    content_type: None,
                    data: Bytes::from_static(b"a\n1\n"),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::Validation(_)));
        }
        assert!(service.list_files().await.unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn analytics_failures_never_fail_the_upload() {
        let cases = [
            (
                AnalyticsOutcome::Unreachable("connection refused".into()),
                "could not connect to analytics: connection refused",
            ),
            (
                AnalyticsOutcome::ServiceError("analysis failed: malformed input".into()),
                "analytics service error: analysis failed: malformed input",
            ),
        ];

        for (outcome, expected) in cases {
            let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
            let service = service_with(store.clone(), Arc::new(FixedAnalytics(outcome)));

            let result = service
                .upload(csv_file("data.csv", b"a\n1\n"))
                .await
                .unwrap();

            let body = serde_json::to_value(&result).unwrap();
            assert_eq!(body["analytics"], json!({ "error": expected }));
            assert!(store.object_data("datasets", "data.csv").is_some());
        }
    }

    #[tokio::test]
    async fn storage_failure_fails_the_upload() {
        let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
        store.set_offline(true);
        let service = service_with(store, inline());

        let err = service
            .upload(csv_file("data.csv", b"a\n1\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Storage(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn upload_then_stat_round_trips_size_and_type() {
        let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
        let service = service_with(store, inline());

        service
            .upload(csv_file("data.csv", b"a,b\n1,2\n"))
            .await
            .unwrap();
        service
            .upload(IncomingFile {
                filename: Some("blob.bin".into()),
                content_type: Some(String::new()),
                data: Bytes::from_static(b"\x00\x01"),
            })
            .await
            .unwrap();

        let info = service.file_info("data.csv").await.unwrap();
        assert_eq!(info.size, 8);
        assert_eq!(info.content_type, "text/csv");

        let info = service.file_info("blob.bin").await.unwrap();
        assert_eq!(info.size, 2);
        assert_eq!(info.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn missing_file_info_is_not_found() {
        let service = service_with(Arc::new(MemoryObjectStore::with_bucket("datasets")), inline());
        let err = service.file_info("ghost.csv").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(ref name) if name == "ghost.csv"));
    }

    #[tokio::test]
    async fn delete_twice_reports_the_same_success() {
        let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
        let service = service_with(store, inline());
        service
            .upload(csv_file("data.csv", b"a\n1\n"))
            .await
            .unwrap();

        let first = service.delete_file("data.csv").await.unwrap();
        let second = service.delete_file("data.csv").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.status, "deleted");
        assert_eq!(service.list_files().await.unwrap().file_count, 0);
    }

    #[tokio::test]
    async fn list_maps_every_object() {
        let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
        let service = service_with(store, inline());
        for name in ["b.csv", "a.txt"] {
            service
                .upload(csv_file(name, b"x\n1\n"))
                .await
                .unwrap();
        }

        let list = service.list_files().await.unwrap();
        assert_eq!(list.bucket, "datasets");
        assert_eq!(list.file_count, 2);
        assert_eq!(list.files[0].name, "a.txt");
        assert_eq!(list.files[1].size, 4);
        assert!(list.files[1].etag.is_some());
    }

    #[tokio::test]
    async fn health_degrades_instead_of_failing() {
        let store = Arc::new(MemoryObjectStore::with_bucket("datasets"));
        let service = service_with(store.clone(), inline());

        let healthy = service.health().await;
        assert_eq!(healthy.status, "healthy");
        assert_eq!(healthy.available_buckets, vec!["datasets"]);

        store.set_offline(true);
        let degraded = service.health().await;
        assert_eq!(degraded.status, "degraded");
        assert!(!degraded.storage_connected);
        assert!(degraded.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn completed_outcome_serializes_as_the_record() {
        let record: StatisticsRecord = statistics::analyze(b"a\n1\n").unwrap();
        let value = serde_json::to_value(AnalyticsOutcome::Completed(record.clone())).unwrap();
        assert_eq!(value, serde_json::to_value(record).unwrap());
    }
}
