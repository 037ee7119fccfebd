//! Routers for the two HTTP services.
//!
//! Gateway (`Router<GatewayService>`):
//!   - `GET    /`               service info
//!   - `GET    /health`         storage connectivity
//!   - `POST   /upload`         multipart upload + analysis
//!   - `GET    /files`          list stored files
//!   - `GET    /files/{*name}`  file metadata
//!   - `DELETE /files/{*name}`  delete a file
//!
//! Analytics worker:
//!   - `POST   /analyze`        multipart file -> statistics
//!   - `GET    /health`
//!
//! The wildcard `*name` allows nested names like `reports/2025/q1.csv`.

use crate::{
    handlers::{
        analytics_handlers::analyze,
        file_handlers::{delete_file, file_info, list_files, service_info, upload_file},
        health_handlers::{analytics_health, gateway_health},
    },
    services::gateway_service::GatewayService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Gateway routes; request bodies are capped at `max_upload_bytes`.
pub fn gateway_routes(max_upload_bytes: usize) -> Router<GatewayService> {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(gateway_health))
        .route("/upload", post(upload_file))
        .route("/files", get(list_files))
        .route("/files/{*name}", get(file_info).delete(delete_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

pub fn analytics_routes(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(analytics_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
