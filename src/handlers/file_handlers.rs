//! Gateway handlers for uploads and stored files.
//! Storage and analytics concerns are delegated to `GatewayService`.

use crate::{
    errors::AppError,
    handlers::multipart::read_file_field,
    models::gateway::{DeleteResult, FileInfo, FileList, ServiceInfo, UploadResult},
    services::gateway_service::GatewayService,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
};

/// `GET /`
pub async fn service_info(State(service): State<GatewayService>) -> Json<ServiceInfo> {
    Json(service.info())
}

/// `POST /upload`: store the file, analyze it when tabular.
pub async fn upload_file(
    State(service): State<GatewayService>,
    multipart: Multipart,
) -> Result<Json<UploadResult>, AppError> {
    let file = read_file_field(multipart).await?;
    Ok(Json(service.upload(file).await?))
}

/// `GET /files`
pub async fn list_files(State(service): State<GatewayService>) -> Result<Json<FileList>, AppError> {
    Ok(Json(service.list_files().await?))
}

/// `GET /files/{*name}`
pub async fn file_info(
    State(service): State<GatewayService>,
    Path(name): Path<String>,
) -> Result<Json<FileInfo>, AppError> {
    Ok(Json(service.file_info(&name).await?))
}

/// `DELETE /files/{*name}`
pub async fn delete_file(
    State(service): State<GatewayService>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResult>, AppError> {
    Ok(Json(service.delete_file(&name).await?))
}
