//! Analytics worker: `POST /analyze` runs the statistics engine on the
//! uploaded bytes and returns the record.

use crate::{
    errors::AppError,
    handlers::multipart::read_file_field,
    models::statistics::StatisticsRecord,
    services::statistics,
};
use axum::{Json, extract::Multipart};
use std::time::Instant;
use tracing::{info, warn};

pub async fn analyze(multipart: Multipart) -> Result<Json<StatisticsRecord>, AppError> {
    let file = read_file_field(multipart).await?;
    let filename = file.filename.unwrap_or_default();
    let started = Instant::now();

    let data = file.data;
    let result = tokio::task::spawn_blocking(move || statistics::analyze(&data))
        .await
        .map_err(|err| AppError::internal(format!("analysis task failed: {err}")))?;

    match result {
        Ok(record) => {
            info!(
                "analyzed `{}`: {} rows x {} columns in {:?}",
                filename,
                record.row_count,
                record.column_names.len(),
                started.elapsed()
            );
            Ok(Json(record))
        }
        Err(err) => {
            warn!("analysis of `{}` failed: {}", filename, err);
            Err(AppError::bad_request(format!("analysis failed: {err}")))
        }
    }
}
