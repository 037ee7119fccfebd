//! Shared extraction of the `file` part of a multipart form.

use crate::{errors::AppError, models::gateway::IncomingFile};
use axum::extract::{Multipart, multipart::MultipartError};
use bytes::Bytes;

/// Form field that carries the upload.
pub const FILE_FIELD: &str = "file";

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

/// Read the `file` field into memory. A form without one yields an empty,
/// nameless file so validation can reject it with a proper message.
pub async fn read_file_field(mut multipart: Multipart) -> Result<IncomingFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        return Ok(IncomingFile {
            filename,
            content_type,
            data,
        });
    }

    Ok(IncomingFile {
        filename: None,
        content_type: None,
        data: Bytes::new(),
    })
}
