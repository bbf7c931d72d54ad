use super::error::{ApiError, Result};
use super::AppState;
use crate::callback::CallbackAck;
use crate::storage::{sanitize, FileInfo, StagedFile, UploadReceipt};
use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;

#[derive(Debug, Deserialize)]
pub struct FilenameQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Storage Engine is running", "docs": "/docs" }))
}

pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileInfo>>> {
    Ok(Json(state.storage.list().await?))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<Value>> {
    let filename = query.filename.unwrap_or_default();
    state.storage.delete(&filename).await?;
    tracing::info!(file = %filename, "File deleted");
    Ok(Json(json!({ "message": "File deleted successfully", "filename": filename })))
}

pub async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadReceipt>> {
    let mut upload: Option<(String, StagedFile)> = None;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(ApiError::bad_request("Filename cannot be empty"));
        }

        let mut staged = state.storage.stage()?;
        while let Some(chunk) = field.chunk().await? {
            staged.write_chunk(&chunk).await?;
        }
        upload = Some((original, staged));
        break;
    }

    let (original, staged) = upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let bytes = staged.len();
    let sanitized = sanitize(&original);
    let stored = state.storage.place_unique(staged, &sanitized).await?;
    let info = state.storage.info(&stored).await?;

    tracing::info!(
        original = %original,
        file = %stored,
        bytes,
        "File uploaded"
    );
    Ok(Json(UploadReceipt::new(&original, &sanitized, info)))
}

pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response> {
    let filename = query.file_name.unwrap_or_default();
    let (file, info) = state.storage.open(&filename).await?;

    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|_| ApiError::bad_request("Filename cannot be sent as a header"))?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
        (header::CONTENT_LENGTH, HeaderValue::from(info.pure_content_length)),
        (header::CONTENT_DISPOSITION, disposition),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// Document server callback. Always answers 200 with an ack body.
pub async fn track(
    State(state): State<AppState>,
    Query(query): Query<FilenameQuery>,
    body: Bytes,
) -> Json<CallbackAck> {
    let filename = query.filename.unwrap_or_default();
    Json(state.callbacks.handle(&filename, &body).await)
}

// ASCII fallback plus the RFC 5987 form for non-ASCII names.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_carries_both_filename_forms() {
        assert_eq!(
            content_disposition("plan.docx"),
            "attachment; filename=\"plan.docx\"; filename*=UTF-8''plan.docx"
        );
        assert_eq!(
            content_disposition("报告.docx"),
            "attachment; filename=\"__.docx\"; filename*=UTF-8''%E6%8A%A5%E5%91%8A.docx"
        );
    }
}
