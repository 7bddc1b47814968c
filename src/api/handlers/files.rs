use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppQuery, JSend};
use crate::file_store::FileLocator;
use crate::storage::models::{
    metadata_from_json, metadata_to_json, FileRecord, Metadata, UploadOptions,
    DEFAULT_CONTENT_TYPE,
};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub chunk_size: u32,
    pub content_type: String,
    pub filename: String,
    pub id: String,
    pub length: u64,
    pub locator: String,
    pub metadata: Option<serde_json::Value>,
    pub upload_date: String,
}

#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub exists: bool,
    pub locator: String,
}

#[derive(Debug, Deserialize)]
pub struct LocatorParams {
    pub locator: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut part_content_type: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut metadata: Option<Metadata> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                if file_name.is_none() {
                    file_name = field.file_name().map(|s| s.to_string());
                }
                part_content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                file_data = Some(data);
            }
            "filename" => {
                file_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid filename: {e}")))?,
                );
            }
            "content_type" => {
                content_type = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid content_type: {e}")))?,
                );
            }
            "metadata" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid metadata: {e}")))?;
                let parsed: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(&text).map_err(|e| {
                        ApiError::bad_request(format!("metadata must be a JSON object: {e}"))
                    })?;
                metadata = Some(metadata_from_json(&parsed).map_err(ApiError::bad_request)?);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let file_name = file_name.unwrap_or_default();

    // Explicit field, then the part's Content-Type, then a guess from the filename
    let content_type = content_type
        .filter(|ct| !ct.trim().is_empty())
        .or_else(|| part_content_type.filter(|ct| ct != DEFAULT_CONTENT_TYPE))
        .or_else(|| {
            mime_guess::from_path(&file_name)
                .first()
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

    let mut options = UploadOptions::default().with_content_type(content_type);
    options.metadata = metadata;

    let (locator, record) = state
        .file_store
        .upload_with_record(file_data, &file_name, options)
        .await?;

    Ok(JSend::success(file_to_response(&locator, &record)))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<FileResponse>>>, ApiError> {
    let files = state.file_store.list().await?;
    Ok(JSend::success(
        files
            .iter()
            .map(|(locator, record)| file_to_response(locator, record))
            .collect(),
    ))
}

pub async fn get_file_info(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<LocatorParams>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let record = state.file_store.info(&params.locator).await?;
    let locator = state.file_store.locator_for(&record.id);
    Ok(JSend::success(file_to_response(&locator, &record)))
}

pub async fn file_exists(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<LocatorParams>,
) -> Result<Json<JSend<ExistsResponse>>, ApiError> {
    let exists = state.file_store.exists(&params.locator).await?;
    Ok(JSend::success(ExistsResponse {
        exists,
        locator: params.locator,
    }))
}

/// Serve raw file content.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<LocatorParams>,
) -> Result<Response, ApiError> {
    let record = state.file_store.info(&params.locator).await?;
    let data = state.file_store.download(&params.locator).await?;
    let length = data.len();

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        record
            .content_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        header::HeaderValue::from(length),
    );

    if let Ok(value) = format!("attachment; filename=\"{}\"", record.filename.replace('"', ""))
        .parse()
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Objects are immutable once uploaded
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("private, max-age=3600"),
    );

    Ok(response)
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<LocatorParams>,
) -> Result<Json<JSend<()>>, ApiError> {
    state.file_store.delete(&params.locator).await?;
    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

fn file_to_response(locator: &FileLocator, record: &FileRecord) -> FileResponse {
    FileResponse {
        chunk_size: record.chunk_size,
        content_type: record.content_type.clone(),
        filename: record.filename.clone(),
        id: record.id.to_hex(),
        length: record.length,
        locator: locator.to_string(),
        metadata: record.metadata.as_ref().map(metadata_to_json),
        upload_date: record.upload_date.to_rfc3339(),
    }
}
