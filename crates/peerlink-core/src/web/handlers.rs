//! HTTP endpoint handlers for the PeerLink gateway.

#![allow(clippy::missing_errors_doc)]

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::code::ShareCode;
use crate::error::Error;
use crate::file;
use crate::multipart;
use crate::transfer;

use super::error::{ApiError, ApiResult};
use super::state::SharedState;

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Share code, which is also the port the file is offered on
    pub port: u16,
}

/// POST /upload - Store a file and start sharing it.
pub async fn upload(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<UploadResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(ApiError::bad_request(
            "Bad Request: Content-Type must be multipart/form-data",
        ));
    }

    let boundary = multipart::boundary_from_content_type(content_type)
        .ok_or_else(|| ApiError::bad_request("Bad Request: Missing boundary in Content-Type"))?;

    let part = multipart::parse(&body, boundary).map_err(|e| {
        tracing::warn!(error_code = e.code().unwrap_or("-"), "Rejected upload: {}", e);
        ApiError::bad_request("Bad request: Could not parse file content")
    })?;

    let file_name = file::sanitize_file_name(&part.file_name);
    let path = file::store(&state.scratch_dir, &file_name, part.content)
        .await
        .map_err(|e| ApiError::internal(format!("Internal Server Error: {e}")))?;

    let code = match state.sessions.share(&path, &file_name).await {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!("Could not share {}: {}", file_name, e);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ApiError::internal(format!("Internal Server Error: {e}")));
        }
    };

    tracing::info!(
        %code,
        "Upload of {} ({}) shared",
        file_name,
        file::format_size(part.content.len() as u64)
    );
    Ok(Json(UploadResponse { port: code.port() }))
}

/// GET /download/{code} - Pull a share through the gateway.
pub async fn download(
    State(state): State<SharedState>,
    Path(raw_code): Path<String>,
) -> ApiResult<Response> {
    let code = ShareCode::parse(&raw_code).map_err(download_error)?;

    let registry = state.sessions.registry();
    if !registry.generator().contains(code) || registry.get(code).await.is_none() {
        tracing::warn!(%code, error_code = "P002", "Download requested for a code that was never offered");
        return Err(download_error(Error::CodeNotFound(code)));
    }

    let fetched = transfer::fetch(code, &state.download, &state.scratch_dir)
        .await
        .map_err(|e| {
            tracing::warn!(%code, error_code = e.code().unwrap_or("-"), "Download failed: {}", e);
            download_error(e)
        })?;

    let file_name = file::sanitize_file_name(&fetched.file_name);
    let body = Body::from_stream(ReaderStream::new(fetched.file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .header(header::CONTENT_LENGTH, fetched.len)
        .body(body)
        .map_err(|e| ApiError::internal(format!("Internal Server Error: {e}")))
}

/// Answer for a known path with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Answer for an unknown path.
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}

fn download_error(err: Error) -> ApiError {
    if err.is_client_error() {
        ApiError::bad_request(format!("Error downloading file: {err}"))
    } else {
        ApiError::internal(format!("Internal Server Error: {err}"))
    }
}
