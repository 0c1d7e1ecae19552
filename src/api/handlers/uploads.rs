use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::api::response::ApiError;
use crate::AppState;

/// Serve a stored event image.
/// Route: GET /uploads/*name
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let path = state
        .uploads
        .resolve(&name)
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => return Err(ApiError::internal(format!("Failed to open upload: {e}"))),
    };
    let byte_size = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read upload metadata: {e}")))?
        .len();

    let mut response = (StatusCode::OK, Body::from_stream(ReaderStream::new(file))).into_response();
    let headers = response.headers_mut();

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        mime.essence_str()
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(byte_size));

    // Stored names are never reused
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
