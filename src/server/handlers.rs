//! HTTP request handlers for the image store API.
//!
//! # Endpoints
//!
//! - `POST /images/{id}` - Store an image (multipart field `image`)
//! - `GET /images/{id}` - Retrieve an image as PNG
//! - `GET /images/{id}/debug` - Per-tile storage map as PNG
//! - `DELETE /images/{id}` - Delete an image
//! - `GET /images` - List stored image IDs
//! - `GET /stats` - Storage statistics
//! - `GET /health` - Health check

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::StoreError;
use crate::store::{ImageStore, StorageStats};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to all handlers via Axum's State
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// The image store backing every endpoint
    pub store: Arc<ImageStore>,
}

impl AppState {
    /// Create application state around an open store.
    pub fn new(store: Arc<ImageStore>) -> Self {
        Self { store }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    /// Service version
    pub version: String,
}

/// Response from the image list endpoint.
#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    /// Stored image IDs in ascending order
    pub images: Vec<String>,

    /// Number of stored images
    pub count: usize,
}

/// Response for successful store/delete operations.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    /// Always "success"
    pub status: String,

    /// The image the operation applied to
    pub image_id: String,

    /// Human-readable confirmation
    pub message: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Handler-level error wrapping store errors and request-shape problems.
#[derive(Debug)]
pub enum ApiError {
    /// An error from the store itself
    Store(StoreError),

    /// Malformed request (bad multipart, wrong content type, ...)
    BadRequest(String),

    /// Upload exceeds the configured size limit
    PayloadTooLarge,

    /// Task execution failure
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Convert errors to HTTP responses, logging 4xx at WARN and 5xx at ERROR.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::Store(StoreError::NotFound { id }) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Image not found: {id}"),
            ),
            ApiError::Store(StoreError::Codec { message }) => (
                StatusCode::BAD_REQUEST,
                "invalid_image",
                format!("Image could not be decoded: {message}"),
            ),
            ApiError::Store(StoreError::InvalidInput { message }) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                message.clone(),
            ),
            ApiError::Store(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                err.to_string(),
            ),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "invalid_request", message.clone())
            }
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                "Uploaded image exceeds the size limit".to_string(),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message.clone(),
            ),
        };

        if status.is_server_error() {
            error!(%status, error_type, "{message}");
        } else {
            warn!(%status, error_type, "{message}");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });
        (status, body).into_response()
    }
}

/// Run a blocking store operation off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

// =============================================================================
// Handlers
// =============================================================================

/// Accepted upload content types.
const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// `POST /images/{id}` - store an image from a multipart upload.
pub async fn store_image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut image_data = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to parse form: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        if let Some(content_type) = field.content_type() {
            if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
                return Err(ApiError::BadRequest(format!(
                    "unsupported image type {content_type}; supported: PNG, JPEG"
                )));
            }
        }

        let bytes = field.bytes().await.map_err(|e| {
            // The body limit layer surfaces as a field read failure
            if e.to_string().contains("length limit") {
                ApiError::PayloadTooLarge
            } else {
                ApiError::BadRequest(format!("failed to read image field: {e}"))
            }
        })?;
        image_data = Some(bytes);
        break;
    }

    let Some(data) = image_data else {
        return Err(ApiError::BadRequest(
            "missing image file (multipart field \"image\")".to_string(),
        ));
    };

    let store = Arc::clone(&state.store);
    let image_id = id.clone();
    run_blocking(move || store.store_image(&image_id, &data)).await?;

    let body = Json(OperationResponse {
        status: "success".to_string(),
        image_id: id,
        message: "Image stored successfully".to_string(),
    });
    Ok((StatusCode::CREATED, body))
}

/// `GET /images/{id}` - retrieve an image as PNG.
pub async fn retrieve_image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let store = Arc::clone(&state.store);
    let image_id = id.clone();
    let png = run_blocking(move || store.retrieve_image(&image_id)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{id}.png\""),
            ),
        ],
        png,
    )
        .into_response())
}

/// `GET /images/{id}/debug` - per-tile storage map as PNG.
pub async fn debug_image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let store = Arc::clone(&state.store);
    let png = run_blocking(move || store.retrieve_debug_image(&id)).await?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// `DELETE /images/{id}` - delete an image's manifest.
pub async fn delete_image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = Arc::clone(&state.store);
    let image_id = id.clone();
    run_blocking(move || store.delete_image(&image_id)).await?;

    Ok(Json(OperationResponse {
        status: "success".to_string(),
        image_id: id,
        message: "Image deleted successfully".to_string(),
    }))
}

/// `GET /images` - list stored image IDs.
pub async fn list_images_handler(
    State(state): State<AppState>,
) -> Result<Json<ImagesResponse>, ApiError> {
    let store = Arc::clone(&state.store);
    let images = run_blocking(move || store.list_images()).await?;

    let count = images.len();
    Ok(Json(ImagesResponse { images, count }))
}

/// `GET /stats` - storage statistics.
pub async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<StorageStats>, ApiError> {
    let store = Arc::clone(&state.store);
    let stats = run_blocking(move || store.storage_stats()).await?;
    Ok(Json(stats))
}

/// `GET /health` - health check.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "tilestore".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
