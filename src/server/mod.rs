//! HTTP surface for the image store.
//!
//! The store itself is synchronous; handlers run its operations under
//! `spawn_blocking` so the async runtime stays responsive during large
//! stores and retrievals.

pub mod handlers;
pub mod routes;

pub use handlers::{
    debug_image_handler, delete_image_handler, health_handler, list_images_handler,
    retrieve_image_handler, stats_handler, store_image_handler, ApiError, AppState,
    ErrorResponse, HealthResponse, ImagesResponse, OperationResponse,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
