//! API Routes
//!
//! Configures the Axum router with all image CDN endpoints.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{fetch_handler, health_handler, stats_handler, upload_handler, AppState};

/// Headroom over the file limit for multipart boundaries and headers
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /upload` - Transform an uploaded image and cache the rendition
/// - `GET /cdn/:file_name` - Serve a cached rendition
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - Body limit: upload size plus multipart overhead
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = DefaultBodyLimit::max(state.staging.max_bytes() + MULTIPART_OVERHEAD);

    // Build router with all endpoints
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/cdn/:file_name", get(fetch_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
