//! API Module
//!
//! HTTP handlers and routing for the image CDN REST API.
//!
//! # Endpoints
//! - `POST /upload` - Submit an image for transformation
//! - `GET /cdn/:file_name` - Fetch a cached rendition
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
