//! Error types for the image CDN
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == CDN Error Enum ==
/// Unified error type for the caching core and its HTTP surface.
#[derive(Error, Debug)]
pub enum CdnError {
    /// Malformed, missing or wrong-type source upload
    #[error("{0}")]
    Validation(String),

    /// Source upload exceeds the configured size limit
    #[error("Upload exceeds maximum size of {0} bytes")]
    PayloadTooLarge(usize),

    /// Requested path escapes the cache root
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Requested cache entry is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// The image transform failed (decode, resize or encode)
    #[error("Image processing failed: {0}")]
    Processing(String),

    /// Cache store or staging I/O failed
    #[error("Storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

// == IntoResponse Implementation ==
impl IntoResponse for CdnError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CdnError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CdnError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            CdnError::AccessDenied(_) => (StatusCode::FORBIDDEN, "Access denied.".to_string()),
            CdnError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found.".to_string()),
            // Internal details stay in the logs
            CdnError::Processing(_) | CdnError::Storage(_) => {
                tracing::error!("Request failed: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process the image.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the image CDN.
pub type Result<T> = std::result::Result<T, CdnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CdnError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (CdnError::PayloadTooLarge(10), StatusCode::PAYLOAD_TOO_LARGE),
            (CdnError::AccessDenied("../x".into()), StatusCode::FORBIDDEN),
            (CdnError::NotFound("a.jpg".into()), StatusCode::NOT_FOUND),
            (
                CdnError::Processing("decode".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CdnError::Storage(std::io::Error::other("disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_io_error_converts_to_storage() {
        let err: CdnError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, CdnError::Storage(_)));
    }
}
