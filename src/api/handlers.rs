//! API Handlers
//!
//! HTTP request handlers for each image CDN endpoint.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{CacheStore, OUTPUT_CONTENT_TYPE};
use crate::config::Config;
use crate::error::{CdnError, Result};
use crate::models::{HealthResponse, StatsResponse, TransformQuery, UploadResponse};
use crate::staging::{validate_source, StagedAsset, StagingArea};
use crate::transform::{ImageTransformer, JpegTransformer, Orchestrator};

/// Application state shared across all handlers.
///
/// Built once at startup; cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    /// Where uploads are spooled
    pub staging: StagingArea,
    /// Miss-to-entry pipeline, owns the cache store
    pub orchestrator: Orchestrator,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(staging: StagingArea, orchestrator: Orchestrator) -> Self {
        Self {
            staging,
            orchestrator,
        }
    }

    /// Creates a new AppState from configuration, creating both directories.
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::with_transformer(config, Arc::new(JpegTransformer)).await
    }

    /// Like [`AppState::from_config`] with a custom transform capability.
    pub async fn with_transformer(
        config: &Config,
        transformer: Arc<dyn ImageTransformer>,
    ) -> Result<Self> {
        let staging = StagingArea::open(&config.upload_dir, config.max_upload_bytes).await?;
        let store = Arc::new(CacheStore::open(&config.cache_dir).await?);
        Ok(Self::new(staging, Orchestrator::new(store, transformer)))
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        self.orchestrator.store()
    }
}

/// Handler for POST /upload
///
/// Accepts a multipart `file` field plus `width`, `height` and `quality`
/// query parameters and returns the URL of the cached rendition.
pub async fn upload_handler(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let spec = TransformQuery::from_pairs(&pairs).to_spec();

    let asset = stage_upload(&state.staging, multipart)
        .await?
        .ok_or_else(|| CdnError::Validation("No file uploaded.".to_string()))?;

    let rendition = state.orchestrator.process(asset, spec).await?;
    Ok(Json(rendition.into()))
}

/// Streams the `file` field into the staging area. Other fields are ignored.
async fn stage_upload(
    staging: &StagingArea,
    mut multipart: Multipart,
) -> Result<Option<StagedAsset>> {
    let limit = staging.max_bytes();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        validate_source(&file_name, &content_type)?;

        let mut writer = staging.begin(content_type).await?;
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
            writer.write_chunk(&chunk).await?;
        }
        return writer.finish().await.map(Some);
    }

    Ok(None)
}

fn multipart_error(err: MultipartError, limit: usize) -> CdnError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        CdnError::PayloadTooLarge(limit)
    } else {
        CdnError::Validation(err.body_text())
    }
}

/// Handler for GET /cdn/:file_name
///
/// Serves the raw bytes of a cached rendition.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response> {
    match state.store().read(&file_name).await? {
        Some(bytes) => Ok(([(header::CONTENT_TYPE, OUTPUT_CONTENT_TYPE)], bytes).into_response()),
        None => Err(CdnError::NotFound(file_name)),
    }
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.store().stats().snapshot().into())
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
