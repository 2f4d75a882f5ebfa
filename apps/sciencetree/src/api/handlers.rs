//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{ApiError, GenerateRequest, HealthResponse},
};
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use sciencetree_core::{TreeResult, export, generate_tree_with};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// GENERATE HANDLER
// =============================================================================

/// Generate a tree from an uploaded export file.
///
/// Generation runs on a blocking worker; each request owns its data.
pub async fn generate_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let format = request.source_format()?;
    let bytes = request.decode_content()?;

    let limit = state.config.max_upload_bytes;
    if bytes.len() > limit {
        return Err(ApiError::PayloadTooLarge {
            size: bytes.len(),
            limit,
        });
    }

    let mut options = state.config.tree.clone();
    if let Some(locale) = request.locale {
        options.locale = locale;
    }

    tracing::info!(seed = %request.seed, %format, bytes = bytes.len(), "Generating tree");
    let seed = request.seed;
    let result = tokio::task::spawn_blocking(move || {
        generate_tree_with(&seed, &bytes, format, &options)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Generation task failed: {}", e)))??;

    tracing::info!(
        nodes = result.metadata.node_count,
        links = result.metadata.link_count,
        "Tree generated"
    );
    Ok((StatusCode::CREATED, Json(result)))
}

// =============================================================================
// EXPORT HANDLERS
// =============================================================================

/// Re-serialize a result as a downloadable JSON document.
pub async fn export_json_handler(
    Json(result): Json<TreeResult>,
) -> Result<impl IntoResponse, ApiError> {
    let body = export::to_json(&result)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&result.metadata.seed, "json")),
        ],
        body,
    ))
}

/// Render a result's summary table as CSV.
pub async fn export_csv_handler(Json(result): Json<TreeResult>) -> impl IntoResponse {
    let body = export::to_csv(&result);
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&result.metadata.seed, "csv")),
        ],
        body,
    )
}

/// `Content-Disposition` value with a file name derived from the seed.
fn attachment(seed: &str, extension: &str) -> String {
    let stem: String = seed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.trim_matches('_').is_empty() {
        "sciencetree".to_string()
    } else {
        stem
    };
    format!("attachment; filename=\"{}.{}\"", stem, extension)
}
