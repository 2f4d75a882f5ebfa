//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API and the mapping
//! from engine errors to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use sciencetree_core::{Locale, SourceFormat, TreeError, primitives::ALGORITHM_VERSION};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub algorithm_version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            algorithm_version: ALGORITHM_VERSION.to_string(),
        }
    }
}

// =============================================================================
// GENERATE REQUEST
// =============================================================================

/// Tree generation request.
///
/// The format comes from `filename`'s extension, or from `format` when no
/// file name is given (`"txt"`, `"bib"`, `"web_of_science"`, `"bibtex"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub seed: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Export file bytes, base64 encoded.
    pub content: String,
    /// Overrides the server's configured label language.
    #[serde(default)]
    pub locale: Option<Locale>,
}

impl GenerateRequest {
    /// Resolve the declared source format.
    pub fn source_format(&self) -> Result<SourceFormat, ApiError> {
        if let Some(filename) = self.filename.as_deref().filter(|f| !f.trim().is_empty()) {
            return Ok(SourceFormat::from_path(filename)?);
        }
        match self.format.as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("web_of_science") || f.eq_ignore_ascii_case("wos") => {
                Ok(SourceFormat::WebOfScience)
            }
            Some(f) if f.eq_ignore_ascii_case("bibtex") => Ok(SourceFormat::Bibtex),
            Some(f) if !f.is_empty() => Ok(SourceFormat::from_extension(f)?),
            _ => Err(ApiError::BadRequest(
                "Either 'filename' or 'format' is required".to_string(),
            )),
        }
    }

    /// Decode the base64 file content. Line breaks are tolerated.
    pub fn decode_content(&self) -> Result<Vec<u8>, ApiError> {
        let compact: String = self.content.split_whitespace().collect();
        STANDARD
            .decode(compact)
            .map_err(|e| ApiError::BadRequest(format!("Invalid base64 content: {}", e)))
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind, e.g. `malformed_input`.
    pub error: String,
    pub message: String,
}

/// Failures of an API request.
#[derive(Debug)]
pub enum ApiError {
    /// The engine rejected the input or failed.
    Tree(TreeError),
    /// The request itself is unusable.
    BadRequest(String),
    /// The decoded upload exceeds the configured limit.
    PayloadTooLarge { size: usize, limit: usize },
    /// The server failed outside the engine.
    Internal(String),
}

impl From<TreeError> for ApiError {
    fn from(error: TreeError) -> Self {
        ApiError::Tree(error)
    }
}

impl ApiError {
    /// HTTP status of this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Tree(TreeError::UnsupportedFormat(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Tree(TreeError::MalformedInput { .. } | TreeError::EmptyTree) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Tree(TreeError::Serialization(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Tree(TreeError::Processing(_) | TreeError::Io(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Whether the client caused the error by what it sent.
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        match self {
            ApiError::Tree(e) => e.is_user_correctable(),
            ApiError::BadRequest(_) | ApiError::PayloadTooLarge { .. } => true,
            ApiError::Internal(_) => false,
        }
    }

    /// Response body of this error.
    #[must_use]
    pub fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Tree(e) => ErrorResponse {
                error: e.kind().to_string(),
                message: e.to_string(),
            },
            ApiError::BadRequest(message) => ErrorResponse {
                error: "bad_request".to_string(),
                message: message.clone(),
            },
            ApiError::PayloadTooLarge { size, limit } => ErrorResponse {
                error: "payload_too_large".to_string(),
                message: format!("Upload of {} bytes exceeds the {} byte limit", size, limit),
            },
            ApiError::Internal(message) => ErrorResponse {
                error: "internal_error".to_string(),
                message: message.clone(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if self.is_client_fault() {
            tracing::debug!(kind = %body.error, "{}", body.message);
        } else {
            tracing::error!(kind = %body.error, status = status.as_u16(), "{}", body.message);
        }
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn request(filename: Option<&str>, format: Option<&str>, content: &str) -> GenerateRequest {
        GenerateRequest {
            seed: "s".to_string(),
            filename: filename.map(String::from),
            format: format.map(String::from),
            content: content.to_string(),
            locale: None,
        }
    }

    #[test]
    fn format_from_filename_or_name() {
        let by_file = request(Some("savedrecs.txt"), None, "");
        assert_eq!(by_file.source_format().expect("format"), SourceFormat::WebOfScience);

        let by_name = request(None, Some("bibtex"), "");
        assert_eq!(by_name.source_format().expect("format"), SourceFormat::Bibtex);

        let by_ext = request(None, Some(".bib"), "");
        assert_eq!(by_ext.source_format().expect("format"), SourceFormat::Bibtex);
    }

    #[test]
    fn missing_format_is_bad_request() {
        let err = request(None, None, "").source_format().expect_err("missing");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unsupported_extension_is_415() {
        let err = request(Some("paper.pdf"), None, "").source_format().expect_err("pdf");
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(err.body().error, "unsupported_format");
    }

    #[test]
    fn content_decoding() {
        let ok = request(None, Some("txt"), "UFQg\nSg==");
        assert_eq!(ok.decode_content().expect("decode"), b"PT J");

        let bad = request(None, Some("txt"), "***");
        assert_eq!(bad.decode_content().expect_err("bad").status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            ApiError::from(TreeError::EmptyTree).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(TreeError::malformed(1, "x")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(TreeError::Processing("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn client_fault_follows_error_kind() {
        assert!(ApiError::from(TreeError::EmptyTree).is_client_fault());
        assert!(ApiError::from(TreeError::UnsupportedFormat(".pdf".into())).is_client_fault());
        assert!(ApiError::BadRequest("x".into()).is_client_fault());
        assert!(ApiError::PayloadTooLarge { size: 2, limit: 1 }.is_client_fault());

        assert!(!ApiError::from(TreeError::Processing("x".into())).is_client_fault());
        assert!(!ApiError::from(TreeError::Serialization("x".into())).is_client_fault());
        assert!(!ApiError::Internal("x".into()).is_client_fault());
    }
}
