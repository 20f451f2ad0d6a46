use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported image format: {0} (expected PNG or JPEG)")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingFailed(String),

    /// The OCR engine is not installed or not on the execution path
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR engine failed: {0}")]
    EngineFailed(String),

    #[error("OCR produced no text")]
    EmptyText,

    #[error("Target line containing '_1_' not found")]
    NoMatch,

    #[error("Image too large (max: {max} bytes)")]
    ImageTooLarge { max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ExtractError::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
            }
            ExtractError::DecodeFailed(_) => (StatusCode::UNPROCESSABLE_ENTITY, "DECODE_FAILED"),
            ExtractError::PreprocessingFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PREPROCESSING_FAILED")
            }
            ExtractError::EngineUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ENGINE_UNAVAILABLE")
            }
            ExtractError::EngineFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_FAILED"),
            ExtractError::EmptyText => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_TEXT"),
            ExtractError::NoMatch => (StatusCode::UNPROCESSABLE_ENTITY, "NO_MATCH"),
            ExtractError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            ExtractError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            ExtractError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ExtractError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ExtractError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_failures_map_to_distinct_codes() {
        let (unavailable, code) =
            ExtractError::EngineUnavailable("tesseract".to_string()).status_and_code();
        assert_eq!(unavailable, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "ENGINE_UNAVAILABLE");

        let (failed, code) = ExtractError::EngineFailed("exit 1".to_string()).status_and_code();
        assert_eq!(failed, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "ENGINE_FAILED");
    }

    #[test]
    fn test_empty_text_and_no_match_are_distinguished() {
        assert_eq!(ExtractError::EmptyText.status_and_code().1, "EMPTY_TEXT");
        assert_eq!(ExtractError::NoMatch.status_and_code().1, "NO_MATCH");
    }
}
