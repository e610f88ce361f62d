use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use speech_client::SpeechError;
use studio_core::WavError;
use thiserror::Error;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid audio: {0}")]
    Audio(#[from] WavError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Speech generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Audio(WavError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Audio(WavError::PayloadTooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Speech(SpeechError::EmptyText) => StatusCode::BAD_REQUEST,
            ApiError::Speech(SpeechError::MissingApiKey) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Speech(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            ApiError::InvalidInput(msg) => msg.clone(),
            ApiError::Speech(e) => {
                tracing::error!("Speech error: {}", e);
                e.to_string()
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                msg.clone()
            }
            other => {
                tracing::warn!("{}", other);
                other.to_string()
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
