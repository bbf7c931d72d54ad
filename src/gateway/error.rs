use crate::storage::StorageError;
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request or missing input
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    PayloadTooLarge { message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(err) => match err {
                StorageError::InvalidInput(_) | StorageError::NotAFile(_) => StatusCode::BAD_REQUEST,
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::ResourceExhausted { .. } | StorageError::Io { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Message returned to the client. IO failures name the operation that
    /// failed but not the server-side path.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message } | Self::PayloadTooLarge { message } => message.clone(),
            Self::Storage(err) => match err {
                StorageError::InvalidInput(message) => message.clone(),
                StorageError::NotFound(_) => "File does not exist".to_string(),
                StorageError::NotAFile(_) => "Not a valid file".to_string(),
                StorageError::ResourceExhausted { .. } => err.to_string(),
                StorageError::Io { context, .. } => format!("Failed to {context}"),
            },
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge {
                message: "Upload exceeds the maximum allowed size".to_string(),
            }
        } else {
            Self::bad_request(format!("Failed to parse multipart data: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Internal service error: {:#}", self);
        } else {
            tracing::debug!("Client error: {}", self);
        }

        (status, Json(json!({ "detail": self.user_message() }))).into_response()
    }
}
