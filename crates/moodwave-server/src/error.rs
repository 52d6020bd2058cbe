//! Mapping of engine errors to HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use moodwave_core::Error;
use serde_json::json;
use tracing::{error, warn};

/// Error returned by request handlers
#[derive(Debug)]
pub enum AppError {
    /// Engine, store or configuration failure
    Engine(Error),

    /// Nothing stored for the requested user
    NoHistory,

    /// Request body could not be used
    InvalidRequest(String),

    /// Worker task failed
    Internal(String),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Engine(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    /// Status code, machine kind and user-facing message
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Engine(err) => {
                let status = match err {
                    Error::InsufficientSamples { .. } | Error::UndefinedConfidence { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    Error::InvalidRecording(_) => StatusCode::BAD_REQUEST,
                    Error::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
                    Error::InvalidClassifierOutput { .. }
                    | Error::EnsembleConfiguration(_)
                    | Error::ModelLoad { .. }
                    | Error::Config(_)
                    | Error::Io(_)
                    | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind(), err.user_message().to_string())
            }
            AppError::NoHistory => (
                StatusCode::NOT_FOUND,
                "no_history",
                "No sessions have been recorded for this user yet.".to_string(),
            ),
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "An internal error occurred.".to_string(),
            ),
        }
    }

    /// Whether the client may succeed by sending a new request
    pub fn retryable(&self) -> bool {
        match self {
            AppError::Engine(err) => err.is_retryable(),
            AppError::NoHistory | AppError::InvalidRequest(_) | AppError::Internal(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();

        if status.is_server_error() {
            match &self {
                AppError::Engine(err) => error!(kind, error = %err, "Request failed"),
                AppError::Internal(detail) => error!(kind, %detail, "Request failed"),
                _ => {}
            }
        } else if let AppError::Engine(err) = &self {
            warn!(kind, error = %err, "Request rejected");
        }

        let body = json!({
            "error": {
                "kind": kind,
                "message": message,
                "retryable": self.retryable(),
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                Error::InsufficientSamples {
                    required: 1,
                    available: 0,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::UndefinedConfidence { windows: 1 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (Error::recording("bad row"), StatusCode::BAD_REQUEST),
            (Error::persistence("disk full"), StatusCode::SERVICE_UNAVAILABLE),
            (
                Error::invalid_output("knn", "rows do not sum to 1"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                Error::model_load(PathBuf::from("/secret/model.json"), "missing"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let (status, kind, _) = AppError::from(err).parts();
            assert_eq!(status, expected, "kind {}", kind);
        }
    }

    #[test]
    fn test_messages_do_not_leak_internals() {
        let err = AppError::from(Error::model_load(
            PathBuf::from("/secret/model.json"),
            "missing",
        ));
        let (_, kind, message) = err.parts();

        assert_eq!(kind, "model_load");
        assert!(!message.contains("secret"));
    }

    #[test]
    fn test_retryable_follows_error_kind() {
        let short = AppError::from(Error::InsufficientSamples {
            required: 1,
            available: 0,
        });
        assert!(short.retryable());
        assert!(AppError::from(Error::persistence("disk full")).retryable());
        assert!(!AppError::from(Error::ensemble("no members")).retryable());
        assert!(!AppError::NoHistory.retryable());
    }
}
