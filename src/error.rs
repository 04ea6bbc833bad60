use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Model service error: {0}")]
    Service(String),

    #[error("Unparseable model reply: {0}")]
    Parse(String),

    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<Error>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn stage(stage: &str, source: Error) -> Self {
        Error::StageFailed {
            stage: stage.to_string(),
            source: Box::new(source),
        }
    }

    /// True for failures of the model round trip, which a retry may fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Service(_) | Error::Parse(_) | Error::Reqwest(_) => true,
            Error::StageFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Error::BadRequest(_) | Error::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "wrong_stage"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
            Error::Service(_) | Error::Reqwest(_) => (StatusCode::BAD_GATEWAY, "model_service_error"),
            Error::Parse(_) => (StatusCode::UNPROCESSABLE_ENTITY, "model_reply_unparseable"),
            Error::StageFailed { source, .. } => source.status_and_kind(),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, kind) = self.status_and_kind();
        let message = match &self {
            Error::Reqwest(err) => format!("External service error: {}", err),
            Error::Config(_) | Error::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = match &self {
            Error::StageFailed { stage, .. } => json!({
                "error": kind,
                "message": message,
                "stage": stage,
                "retry": self.is_retryable(),
            }),
            _ => json!({ "error": kind, "message": message }),
        };
        (status, Json(body)).into_response()
    }
}
