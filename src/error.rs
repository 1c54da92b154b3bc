use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::llm::ModelError;

/// Errors raised by the persistence traits.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique value (e.g. a user's email) is already taken.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    /// The record failed validation before it was written.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Application-level error type for services and HTTP handlers.
///
/// Every variant maps to a stable machine-readable `code` and an HTTP status,
/// see [`AppError::code`] and [`AppError::status`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Missing or malformed credential.
    #[error("{0}")]
    Unauthenticated(String),

    /// Well-formed credential that does not resolve to a user.
    #[error("{0}")]
    InvalidCredential(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The model provider failed or produced nothing usable.
    #[error("script generation failed: {0}")]
    UpstreamGeneration(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::InvalidCredential(_) => "INVALID_CREDENTIAL",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::UpstreamGeneration(_) => "UPSTREAM_GENERATION_ERROR",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::InvalidCredential(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamGeneration(_)
            | AppError::Persistence(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(what) => AppError::Conflict(format!("{what} already registered")),
            StoreError::Invalid(msg) => AppError::Validation(msg),
            StoreError::Database(e) => AppError::Persistence(e.to_string()),
        }
    }
}

impl From<ModelError> for AppError {
    fn from(e: ModelError) -> Self {
        AppError::UpstreamGeneration(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

/// `Json` body extractor whose rejections use the [`AppError`] envelope.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Persistence(detail) => {
                error!(error = %detail, "persistence error");
                "A storage error occurred".to_string()
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "An internal error occurred".to_string()
            }
            AppError::UpstreamGeneration(detail) => {
                error!(error = %detail, "upstream generation error");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.code(),
            "error": message,
        });
        (status, Json(body)).into_response()
    }
}

/// Collects per-field validation messages into a single [`AppError::Validation`].
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` when `value` is blank after trimming.
    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.0.push(format!("{field} is required"));
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn into_result(self) -> AppResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.0.join("; ")))
        }
    }
}
