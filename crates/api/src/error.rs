use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use subhub_core::error::CoreError;
use subhub_db::StoreError;
use subhub_pipeline::PipelineError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `subhub_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A request body that failed its field rules.
    #[error("Invalid input: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Core(err.into_core())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Core(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => classify_core_error(core),

            // --- HTTP-specific errors ---
            AppError::Invalid(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                errors.to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a domain error into an HTTP status, error code, and message.
///
/// Pipeline and workflow refusals are client errors (400); only storage
/// failures surfacing as `Internal` map to 500, with the detail logged and
/// withheld from the body.
fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, key } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} {key} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::LanguageExists(lc) => (
            StatusCode::BAD_REQUEST,
            "LANGUAGE_EXISTS",
            format!("language-exists: {lc}"),
        ),
        CoreError::InvalidParent(msg) => {
            (StatusCode::BAD_REQUEST, "INVALID_PARENT", msg.clone())
        }
        CoreError::VersionNotInVideo(_) => (
            StatusCode::BAD_REQUEST,
            "VERSION_NOT_IN_VIDEO",
            err.to_string(),
        ),
        CoreError::ActionError(msg) => (StatusCode::BAD_REQUEST, "ACTION_ERROR", msg.clone()),
        CoreError::WriteLocked { .. } => {
            (StatusCode::BAD_REQUEST, "WRITE_LOCKED", err.to_string())
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        AppError::Core(err).into_response().status()
    }

    #[test]
    fn domain_refusals_are_client_errors() {
        assert_eq!(
            status_of(CoreError::ActionError("no review".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoreError::WriteLocked {
                holder: "alice".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoreError::LanguageExists("fr".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(status_of(CoreError::not_found("Video", "abc")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CoreError::Conflict("race".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(CoreError::Unauthorized("sign in".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(CoreError::Forbidden("no".into())), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(CoreError::Internal("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
