use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use studybuddy_core::CoreError;
use studybuddy_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        ServerError::Core(e.into())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Core(CoreError::NotFound(_)) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Core(CoreError::Duplicate(_)) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::Core(CoreError::InvalidInput(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            // Never leak raw storage errors to the caller.
            ServerError::Core(CoreError::Store(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage temporarily unavailable".to_string(),
            ),
            ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_expected_status_codes() {
        let cases = [
            (
                ServerError::Core(CoreError::NotFound("user".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::Core(CoreError::Duplicate("review".into())),
                StatusCode::CONFLICT,
            ),
            (
                ServerError::Core(CoreError::InvalidInput("rating".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServerError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
