use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use domain::DomainError;

        match error {
            ApplicationError::Domain(DomainError::ValidationError { field, message }) => {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "INVALID_ARGUMENT",
                    format!("{}: {}", field, message),
                )
            }
            ApplicationError::Domain(DomainError::PermissionDenied { action }) => {
                ApiError::new(StatusCode::FORBIDDEN, "PERMISSION_DENIED", action)
            }
            ApplicationError::Domain(DomainError::ResourceNotFound {
                resource_type,
                resource_id,
            }) => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} {} not found", resource_type, resource_id),
            ),
            // 存储层细节不进响应体，留在日志里
            ApplicationError::Domain(DomainError::DatabaseError { .. }) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "service temporarily unavailable",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
