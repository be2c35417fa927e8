use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// An error answered as `{"success": false, "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl ApiError {
    pub const fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"success": false, "message": self.message})),
        )
            .into_response()
    }
}

pub const DATABASE_UNAVAILABLE: ApiError =
    ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Database service unavailable.");
pub const MISSING_FIELDS: ApiError =
    ApiError::new(StatusCode::BAD_REQUEST, "Missing required fields.");
pub const MISSING_CREDENTIALS: ApiError =
    ApiError::new(StatusCode::BAD_REQUEST, "Missing email or password.");
pub const EMAIL_TAKEN: ApiError = ApiError::new(
    StatusCode::CONFLICT,
    "This email address is already in use.",
);
pub const INVALID_CREDENTIALS: ApiError =
    ApiError::new(StatusCode::UNAUTHORIZED, "Invalid email or password.");
pub const INTERNAL: ApiError =
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred.");
pub const NO_PDF: ApiError = ApiError::new(StatusCode::BAD_REQUEST, "No PDF file provided.");
pub const NO_TEXT: ApiError = ApiError::new(
    StatusCode::INTERNAL_SERVER_ERROR,
    "Could not read text from PDF.",
);
pub const SUMMARY_FAILED: ApiError = ApiError::new(
    StatusCode::INTERNAL_SERVER_ERROR,
    "Failed to get summary from AI.",
);
pub const SUMMARY_INVALID: ApiError = ApiError::new(
    StatusCode::INTERNAL_SERVER_ERROR,
    "AI returned an invalid format.",
);
