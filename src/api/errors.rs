//! Error type for REST handlers
//!
//! Handlers return `Result<_, ApiError>`; the `IntoResponse` impl maps each
//! variant to a status code and an `ErrorResponse` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::responses::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required parameter was missing or blank
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// The referenced alert does not exist for this user
    #[error("Alert not found: {0}")]
    AlertNotFound(i64),

    /// The referenced holding does not exist for this user
    #[error("Portfolio item not found: {0}")]
    PortfolioItemNotFound(i64),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::AlertNotFound(_) | ApiError::PortfolioItemNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}
