use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::business_logic::error::PatternError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not enough data: {0}")]
    InsufficientData(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<PatternError> for AppError {
    fn from(error: PatternError) -> Self {
        match error {
            PatternError::InsufficientData { .. } => AppError::InsufficientData(error.to_string()),
            PatternError::InvalidConfig(_) => AppError::Validation(error.to_string()),
            PatternError::InvalidSample { .. } => AppError::Internal(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_errors_map_to_distinct_statuses() {
        let insufficient: AppError = PatternError::InsufficientData { need: 11, got: 4 }.into();
        assert_eq!(insufficient.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(insufficient.to_string().contains("need 11 samples, got 4"));

        let config: AppError = PatternError::InvalidConfig("bad".to_string()).into();
        assert_eq!(config.status(), StatusCode::BAD_REQUEST);

        let sample: AppError = PatternError::InvalidSample {
            index: 3,
            reason: "price must be finite and positive",
        }
        .into();
        assert_eq!(sample.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
