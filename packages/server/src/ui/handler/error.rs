//! Mapping of relay errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{RelayError, ValueObjectError},
    infrastructure::dto::http::ErrorDto,
};

/// Error returned by the HTTP handlers
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RelayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            RelayError::SessionEnded(_) => StatusCode::GONE,
            RelayError::SessionActive(_) => StatusCode::CONFLICT,
            RelayError::IdentityConflict(_) => StatusCode::CONFLICT,
            RelayError::AuthError(_) => StatusCode::UNAUTHORIZED,
            RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RelayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(error: RelayError) -> Self {
        Self(error)
    }
}

impl From<ValueObjectError> for ApiError {
    fn from(error: ValueObjectError) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }
        (
            status,
            Json(ErrorDto {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
