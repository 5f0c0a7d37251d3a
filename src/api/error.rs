//! api::error
//!
//! HTTP mapping of [`GatewayError`].
//!
//! Every failure leaves the server as `{ "error": <code>, "message": <text> }`
//! with the status the error class calls for. Server-side failures are logged
//! at `error` before they are returned.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gateway::{CreationFailure, GatewayError};

/// Error body returned by every failing route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// A failed request.
#[derive(Debug)]
pub enum ApiError {
    /// The operation itself failed
    Gateway(GatewayError),
    /// The request body or query string could not be read
    BadRequest(String),
    /// The blocking task running the operation died
    Internal(String),
}

impl ApiError {
    /// Status code for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Gateway(err) => gateway_status(err),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Gateway(err) => ErrorBody {
                error: err.code(),
                message: err.to_string(),
            },
            ApiError::BadRequest(message) => ErrorBody {
                error: "invalid_request",
                message: message.clone(),
            },
            ApiError::Internal(message) => ErrorBody {
                error: "internal_error",
                message: message.clone(),
            },
        }
    }
}

fn gateway_status(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::RepositoryNotFound { .. } | GatewayError::ObjectNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        GatewayError::InvalidEncoding(_) | GatewayError::InvalidArgument(_) => {
            StatusCode::BAD_REQUEST
        }
        GatewayError::RepositoryCreationFailed { reason, .. } => match reason {
            CreationFailure::Exists => StatusCode::CONFLICT,
            CreationFailure::InvalidName => StatusCode::BAD_REQUEST,
            CreationFailure::Io => StatusCode::INTERNAL_SERVER_ERROR,
        },
        GatewayError::WriteConflict(_) => StatusCode::CONFLICT,
        GatewayError::Git(_) | GatewayError::Lock(_) | GatewayError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            tracing::error!(code = body.error, message = %body.message, "request failed");
        } else {
            tracing::debug!(code = body.error, message = %body.message, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
