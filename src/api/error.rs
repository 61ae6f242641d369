// HTTP error surface shared by every handler.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::error;

use crate::auth::{AuthError, LoginError, ProviderError};

/// An error response: a status code plus a JSON body.
///
/// Most bodies are `{"message": ...}`; provider rejections carry the
/// provider's own error object instead.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "message": message.into() }),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// The session is anonymous on a route that needs a user.
    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "JWT must be provided!")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Malformed | AuthError::Expired | AuthError::Revoked => {
                Self::new(StatusCode::UNAUTHORIZED, e.to_string())
            }
            AuthError::Database(msg) => {
                error!("Session lookup failed: {}", msg);
                Self::internal()
            }
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Rejected { status, body } => Self { status, body },
            ProviderError::Transport(_) | ProviderError::InvalidResponse(_) => {
                Self::new(StatusCode::BAD_GATEWAY, e.to_string())
            }
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::Provider(e) => e.into(),
            LoginError::Disabled => Self::forbidden(e.to_string()),
            LoginError::Database(_) | LoginError::Signing(_) => {
                error!("Login failed: {}", e);
                Self::internal()
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("Request failed: {:#}", e);
        Self::internal()
    }
}
