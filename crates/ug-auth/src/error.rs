//! Authentication Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown, expired or already-used state parameter")]
    StateMismatch,

    #[error("Token exchange failed: {message}")]
    TokenExchange { message: String },

    #[error("Invalid ID token: {message}")]
    TokenInvalid { message: String },

    #[error("ID token has expired")]
    TokenExpired,

    #[error("Email domain not allowed: {domain}")]
    DomainDenied { domain: String },

    #[error("Identity provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::TokenExchange {
            message: message.into(),
        }
    }

    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::TokenInvalid {
            message: message.into(),
        }
    }

    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Error response body
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AuthError::StateMismatch => (StatusCode::UNAUTHORIZED, "STATE_MISMATCH"),
            AuthError::TokenExchange { .. } => (StatusCode::UNAUTHORIZED, "TOKEN_EXCHANGE"),
            AuthError::TokenInvalid { .. } => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "TOKEN_EXPIRED"),
            AuthError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::DomainDenied { .. } => (StatusCode::FORBIDDEN, "DOMAIN_DENIED"),
            AuthError::ProviderUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "PROVIDER_UNAVAILABLE")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AuthError::StateMismatch, StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (
                AuthError::DomainDenied {
                    domain: "evil.com".to_string(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                AuthError::provider_unavailable("timeout"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AuthError::configuration("missing client_id"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
