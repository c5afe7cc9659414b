//! Server error types.

use std::io;
use std::net::SocketAddr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tasktime_providers::ProviderError;
use thiserror::Error;
use tracing::{error, warn};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind the listen address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// IO error while serving.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ServerError {
    /// Creates a bind error.
    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }
}

/// A request failure, rendered as `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Creates an error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// No tokens in the session.
    pub fn not_signed_in() -> Self {
        Self::unauthorized("Token de autenticação não encontrado")
    }

    /// Maps a failed event fetch. Only authentication failures reach the
    /// client as 401; everything else is a generic 500.
    pub fn from_fetch(err: &ProviderError) -> Self {
        if err.is_authentication() {
            warn!("calendar fetch rejected: {}", err);
            Self::unauthorized("Sessão expirada, faça login novamente")
        } else {
            error!("calendar fetch failed: {}", err);
            Self::internal("Erro ao buscar eventos")
        }
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_map_to_status() {
        let auth = ApiError::from_fetch(&ProviderError::authentication("expired"));
        assert_eq!(auth.status(), StatusCode::UNAUTHORIZED);

        let upstream = ApiError::from_fetch(&ProviderError::server("HTTP 503"));
        assert_eq!(upstream.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.message(), "Erro ao buscar eventos");

        let network = ApiError::from_fetch(&ProviderError::network("timed out"));
        assert_eq!(network.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_signed_in_is_401() {
        let err = ApiError::not_signed_in();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn server_error_display() {
        let err = ServerError::bind(
            "127.0.0.1:3000".parse().unwrap(),
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );
        assert_eq!(
            err.to_string(),
            "failed to bind 127.0.0.1:3000: address in use"
        );
    }
}
