//! Client error types.

use std::fmt;

use tasktime_providers::ProviderError;
use tasktime_server::ServerError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Provider error.
    Provider(String),
    /// IO error.
    Io(std::io::Error),
    /// No usable tokens; the user has to sign in.
    AuthRequired(String),
    /// The HTTP server failed.
    Server(String),
    /// Unreadable input (events file).
    Input(String),
    /// Timed out waiting for the browser.
    Timeout(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Provider(msg) => write!(f, "provider error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::AuthRequired(msg) => write!(f, "authentication required: {}", msg),
            Self::Server(msg) => write!(f, "server error: {}", msg),
            Self::Input(msg) => write!(f, "invalid input: {}", msg),
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        if err.is_authentication() {
            Self::AuthRequired(format!(
                "{} (run `tasktime auth google --force` to sign in again)",
                err
            ))
        } else {
            Self::Provider(err.to_string())
        }
    }
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        Self::Server(err.to_string())
    }
}
