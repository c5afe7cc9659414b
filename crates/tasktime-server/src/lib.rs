//! HTTP API: Google sign-in, calendar events and monthly summaries.
//!
//! Routes:
//! - `GET /api/auth` starts the OAuth flow
//! - `GET /api/auth/callback/google` finishes it
//! - `GET /api/auth/status`, `GET|POST /api/logout`
//! - `GET /api/calendar` returns the raw events
//! - `GET /api/summary` returns the monthly summary as JSON
//! - `GET /` prints the summary as text
//!
//! # Example
//!
//! ```rust,no_run
//! use tasktime_providers::{GoogleConfig, GoogleProvider, OAuthCredentials};
//! use tasktime_server::{AppState, ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let google = GoogleConfig::new(OAuthCredentials::new(
//!         "client-id.apps.googleusercontent.com",
//!         "secret",
//!     ));
//!     let state = AppState::google(ServerConfig::default(), GoogleProvider::new(google)?);
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod routes;
mod session;
mod signals;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use config::{DEFAULT_PENDING_TTL, DEFAULT_SESSION_TTL, ServerConfig};
pub use error::{ApiError, ServerError, ServerResult};
pub use routes::{AppState, router};
pub use session::SessionStore;
pub use signals::{ShutdownSignal, SignalHandler};

/// Binds the configured address and serves until SIGTERM or Ctrl-C.
pub async fn serve(state: AppState) -> ServerResult<()> {
    let addr = state.config.bind;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::bind(addr, e))?;

    let signals = SignalHandler::new();
    signals.spawn_listener();

    serve_on(listener, state, signals.shutdown().wait()).await
}

/// Serves on an already bound listener until `shutdown` completes.
pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("server stopped");
    Ok(())
}
