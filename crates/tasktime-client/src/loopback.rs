//! Browser sign-in for the terminal.
//!
//! A throwaway HTTP server on `127.0.0.1` receives Google's redirect. The
//! consent URL carries a PKCE challenge, and the verifier only ever leaves
//! this process in the code exchange.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use tasktime_providers::TokenInfo;
use tasktime_providers::google::{OAuthClient, PkceFlow};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};

/// How long to wait for the user to finish in the browser.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = "<html><body><h1>Autenticação concluída</h1>\
    <p>Você pode fechar esta janela e voltar ao terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h1>Falha na autenticação</h1>\
    <p>Você pode fechar esta janela.</p></body></html>";

/// What Google sent back to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

type Slot = Arc<Mutex<Option<oneshot::Sender<Result<Callback, String>>>>>;

/// Runs the whole flow: consent in the browser, callback, code exchange.
pub async fn authorize(oauth: &OAuthClient) -> ClientResult<TokenInfo> {
    let pkce = PkceFlow::new();

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

    let auth_url = oauth.authorization_url(&pkce.state, &redirect_uri, Some(&pkce))?;
    debug!("authorization URL: {}", auth_url);

    info!("opening browser for Google sign-in");
    if let Err(e) = open::that(&auth_url) {
        warn!("failed to open browser: {}", e);
        eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
    }

    let callback = wait_for_callback(listener, CALLBACK_TIMEOUT).await?;
    if callback.state != pkce.state {
        return Err(ClientError::AuthRequired(
            "OAuth state mismatch, sign-in aborted".to_string(),
        ));
    }

    info!("received authorization code, exchanging for tokens");
    let tokens = oauth
        .exchange_code(&callback.code, &redirect_uri, Some(&pkce.verifier))
        .await?;
    Ok(tokens)
}

/// Serves `/callback` on `listener` until the first redirect arrives.
pub async fn wait_for_callback(
    listener: TcpListener,
    timeout: Duration,
) -> ClientResult<Callback> {
    let (tx, rx) = oneshot::channel();
    let slot: Slot = Arc::new(Mutex::new(Some(tx)));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/callback", get(receive))
        .with_state(slot);

    tokio::spawn(async move {
        let shutdown = async {
            let _ = stop_rx.await;
        };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            warn!("callback server failed: {}", e);
        }
    });

    let outcome = tokio::time::timeout(timeout, rx).await;
    let _ = stop_tx.send(());

    match outcome {
        Ok(Ok(Ok(callback))) => Ok(callback),
        Ok(Ok(Err(reason))) => Err(ClientError::AuthRequired(reason)),
        Ok(Err(_)) => Err(ClientError::Server(
            "callback server stopped before sign-in finished".to_string(),
        )),
        Err(_) => Err(ClientError::Timeout(format!(
            "no sign-in callback after {} seconds",
            timeout.as_secs()
        ))),
    }
}

async fn receive(
    State(slot): State<Slot>,
    Query(query): Query<CallbackQuery>,
) -> (StatusCode, Html<&'static str>) {
    let result = match (query.error, query.code) {
        (Some(error), _) => Err(format!("authorization denied: {}", error)),
        (None, Some(code)) if !code.is_empty() => Ok(Callback {
            code,
            state: query.state.unwrap_or_default(),
        }),
        _ => Err("callback carried no authorization code".to_string()),
    };

    let page = if result.is_ok() {
        (StatusCode::OK, Html(SUCCESS_PAGE))
    } else {
        (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE))
    };

    if let Some(tx) = slot.lock().await.take() {
        let _ = tx.send(result);
    }
    page
}
