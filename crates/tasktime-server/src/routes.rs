//! HTTP routes.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, Request, State};
use axum::http::header::{self, HeaderValue};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tasktime_core::{CalendarEvent, MonthSummary, OutputFormat, monthly_summary, render_summary};
use tasktime_providers::google::random_state;
use tasktime_providers::{Authenticator, CalendarSource, GoogleProvider};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::session::SessionStore;

const LOGIN_HINT: &str = "Não autenticado. Acesse /api/auth para entrar com a conta Google.";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub source: Arc<dyn CalendarSource>,
    pub auth: Arc<dyn Authenticator>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates state from separate event source and authenticator.
    pub fn new(
        config: ServerConfig,
        source: Arc<dyn CalendarSource>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new(config.session_ttl, config.pending_ttl)),
            source,
            auth,
            config: Arc::new(config),
        }
    }

    /// Creates state backed by Google for both sign-in and events.
    pub fn google(config: ServerConfig, provider: GoogleProvider) -> Self {
        let provider = Arc::new(provider);
        Self::new(config, provider.clone(), provider)
    }

    fn session_id(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.config.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    fn session_cookie(&self, id: String) -> Cookie<'static> {
        let max_age =
            time::Duration::try_from(self.config.session_ttl).unwrap_or(time::Duration::WEEK);
        Cookie::build((self.config.cookie_name.clone(), id))
            .http_only(true)
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.config.secure_cookies)
            .max_age(max_age)
            .build()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth", get(start_auth))
        .route("/auth/callback/google", get(auth_callback))
        .route("/auth/status", get(auth_status))
        .route("/logout", get(logout).post(logout))
        .route("/calendar", get(calendar))
        .route("/summary", get(summary))
        .layer(middleware::map_response(no_store));

    Router::new()
        .route("/", get(index))
        .nest("/api", api)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn no_store(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, max-age=0"),
    );
    response
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    debug!(
        "{} {} -> {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

async fn start_auth(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    state.sessions.purge_expired().await;

    let existing = state.session_id(&jar);
    let id = state.sessions.get_or_create(existing.as_deref()).await;

    let oauth_state = random_state();
    state.sessions.set_pending_state(&id, oauth_state.clone()).await;

    let url = state.auth.authorization_url(&oauth_state).map_err(|e| {
        error!("failed to build authorization URL: {}", e);
        ApiError::internal("Erro ao iniciar autenticação")
    })?;

    debug!("redirecting to consent screen");
    Ok((jar.add(state.session_cookie(id)), Redirect::temporary(&url)))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

async fn auth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), ApiError> {
    if let Some(reason) = params.error.as_deref() {
        warn!("sign-in was not completed: {}", reason);
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Código de autorização não fornecido"))?;

    let id = state
        .session_id(&jar)
        .ok_or_else(|| ApiError::bad_request("Sessão de autenticação não encontrada"))?;

    let expected = state.sessions.take_pending_state(&id).await;
    if expected.is_none() || expected != params.state {
        warn!("OAuth state mismatch on callback");
        return Err(ApiError::bad_request("Estado de autenticação inválido"));
    }

    let tokens = state.auth.exchange_code(&code).await.map_err(|e| {
        error!("token exchange failed: {}", e);
        ApiError::internal("Erro ao obter token")
    })?;

    // The pre-login id may have been planted; tokens only go to a fresh one.
    let expired = || ApiError::bad_request("Sessão de autenticação expirada");
    let id = state.sessions.rotate(&id).await.ok_or_else(expired)?;
    if !state.sessions.set_tokens(&id, tokens).await {
        return Err(expired());
    }

    info!("user signed in");
    Ok((jar.add(state.session_cookie(id)), Redirect::temporary("/")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthStatus {
    is_logged_in: bool,
}

async fn auth_status(State(state): State<AppState>, jar: CookieJar) -> Json<AuthStatus> {
    let is_logged_in = match state.session_id(&jar) {
        Some(id) => state.sessions.tokens(&id).await.is_some(),
        None => false,
    };
    Json(AuthStatus { is_logged_in })
}

#[derive(Debug, Serialize)]
struct LogoutResult {
    success: bool,
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, Json<LogoutResult>) {
    let cleared = match state.session_id(&jar) {
        Some(id) => state.sessions.clear_tokens(&id).await,
        None => false,
    };

    if cleared {
        info!("user signed out");
        (StatusCode::OK, Json(LogoutResult { success: true }))
    } else {
        (StatusCode::UNAUTHORIZED, Json(LogoutResult { success: false }))
    }
}

async fn calendar(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let events = fetch_events(&state, &jar).await?;
    Ok(Json(events))
}

async fn summary(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Vec<MonthSummary>>, ApiError> {
    let events = fetch_events(&state, &jar).await?;
    Ok(Json(monthly_summary(&events)))
}

async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    let signed_in = match state.session_id(&jar) {
        Some(id) => state.sessions.tokens(&id).await.is_some(),
        None => false,
    };
    if !signed_in {
        return Ok(LOGIN_HINT.into_response());
    }

    let events = fetch_events(&state, &jar).await?;
    let report = render_summary(&monthly_summary(&events), OutputFormat::Tty).map_err(|e| {
        error!("failed to render summary: {}", e);
        ApiError::internal("Erro ao gerar resumo")
    })?;
    Ok(report.into_response())
}

/// Fetches the session user's events.
///
/// Tokens are copied out of the store before the request and written back
/// if they were refreshed. An authentication failure signs the session out.
async fn fetch_events(state: &AppState, jar: &CookieJar) -> Result<Vec<CalendarEvent>, ApiError> {
    let id = state.session_id(jar).ok_or_else(ApiError::not_signed_in)?;
    let mut tokens = state
        .sessions
        .tokens(&id)
        .await
        .ok_or_else(ApiError::not_signed_in)?;

    let outcome = state
        .source
        .fetch_events(&mut tokens, state.config.fetch_options())
        .await;

    match outcome {
        Ok(result) => {
            if result.tokens_refreshed {
                debug!("storing refreshed tokens");
                state.sessions.update_tokens(&id, tokens).await;
            }
            Ok(result.events)
        }
        Err(e) => {
            if e.is_authentication() {
                state.sessions.clear_tokens(&id).await;
            }
            Err(ApiError::from_fetch(&e))
        }
    }
}
