//! Google-backed [`CalendarSource`] and [`Authenticator`].

use tracing::{debug, info, instrument};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{Authenticator, BoxFuture, CalendarSource, FetchOptions, FetchResult};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenInfo;

const PROVIDER_NAME: &str = "google";

/// Google Calendar event source.
///
/// Holds no user state: tokens are passed in on every call so one provider
/// can serve many sessions.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    config: GoogleConfig,
    oauth: OAuthClient,
    calendar: GoogleCalendarClient,
}

impl GoogleProvider {
    /// Creates a provider after validating `config`.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate()?;
        let oauth = OAuthClient::new(&config)?;
        let calendar = GoogleCalendarClient::new(&config)?;
        Ok(Self {
            config,
            oauth,
            calendar,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Returns the OAuth client, for flows with their own redirect URI.
    pub fn oauth(&self) -> &OAuthClient {
        &self.oauth
    }

    /// Fetches events, refreshing `tokens` at most once.
    ///
    /// An expired token is refreshed up front. Otherwise a 401 from the API
    /// triggers one refresh and one retry. A second failure is returned as is.
    #[instrument(skip_all, fields(provider = PROVIDER_NAME))]
    pub async fn fetch_with_refresh(
        &self,
        tokens: &mut TokenInfo,
        options: FetchOptions,
    ) -> ProviderResult<FetchResult> {
        let mut refreshed = false;

        if tokens.is_expired() {
            debug!("access token expired, refreshing before fetch");
            self.refresh(tokens).await?;
            refreshed = true;
        }

        let events = match self.calendar.list_events(&tokens.access_token, &options).await {
            Ok(events) => events,
            Err(e) if e.is_authentication() && !refreshed && tokens.can_refresh() => {
                info!("access token rejected, refreshing and retrying once");
                self.refresh(tokens).await?;
                refreshed = true;
                self.calendar
                    .list_events(&tokens.access_token, &options)
                    .await?
            }
            Err(e) => return Err(e),
        };

        Ok(FetchResult {
            events,
            tokens_refreshed: refreshed,
        })
    }

    async fn refresh(&self, tokens: &mut TokenInfo) -> ProviderResult<()> {
        let refresh_token = tokens
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::authentication(
                    "access token expired and no refresh token is available, sign in again",
                )
            })?;

        let refreshed = self.oauth.refresh_token(&refresh_token).await?;
        tokens.apply_refresh(refreshed);
        Ok(())
    }
}

impl CalendarSource for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn fetch_events<'a>(
        &'a self,
        tokens: &'a mut TokenInfo,
        options: FetchOptions,
    ) -> BoxFuture<'a, ProviderResult<FetchResult>> {
        Box::pin(async move {
            self.fetch_with_refresh(tokens, options)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}

impl Authenticator for GoogleProvider {
    fn authorization_url(&self, state: &str) -> ProviderResult<String> {
        self.oauth
            .authorization_url(state, &self.config.redirect_uri, None)
    }

    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(async move {
            self.oauth
                .exchange_code(code, &self.config.redirect_uri, None)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}
