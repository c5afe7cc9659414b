//! OAuth 2.0 authorization code flow against Google.
//!
//! The web server uses the plain confidential-client flow: consent URL with a
//! random `state`, then a code exchange with the client secret. The CLI adds
//! PKCE (RFC 7636) on top, since its loopback redirect can be observed by
//! other local processes.
//!
//! Both flows request `access_type=offline` and `prompt=consent` so Google
//! always hands back a refresh token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::{RefreshedToken, TokenInfo};

/// Verifier entropy in bytes (43 characters once encoded).
const CODE_VERIFIER_BYTES: usize = 32;

/// State entropy in bytes.
const STATE_BYTES: usize = 16;

/// Client for Google's consent page and token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    scopes: Vec<String>,
    auth_url: String,
    token_url: String,
    http: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client from the Google configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            credentials: config.credentials.clone(),
            scopes: config.scopes.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            http,
        })
    }

    /// Builds the consent page URL.
    pub fn authorization_url(
        &self,
        state: &str,
        redirect_uri: &str,
        pkce: Option<&PkceFlow>,
    ) -> ProviderResult<String> {
        let mut url = Url::parse(&self.auth_url).map_err(|e| {
            ProviderError::configuration(format!("invalid auth URL '{}'", self.auth_url))
                .with_source(e)
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.credentials.client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", &self.scopes.join(" "))
                .append_pair("access_type", "offline")
                .append_pair("prompt", "consent")
                .append_pair("state", state);
            if let Some(pkce) = pkce {
                query
                    .append_pair("code_challenge", &pkce.challenge)
                    .append_pair("code_challenge_method", "S256");
            }
        }

        Ok(url.into())
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// `verifier` must be the PKCE verifier when the consent URL carried a
    /// challenge.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: Option<&str>,
    ) -> ProviderResult<TokenInfo> {
        let mut params = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        if let Some(verifier) = verifier {
            params.push(("code_verifier", verifier));
        }

        let response = self.post_token(&params, "token exchange").await?;
        let scopes = response
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| self.scopes.clone());

        info!("obtained tokens from authorization code");
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes,
        ))
    }

    /// Obtains a new access token with a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self.post_token(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: response.access_token,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
        })
    }

    async fn post_token(
        &self,
        params: &[(&str, &str)],
        context: &str,
    ) -> ProviderResult<TokenResponse> {
        debug!("POST {} ({})", self.token_url, context);

        let response = self.http.post(&self.token_url).form(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // invalid_grant and friends come back as 400: the code or
            // refresh token is no longer any good.
            let err = ProviderError::from_status(status.as_u16(), context, &body);
            return Err(match status.as_u16() {
                400 | 401 => ProviderError::authentication(err.message()),
                _ => err,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid {context} response")).with_source(e)
        })
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// PKCE verifier, its S256 challenge and an anti-CSRF state.
#[derive(Debug, Clone)]
pub struct PkceFlow {
    /// Sent with the code exchange.
    pub verifier: String,
    /// Sent with the consent URL.
    pub challenge: String,
    /// Echoed back by Google on the redirect.
    pub state: String,
}

impl PkceFlow {
    /// Creates a flow with a fresh verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_BYTES);
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
            state: random_state(),
        }
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns a random URL-safe string for the OAuth `state` parameter.
pub fn random_state() -> String {
    random_token(STATE_BYTES)
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
