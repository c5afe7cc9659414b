//! Google OAuth and Calendar configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// OAuth 2.0 client credentials from the Google Cloud Console.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// The credentials JSON downloaded from the console.
///
/// Either an `installed`/`web` section, or `client_id`/`client_secret` at the
/// root as written by gcloud.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parses credentials from a console JSON string.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {e}"))
        })?;

        if let Some(section) = file.web.or(file.installed) {
            return Ok(Self::new(section.client_id, section.client_secret));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok(Self::new(id, secret)),
            _ => Err(ProviderError::configuration(
                "credentials JSON needs a 'web' or 'installed' section, or client_id and client_secret at the root",
            )),
        }
    }

    /// Checks that both values are present and the client id looks like a
    /// Google one.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(ProviderError::configuration("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err(ProviderError::configuration(
                "client_id should end with .apps.googleusercontent.com",
            ));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ProviderError::configuration("client_secret is required"));
        }
        Ok(())
    }
}

/// Configuration for talking to Google.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth client credentials.
    pub credentials: OAuthCredentials,

    /// Where Google sends the user back after consent.
    pub redirect_uri: String,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Calendar to read events from.
    pub calendar_id: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// User agent for API requests.
    pub user_agent: String,

    /// Token file used by the CLI.
    pub token_path: PathBuf,

    /// Consent page.
    pub auth_url: String,

    /// Token endpoint for code exchange and refresh.
    pub token_url: String,

    /// Calendar API v3 base URL.
    pub api_base: String,
}

impl GoogleConfig {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Callback route of the bundled web server.
    pub const DEFAULT_REDIRECT_URI: &'static str =
        "http://localhost:3000/api/auth/callback/google";

    /// Identity scopes plus read-only calendar access.
    pub const DEFAULT_SCOPES: &'static [&'static str] = &[
        "openid",
        "email",
        "profile",
        "https://www.googleapis.com/auth/calendar.readonly",
    ];

    /// The signed-in user's main calendar.
    pub const DEFAULT_CALENDAR_ID: &'static str = "primary";

    /// Google's consent page.
    pub const GOOGLE_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// Google's token endpoint.
    pub const GOOGLE_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Google Calendar API v3.
    pub const GOOGLE_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";

    /// Creates a configuration with Google's endpoints and default settings.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            redirect_uri: Self::DEFAULT_REDIRECT_URI.to_string(),
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            calendar_id: Self::DEFAULT_CALENDAR_ID.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("tasktime/{}", env!("CARGO_PKG_VERSION")),
            token_path: Self::default_token_path(),
            auth_url: Self::GOOGLE_AUTH_URL.to_string(),
            token_url: Self::GOOGLE_TOKEN_URL.to_string(),
            api_base: Self::GOOGLE_API_BASE.to_string(),
        }
    }

    /// Returns `~/.local/share/tasktime/google-tokens.json` (platform data dir).
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tasktime")
            .join("google-tokens.json")
    }

    /// Sets the OAuth redirect URI.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the calendar to read.
    pub fn with_calendar_id(mut self, id: impl Into<String>) -> Self {
        self.calendar_id = id.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the token file path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Points every Google endpoint at `base`.
    ///
    /// The consent page becomes `{base}/auth`, the token endpoint
    /// `{base}/token` and the Calendar API `{base}/calendar/v3`.
    pub fn with_endpoint_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = format!("{base}/auth");
        self.token_url = format!("{base}/token");
        self.api_base = format!("{base}/calendar/v3");
        self
    }

    /// Checks credentials, scopes, redirect URI and endpoints.
    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials.validate()?;

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }
        if self.calendar_id.trim().is_empty() {
            return Err(ProviderError::configuration("calendar_id cannot be empty"));
        }

        for (name, value) in [
            ("redirect_uri", &self.redirect_uri),
            ("auth_url", &self.auth_url),
            ("token_url", &self.token_url),
            ("api_base", &self.api_base),
        ] {
            url::Url::parse(value).map_err(|e| {
                ProviderError::configuration(format!("invalid {name} '{value}': {e}"))
            })?;
        }

        Ok(())
    }
}
