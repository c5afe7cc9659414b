//! Client configuration.
//!
//! Everything lives in one `config.toml`, by default
//! `~/.config/tasktime/config.toml`:
//!
//! ```toml
//! [google]
//! client_id = "xxx.apps.googleusercontent.com"
//! client_secret = "env::GOOGLE_CLIENT_SECRET"
//! calendar_id = "primary"
//!
//! [calendar]
//! lookback_days = 90
//! max_results = 500
//!
//! [server]
//! bind = "127.0.0.1:3000"
//! ```
//!
//! `client_id` and `client_secret` accept `pass::` and `env::` references,
//! see [`crate::secret`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tasktime_providers::{DEFAULT_MAX_RESULTS, FetchOptions, GoogleConfig, OAuthCredentials};
use tasktime_server::ServerConfig;

/// Configuration for the tasktime CLI and server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug logging.
    pub debug: bool,

    /// Google sign-in and calendar settings.
    pub google: Option<GoogleSettings>,

    /// Which events to fetch.
    pub calendar: CalendarSettings,

    /// HTTP server settings.
    pub server: ServerSettings,
}

/// Fetch window settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Fetch events starting this many days ago. Zero means from now.
    pub lookback_days: u32,

    /// Cap on fetched events. Zero fetches everything in range.
    pub max_results: usize,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            lookback_days: 0,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl CalendarSettings {
    /// The cap as the provider expects it.
    pub fn max_results(&self) -> Option<usize> {
        (self.max_results > 0).then_some(self.max_results)
    }

    /// Fetch options for these settings.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new()
            .with_lookback_days(self.lookback_days)
            .with_max_results(self.max_results())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listen address.
    pub bind: SocketAddr,

    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,

    /// Session lifetime in hours.
    pub session_ttl_hours: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind: defaults.bind,
            secure_cookies: defaults.secure_cookies,
            session_ttl_hours: defaults.session_ttl.as_secs() / 3600,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path. A missing file gives the
    /// defaults.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tasktime")
            .join("config.toml")
    }

    /// Builds the server configuration.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.server.bind)
            .with_secure_cookies(self.server.secure_cookies)
            .with_session_ttl(Duration::from_secs(self.server.session_ttl_hours * 3600))
            .with_lookback_days(self.calendar.lookback_days)
            .with_max_results(self.calendar.max_results())
    }

    /// Where the CLI keeps its tokens.
    pub fn token_path(&self) -> PathBuf {
        self.google
            .as_ref()
            .and_then(|g| g.token_path.clone())
            .unwrap_or_else(GoogleConfig::default_token_path)
    }
}

/// Google settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// OAuth client ID (`pass::` and `env::` accepted).
    pub client_id: Option<String>,

    /// OAuth client secret (`pass::` and `env::` accepted).
    pub client_secret: Option<String>,

    /// Redirect URI registered for the web server.
    pub redirect_uri: Option<String>,

    /// Calendar to read.
    pub calendar_id: Option<String>,

    /// Token file for the CLI.
    pub token_path: Option<PathBuf>,
}

impl GoogleSettings {
    /// Builds the provider configuration, resolving secret references.
    pub fn to_provider_config(&self) -> Result<GoogleConfig, String> {
        let credentials = self.resolve_credentials()?;
        credentials.validate().map_err(|e| e.to_string())?;

        let mut config = GoogleConfig::new(credentials);
        if let Some(ref uri) = self.redirect_uri {
            config = config.with_redirect_uri(uri);
        }
        if let Some(ref id) = self.calendar_id {
            config = config.with_calendar_id(id);
        }
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        Ok(config)
    }

    /// Resolves `client_id` and `client_secret`. Both must be set.
    pub fn resolve_credentials(&self) -> Result<OAuthCredentials, String> {
        let raw_id = self.client_id.as_deref().ok_or_else(|| {
            format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"\n\n  \
                 Or run: tasktime auth google --credentials-file <path>",
                ClientConfig::default_path().display()
            )
        })?;
        let raw_secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| "client_secret is missing from the [google] section".to_string())?;

        let client_id = crate::secret::resolve(raw_id)
            .map_err(|e| format!("failed to resolve client_id: {}", e))?;
        let client_secret = crate::secret::resolve(raw_secret)
            .map_err(|e| format!("failed to resolve client_secret: {}", e))?;

        Ok(OAuthCredentials::new(client_id, client_secret))
    }

    /// Returns a copy with non-empty overrides applied.
    pub fn merged(
        &self,
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Self {
        let pick = |over: Option<String>, base: &Option<String>| {
            over.filter(|v| !v.is_empty()).or_else(|| base.clone())
        };
        Self {
            client_id: pick(client_id, &self.client_id),
            client_secret: pick(client_secret, &self.client_secret),
            redirect_uri: pick(redirect_uri, &self.redirect_uri),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert!(config.google.is_none());
        assert_eq!(config.calendar, CalendarSettings::default());
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:3000");
        assert_eq!(config.server.session_ttl_hours, 168);
    }

    #[test]
    fn full_file() {
        let config: ClientConfig = toml::from_str(
            r#"
debug = true

[google]
client_id = "toml-id.apps.googleusercontent.com"
client_secret = "toml-secret"
redirect_uri = "https://tasks.example.com/api/auth/callback/google"
calendar_id = "team@example.com"

[calendar]
lookback_days = 90
max_results = 0

[server]
bind = "0.0.0.0:8080"
secure_cookies = true
session_ttl_hours = 24
"#,
        )
        .unwrap();

        assert!(config.debug);
        assert_eq!(config.calendar.max_results(), None);

        let provider = config.google.as_ref().unwrap().to_provider_config().unwrap();
        assert_eq!(provider.credentials.client_id, "toml-id.apps.googleusercontent.com");
        assert_eq!(provider.calendar_id, "team@example.com");
        assert_eq!(
            provider.redirect_uri,
            "https://tasks.example.com/api/auth/callback/google"
        );

        let server = config.server_config();
        assert_eq!(server.bind.port(), 8080);
        assert!(server.secure_cookies);
        assert_eq!(server.session_ttl, Duration::from_secs(86_400));
        assert_eq!(server.lookback_days, 90);
        assert_eq!(server.max_results, None);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nbind = \"not an address\"\n").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(err.contains("failed to parse"));

        let err = ClientConfig::load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.contains("failed to read"));
    }

    #[test]
    fn token_path_override() {
        let mut config = ClientConfig::default();
        assert_eq!(config.token_path(), GoogleConfig::default_token_path());

        config.google = Some(GoogleSettings {
            token_path: Some(PathBuf::from("/tmp/tokens.json")),
            ..Default::default()
        });
        assert_eq!(config.token_path(), PathBuf::from("/tmp/tokens.json"));
    }

    #[test]
    fn credentials_from_env_references() {
        unsafe {
            std::env::set_var("_TT_CFG_ID", "env-id.apps.googleusercontent.com");
            std::env::set_var("_TT_CFG_SECRET", "env-secret");
        }

        let settings = GoogleSettings {
            client_id: Some("env::_TT_CFG_ID".to_string()),
            client_secret: Some("env::_TT_CFG_SECRET".to_string()),
            ..Default::default()
        };
        let creds = settings.resolve_credentials().unwrap();
        assert_eq!(creds.client_id, "env-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "env-secret");

        unsafe {
            std::env::remove_var("_TT_CFG_ID");
            std::env::remove_var("_TT_CFG_SECRET");
        }
    }

    #[test]
    fn missing_credentials_error() {
        let err = GoogleSettings::default().resolve_credentials().unwrap_err();
        assert!(err.contains("credentials not found"));

        let err = GoogleSettings {
            client_id: Some("id.apps.googleusercontent.com".to_string()),
            ..Default::default()
        }
        .resolve_credentials()
        .unwrap_err();
        assert!(err.contains("client_secret"));
    }

    #[test]
    fn overrides_win_unless_empty() {
        let base = GoogleSettings {
            client_id: Some("file-id".to_string()),
            client_secret: Some("file-secret".to_string()),
            calendar_id: Some("work".to_string()),
            ..Default::default()
        };

        let merged = base.merged(
            Some("flag-id".to_string()),
            Some(String::new()),
            Some("http://localhost:4000/api/auth/callback/google".to_string()),
        );
        assert_eq!(merged.client_id.as_deref(), Some("flag-id"));
        assert_eq!(merged.client_secret.as_deref(), Some("file-secret"));
        assert_eq!(merged.calendar_id.as_deref(), Some("work"));
        assert!(merged.redirect_uri.is_some());
    }
}
