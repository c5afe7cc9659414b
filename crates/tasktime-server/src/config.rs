//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tasktime_providers::{DEFAULT_MAX_RESULTS, FetchOptions};

/// Sessions (and their cookie) last a week.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// A sign-in that has not reached the callback is dropped after five minutes.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(5 * 60);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Mark the session cookie `Secure` (HTTPS deployments).
    pub secure_cookies: bool,

    /// How long a session survives without signing in again.
    pub session_ttl: Duration,

    /// How long a session without tokens survives.
    pub pending_ttl: Duration,

    /// Fetch events starting this many days ago. Zero means from now.
    pub lookback_days: u32,

    /// Cap on fetched events. `None` fetches everything in range.
    pub max_results: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            cookie_name: "tasktime_session".to_string(),
            secure_cookies: false,
            session_ttl: DEFAULT_SESSION_TTL,
            pending_ttl: DEFAULT_PENDING_TTL,
            lookback_days: 0,
            max_results: Some(DEFAULT_MAX_RESULTS),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration listening on `bind`.
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            ..Default::default()
        }
    }

    /// Builder: set secure cookies.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Builder: set session TTL.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Builder: set the fetch window.
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Builder: set the fetch cap.
    pub fn with_max_results(mut self, max: Option<usize>) -> Self {
        self.max_results = max;
        self
    }

    /// Fetch options for every calendar request.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new()
            .with_lookback_days(self.lookback_days)
            .with_max_results(self.max_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.to_string(), "127.0.0.1:3000");
        assert_eq!(config.cookie_name, "tasktime_session");
        assert!(!config.secure_cookies);
        assert_eq!(config.session_ttl, Duration::from_secs(604_800));
        assert_eq!(config.pending_ttl, Duration::from_secs(300));
        assert_eq!(config.max_results, Some(10));
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::new("0.0.0.0:8080".parse().unwrap())
            .with_secure_cookies(true)
            .with_session_ttl(Duration::from_secs(3600))
            .with_lookback_days(30)
            .with_max_results(None);

        assert_eq!(config.bind.port(), 8080);
        assert!(config.secure_cookies);
        assert_eq!(config.session_ttl, Duration::from_secs(3600));

        let options = config.fetch_options();
        assert!(options.time_min.is_some());
        assert_eq!(options.max_results, None);
    }

    #[test]
    fn default_fetch_options_start_now() {
        let options = ServerConfig::default().fetch_options();
        assert!(options.time_min.is_none());
        assert_eq!(options.max_results, Some(10));
    }
}
