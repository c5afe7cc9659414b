//! Event source and authenticator traits.
//!
//! The HTTP server and the CLI only talk to these traits, so tests can swap
//! Google out for in-process fakes.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Duration, Utc};
use tasktime_core::CalendarEvent;

use crate::error::ProviderResult;
use crate::google::TokenInfo;

/// Events returned when the caller does not say otherwise.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Which events to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Lower bound on event end time. `None` means "now" at request time.
    pub time_min: Option<DateTime<Utc>>,
    /// Upper bound on event start time.
    pub time_max: Option<DateTime<Utc>>,
    /// Total cap across all pages. `None` fetches everything.
    pub max_results: Option<usize>,
    /// Calendar to read. `None` uses the source's configured calendar.
    pub calendar_id: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            time_min: None,
            time_max: None,
            max_results: Some(DEFAULT_MAX_RESULTS),
            calendar_id: None,
        }
    }
}

impl FetchOptions {
    /// Upcoming events from now, capped at [`DEFAULT_MAX_RESULTS`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lower time bound.
    pub fn with_time_min(mut self, time_min: DateTime<Utc>) -> Self {
        self.time_min = Some(time_min);
        self
    }

    /// Sets the upper time bound.
    pub fn with_time_max(mut self, time_max: DateTime<Utc>) -> Self {
        self.time_max = Some(time_max);
        self
    }

    /// Starts the window `days` before now. Zero keeps "now".
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.time_min = (days > 0).then(|| Utc::now() - Duration::days(i64::from(days)));
        self
    }

    /// Sets the total cap. `None` removes it.
    pub fn with_max_results(mut self, max_results: Option<usize>) -> Self {
        self.max_results = max_results;
        self
    }

    /// Overrides the calendar.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }
}

/// Result of a fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// Events in the order the source returned them.
    pub events: Vec<CalendarEvent>,
    /// True if the tokens passed in were refreshed and should be persisted.
    pub tokens_refreshed: bool,
}

/// Something that lists calendar events for a signed-in user.
pub trait CalendarSource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches events with `tokens`, refreshing them at most once.
    ///
    /// A refresh rewrites `tokens` in place and sets
    /// [`FetchResult::tokens_refreshed`].
    fn fetch_events<'a>(
        &'a self,
        tokens: &'a mut TokenInfo,
        options: FetchOptions,
    ) -> BoxFuture<'a, ProviderResult<FetchResult>>;
}

/// The web sign-in flow.
pub trait Authenticator: Send + Sync {
    /// Consent page URL carrying `state`.
    fn authorization_url(&self, state: &str) -> ProviderResult<String>;

    /// Trades the code from the redirect for tokens.
    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, ProviderResult<TokenInfo>>;
}
