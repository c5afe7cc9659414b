//! Google OAuth and Google Calendar event source.
//!
//! - [`CalendarSource`]: fetch events for a token set, refreshing at most once
//! - [`Authenticator`]: consent URL and code exchange for the web flow
//! - [`google`]: the Google implementation, token types and file storage
//! - [`ProviderError`]: error type shared by all of the above
//!
//! ```text
//!  ┌──────────────┐  consent URL / code   ┌──────────────────┐
//!  │ Authenticator├──────────────────────►│ accounts.google  │
//!  └──────┬───────┘                       └──────────────────┘
//!         │ TokenInfo
//!         ▼
//!  ┌──────────────┐  events.list (+1x refresh)  ┌──────────────────┐
//!  │CalendarSource├────────────────────────────►│ Calendar API v3  │
//!  └──────┬───────┘                             └──────────────────┘
//!         │ Vec<CalendarEvent>
//!         ▼
//!   tasktime_core::monthly_summary
//! ```

pub mod error;
pub mod google;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use google::{GoogleConfig, GoogleProvider, OAuthCredentials, TokenInfo, TokenStorage};
pub use provider::{
    Authenticator, BoxFuture, CalendarSource, DEFAULT_MAX_RESULTS, FetchOptions, FetchResult,
};
