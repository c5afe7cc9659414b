//! Google Calendar implementation.
//!
//! Two sign-in flows share the same [`OAuthClient`]:
//!
//! 1. Web: the server builds a consent URL with a random `state`, Google
//!    redirects to `/api/auth/callback/google`, and the code is exchanged
//!    with the client secret. Tokens live in the server-side session.
//! 2. CLI: a loopback redirect plus PKCE. Tokens are written to a
//!    [`TokenStorage`] file.
//!
//! Either way, [`GoogleProvider`] fetches events with the resulting
//! [`TokenInfo`] and refreshes it at most once per call.

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow, random_state};
pub use provider::GoogleProvider;
pub use tokens::{RefreshedToken, TokenInfo, TokenStorage};
