//! In-memory sessions keyed by the session cookie.
//!
//! A session carries the OAuth `state` of a sign-in in flight and, once the
//! callback succeeds, the user's tokens. Entries expire on the monotonic
//! clock: a sign-in in flight gets the short pending TTL, and only storing
//! tokens extends it to the full session TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tasktime_providers::TokenInfo;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

/// One browser session.
#[derive(Debug, Clone)]
struct Session {
    pending_state: Option<String>,
    tokens: Option<TokenInfo>,
    expires_at: Instant,
}

impl Session {
    fn new(ttl: Duration) -> Self {
        Self {
            pending_state: None,
            tokens: None,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Session table.
///
/// Accessors copy data out; callers never keep the lock while talking to
/// Google.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    pending_ttl: Duration,
}

impl SessionStore {
    /// Creates an empty store. Signed-in sessions live for `ttl`, sessions
    /// without tokens for `pending_ttl` (capped at `ttl`).
    pub fn new(ttl: Duration, pending_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            pending_ttl: pending_ttl.min(ttl),
        }
    }

    /// Returns `id` if it names a live session, otherwise opens a new one
    /// with the pending TTL.
    pub async fn get_or_create(&self, id: Option<&str>) -> String {
        let mut sessions = self.sessions.write().await;

        if let Some(id) = id {
            if sessions.get(id).is_some_and(|s| !s.is_expired()) {
                return id.to_string();
            }
        }

        let id = Uuid::new_v4().to_string();
        sessions.insert(id.clone(), Session::new(self.pending_ttl));
        debug!("opened session ({} active)", sessions.len());
        id
    }

    /// Moves a live session to a fresh id and returns it. The old id stops
    /// resolving.
    pub async fn rotate(&self, id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.remove(id).filter(|s| !s.is_expired())?;

        let fresh = Uuid::new_v4().to_string();
        sessions.insert(fresh.clone(), session);
        trace!("rotated session id");
        Some(fresh)
    }

    /// Records the OAuth `state` of a sign-in that just started.
    pub async fn set_pending_state(&self, id: &str, state: impl Into<String>) -> bool {
        let mut sessions = self.sessions.write().await;
        match live_mut(&mut sessions, id) {
            Some(session) => {
                session.pending_state = Some(state.into());
                true
            }
            None => false,
        }
    }

    /// Removes and returns the pending `state`. A state is single-use.
    pub async fn take_pending_state(&self, id: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        live_mut(&mut sessions, id).and_then(|s| s.pending_state.take())
    }

    /// Stores tokens on a session and restarts its TTL.
    pub async fn set_tokens(&self, id: &str, tokens: TokenInfo) -> bool {
        let mut sessions = self.sessions.write().await;
        match live_mut(&mut sessions, id) {
            Some(session) => {
                session.tokens = Some(tokens);
                session.expires_at = Instant::now() + self.ttl;
                true
            }
            None => false,
        }
    }

    /// Writes back tokens refreshed during a fetch, leaving the TTL alone.
    pub async fn update_tokens(&self, id: &str, tokens: TokenInfo) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = live_mut(&mut sessions, id) {
            if session.tokens.is_some() {
                session.tokens = Some(tokens);
            }
        }
    }

    /// Returns a copy of the session's tokens.
    pub async fn tokens(&self, id: &str) -> Option<TokenInfo> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|s| !s.is_expired())
            .and_then(|s| s.tokens.clone())
    }

    /// Drops the session's tokens. Returns false if there were none.
    pub async fn clear_tokens(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        live_mut(&mut sessions, id)
            .and_then(|s| s.tokens.take())
            .is_some()
    }

    /// Removes expired sessions and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        let removed = before - sessions.len();
        if removed > 0 {
            trace!("purged {} expired session(s)", removed);
        }
        removed
    }

    /// Number of sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if there are no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn live_mut<'a>(sessions: &'a mut HashMap<String, Session>, id: &str) -> Option<&'a mut Session> {
    sessions.get_mut(id).filter(|s| !s.is_expired())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(access: &str) -> TokenInfo {
        TokenInfo::new(access, Some("refresh".to_string()), Some(3600), vec![])
    }

    #[tokio::test]
    async fn creates_and_reuses_sessions() {
        let store = SessionStore::new(Duration::from_secs(60), Duration::from_secs(60));

        let id = store.get_or_create(None).await;
        assert_eq!(store.get_or_create(Some(&id)).await, id);
        assert_ne!(store.get_or_create(Some("unknown")).await, id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn pending_state_is_single_use() {
        let store = SessionStore::new(Duration::from_secs(60), Duration::from_secs(60));
        let id = store.get_or_create(None).await;

        assert!(store.set_pending_state(&id, "xyz").await);
        assert_eq!(store.take_pending_state(&id).await.as_deref(), Some("xyz"));
        assert_eq!(store.take_pending_state(&id).await, None);
        assert!(!store.set_pending_state("missing", "xyz").await);
    }

    #[tokio::test]
    async fn tokens_lifecycle() {
        let store = SessionStore::new(Duration::from_secs(60), Duration::from_secs(60));
        let id = store.get_or_create(None).await;

        assert!(store.tokens(&id).await.is_none());
        assert!(!store.clear_tokens(&id).await);

        assert!(store.set_tokens(&id, tokens("first")).await);
        assert_eq!(store.tokens(&id).await.unwrap().access_token, "first");

        store.update_tokens(&id, tokens("second")).await;
        assert_eq!(store.tokens(&id).await.unwrap().access_token, "second");

        assert!(store.clear_tokens(&id).await);
        assert!(store.tokens(&id).await.is_none());

        // Signed out sessions do not get tokens back from a late refresh.
        store.update_tokens(&id, tokens("third")).await;
        assert!(store.tokens(&id).await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored_and_purged() {
        let store = SessionStore::new(Duration::ZERO, Duration::ZERO);
        let id = store.get_or_create(None).await;

        assert!(!store.set_tokens(&id, tokens("t")).await);
        assert!(store.tokens(&id).await.is_none());
        assert_ne!(store.get_or_create(Some(&id)).await, id);

        assert_eq!(store.purge_expired().await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn rotate_moves_session_to_new_id() {
        let store = SessionStore::new(Duration::from_secs(60), Duration::from_secs(60));
        let old = store.get_or_create(None).await;
        store.set_pending_state(&old, "xyz").await;

        let fresh = store.rotate(&old).await.unwrap();
        assert_ne!(fresh, old);
        assert_eq!(store.take_pending_state(&fresh).await.as_deref(), Some("xyz"));
        assert!(!store.set_tokens(&old, tokens("t")).await);
        assert!(store.rotate(&old).await.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn pending_sessions_expire_before_signed_in_ones() {
        let store = SessionStore::new(Duration::from_secs(60), Duration::from_millis(50));
        let abandoned = store.get_or_create(None).await;
        let signed_in = store.get_or_create(None).await;
        assert!(store.set_tokens(&signed_in, tokens("t")).await);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.tokens(&signed_in).await.is_some());
        assert!(!store.set_pending_state(&abandoned, "xyz").await);
    }
}
