//! OAuth token state and file persistence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Tokens are treated as expired this long before Google says they are.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Bearer token for API requests.
    pub access_token: String,

    /// Token used to obtain new access tokens.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// When the access token stops being usable.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the access token was last obtained.
    pub last_refresh: DateTime<Utc>,
}

impl std::fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenInfo")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs - EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    /// Creates a token set from a token endpoint response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is past (or within a minute of) its
    /// expiry. Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Returns true if a refresh token is available.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Applies the result of a refresh.
    ///
    /// Google only sometimes rotates the refresh token; the old one is kept
    /// when the response has none.
    pub fn apply_refresh(&mut self, refreshed: RefreshedToken) {
        self.access_token = refreshed.access_token;
        self.expires_at = expiry_from(refreshed.expires_in);
        if let Some(rotated) = refreshed.refresh_token {
            self.refresh_token = Some(rotated);
        }
        self.last_refresh = Utc::now();
    }
}

/// A new access token obtained with a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    /// The new access token.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Replacement refresh token, if Google rotated it.
    pub refresh_token: Option<String>,
}

/// JSON file holding one [`TokenInfo`].
///
/// Writes go through a temp file and a rename. On Unix the file is readable
/// by the owner only.
#[derive(Debug, Clone)]
pub struct TokenStorage {
    path: PathBuf,
}

impl TokenStorage {
    /// Creates storage backed by `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored tokens. A missing file is `Ok(None)`.
    pub fn load(&self) -> ProviderResult<Option<TokenInfo>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no token file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(ProviderError::storage(format!(
                    "failed to read {}",
                    self.path.display()
                ))
                .with_source(e));
            }
        };

        let tokens = serde_json::from_str(&content).map_err(|e| {
            ProviderError::storage(format!("failed to parse {}", self.path.display()))
                .with_source(e)
        })?;

        debug!("loaded tokens from {}", self.path.display());
        Ok(Some(tokens))
    }

    /// Writes `tokens`, replacing any previous file.
    pub fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::storage(format!("failed to create {}", parent.display()))
                    .with_source(e)
            })?;
        }

        let content = serde_json::to_string_pretty(tokens).map_err(|e| {
            ProviderError::internal("failed to serialize tokens").with_source(e)
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ProviderError::storage(format!("failed to write {}", temp_path.display()))
                .with_source(e)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::storage("failed to restrict token file permissions").with_source(e)
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::storage(format!("failed to replace {}", self.path.display()))
                .with_source(e)
        })?;

        debug!("saved tokens to {}", self.path.display());
        Ok(())
    }

    /// Deletes the token file. Returns whether a file was removed.
    pub fn clear(&self) -> ProviderResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("removed tokens at {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ProviderError::storage(format!(
                "failed to remove {}",
                self.path.display()
            ))
            .with_source(e)),
        }
    }
}
