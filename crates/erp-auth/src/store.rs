//! Access token storage
//!
//! Holds the current bearer token plus an epoch counter that increments on
//! every `set` and `clear`. Callers record the epoch a request was sent under;
//! if it has moved by the time a 401 comes back, the token was already
//! rotated or cleared and no new refresh is needed.
//!
//! Optionally backed by a JSON session file so a restarted console resumes
//! its session. Writes use atomic temp-file + rename. The write lock is held
//! across persistence, so the file never lags behind a later in-memory value.

use std::path::{Path, PathBuf};

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Opaque bearer credential, redacted in logs.
pub type AccessToken = Secret<String>;

/// Token and epoch read together.
#[derive(Debug, Clone)]
pub struct TokenSnapshot {
    pub token: Option<AccessToken>,
    pub epoch: u64,
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<AccessToken>,
    epoch: u64,
}

/// On-disk layout of the session file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Session-scoped token store shared by every request path.
#[derive(Debug)]
pub struct TokenStore {
    path: Option<PathBuf>,
    state: RwLock<TokenState>,
}

impl TokenStore {
    /// Store without persistence, starting logged out.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(TokenState::default()),
        }
    }

    /// In-memory store seeded with a token (epoch starts at 1).
    pub fn with_token(token: impl Into<AccessToken>) -> Self {
        Self {
            path: None,
            state: RwLock::new(TokenState {
                token: Some(token.into()),
                epoch: 1,
            }),
        }
    }

    /// Load the session file at `path`.
    ///
    /// A missing file is created empty (logged out). A blank stored token is
    /// treated as no token.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let file = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let file: SessionFile = serde_json::from_str(&contents)
                .map_err(|e| Error::SessionParse(format!("parsing session file: {e}")))?;
            info!(
                path = %path.display(),
                has_token = file.access_token.is_some(),
                "loaded session"
            );
            file
        } else {
            info!(path = %path.display(), "session file not found, starting logged out");
            let file = SessionFile::default();
            write_atomic(&path, &file).await?;
            file
        };

        let token = file
            .access_token
            .map(Secret::new)
            .filter(|t| !t.is_blank());
        let epoch = u64::from(token.is_some());

        Ok(Self {
            path: Some(path),
            state: RwLock::new(TokenState { token, epoch }),
        })
    }

    /// Current token, if logged in.
    pub async fn token(&self) -> Option<AccessToken> {
        self.state.read().await.token.clone()
    }

    pub async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }

    /// Token and epoch under a single read lock.
    pub async fn snapshot(&self) -> TokenSnapshot {
        let state = self.state.read().await;
        TokenSnapshot {
            token: state.token.clone(),
            epoch: state.epoch,
        }
    }

    /// Replace the token and bump the epoch. Returns the new epoch.
    ///
    /// The in-memory value is updated even if persisting fails; the error is
    /// still returned so the caller can log it.
    pub async fn set(&self, token: AccessToken) -> Result<u64> {
        let mut state = self.state.write().await;
        state.token = Some(token);
        state.epoch += 1;
        let epoch = state.epoch;
        debug!(epoch, "access token stored");
        self.persist(&state).await?;
        Ok(epoch)
    }

    /// Drop the token and bump the epoch, even if already logged out.
    pub async fn clear(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        state.token = None;
        state.epoch += 1;
        let epoch = state.epoch;
        debug!(epoch, "access token cleared");
        self.persist(&state).await?;
        Ok(epoch)
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, state: &TokenState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = SessionFile {
            access_token: state.token.as_ref().map(|t| t.expose().clone()),
        };
        write_atomic(path, &file).await
    }
}

/// Write the session file atomically with 0600 permissions.
async fn write_atomic(path: &Path, file: &SessionFile) -> Result<()> {
    let json = serde_json::to_string_pretty(file)
        .map_err(|e| Error::SessionParse(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
