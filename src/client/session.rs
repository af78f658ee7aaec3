//! Persisted auth session
//!
//! The token lives in a file on disk and is attached to both REST calls
//! (bearer header) and the real-time handshake. A 401 from the REST API is
//! fatal to the session: `force_logout` clears the persisted credential
//! and flips the session watch, which is the UI's cue to redirect to the
//! login entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::Result;
use crate::realtime::TokenProvider;

/// Whether a credential is currently held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggedIn,
}

/// Shared session store; cheap to clone
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    token: ArcSwapOption<String>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Load the persisted token from disk, if any
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let token = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(_) => None,
        };

        let state = if token.is_some() {
            SessionState::LoggedIn
        } else {
            SessionState::LoggedOut
        };
        let (state_tx, _) = watch::channel(state);

        Self {
            inner: Arc::new(StoreInner {
                path,
                token: ArcSwapOption::from(token.map(Arc::new)),
                state_tx,
            }),
        }
    }

    /// Current token, if logged in
    pub fn token(&self) -> Option<String> {
        self.inner.token.load().as_deref().map(|t| t.to_string())
    }

    /// Token provider for the real-time handshake; reconnects pick up the
    /// latest credential automatically
    pub fn token_provider(&self) -> TokenProvider {
        let store = self.clone();
        Arc::new(move || store.token())
    }

    /// Persist a freshly issued token
    pub fn store(&self, token: &str) -> Result<()> {
        std::fs::write(&self.inner.path, token)?;
        self.inner.token.store(Some(Arc::new(token.to_string())));
        self.inner.state_tx.send_replace(SessionState::LoggedIn);
        info!("session token stored");
        Ok(())
    }

    /// Clear the credential: remove the persisted file, drop the token,
    /// flip the session watch to LoggedOut
    pub fn force_logout(&self) {
        if let Err(e) = std::fs::remove_file(&self.inner.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, "failed to remove persisted token");
            }
        }
        self.inner.token.store(None);
        self.inner.state_tx.send_replace(SessionState::LoggedOut);
        info!("session cleared");
    }

    /// Observe login/logout transitions
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn is_logged_in(&self) -> bool {
        *self.inner.state_tx.borrow() == SessionState::LoggedIn
    }
}
