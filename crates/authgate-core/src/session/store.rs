//! The single source of truth for "who is logged in and what may they do".
//!
//! Every mutation replaces the whole session under one write lock, so readers
//! only ever see a fully logged-in or a fully logged-out shape. The durable
//! slot is written under the same lock.
//!
//! Network calls happen outside the lock. An epoch counter, bumped by every
//! login and logout, tells a late profile or permission response whether the
//! session it was fetched for still exists.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{expiry, CredentialStorage};
use crate::models::{LoginRequest, PermissionSet, UserProfile};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Login failed: {0}")]
    Other(String),
}

impl From<ApiError> for LoginError {
    fn from(e: ApiError) -> Self {
        if e.is_unauthorized() {
            LoginError::InvalidCredentials
        } else {
            LoginError::Other(e.user_message())
        }
    }
}

/// Owned copy of the session for readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub credential: Option<String>,
    pub profile: Option<UserProfile>,
    pub permissions: PermissionSet,
}

impl SessionSnapshot {
    /// Credential held and still usable by the local expiry check.
    pub fn is_authenticated(&self) -> bool {
        expiry::is_usable(self.credential.as_deref())
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }
}

#[derive(Default)]
struct SessionState {
    snapshot: SessionSnapshot,
    epoch: u64,
}

pub struct SessionStore {
    state: RwLock<SessionState>,
    storage: Arc<dyn CredentialStorage>,
    login_flight: Mutex<()>,
}

impl SessionStore {
    /// Process-start initialization from the durable slot.
    ///
    /// A persisted credential is loaded as-is; whether it is still usable is
    /// decided later by `refresh_profile` and the navigation guard.
    pub fn hydrate(storage: Arc<dyn CredentialStorage>) -> Self {
        let credential = match storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted credential");
                None
            }
        };
        debug!(has_credential = credential.is_some(), "Session hydrated");

        Self {
            state: RwLock::new(SessionState {
                snapshot: SessionSnapshot {
                    credential,
                    ..SessionSnapshot::default()
                },
                epoch: 0,
            }),
            storage,
            login_flight: Mutex::new(()),
        }
    }

    pub fn credential(&self) -> Option<String> {
        self.state.read().snapshot.credential.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().snapshot.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        expiry::is_usable(self.state.read().snapshot.credential.as_deref())
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.state.read().snapshot.permissions.contains(code)
    }

    /// Log in and load the profile.
    ///
    /// Returns `Ok` once a credential has been issued and stored, even if the
    /// follow-up profile load then logs the session back out; check
    /// [`snapshot`](Self::snapshot) for the resulting shape. On failure the
    /// existing session is left untouched.
    pub async fn login(&self, api: &ApiClient, request: &LoginRequest) -> Result<(), LoginError> {
        let _flight = self.login_flight.lock().await;

        let token = match api.login(request).await {
            Ok(token) => token,
            Err(e) => {
                debug!(error = %e, "Login request failed");
                return Err(e.into());
            }
        };

        {
            let mut state = self.state.write();
            state.epoch += 1;
            state.snapshot = SessionSnapshot {
                credential: Some(token.access_token.clone()),
                ..SessionSnapshot::default()
            };
            if let Err(e) = self.storage.save(&token.access_token) {
                warn!(error = %e, "Failed to persist credential");
            }
        }
        info!(username = %request.username, "Login successful");

        self.refresh_profile(api).await;
        Ok(())
    }

    /// Reload the profile and, best-effort, the permission set.
    ///
    /// Logs out if there is no usable credential or the profile cannot be
    /// fetched. A failed permission fetch leaves the permission set empty
    /// and the session valid.
    pub async fn refresh_profile(&self, api: &ApiClient) {
        let (credential, epoch) = {
            let state = self.state.read();
            (state.snapshot.credential.clone(), state.epoch)
        };

        if !expiry::is_usable(credential.as_deref()) {
            debug!(has_credential = credential.is_some(), "No usable credential, logging out");
            self.logout();
            return;
        }

        let profile = match api.fetch_profile().await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Fetch user failed");
                self.logout_if_current(epoch);
                return;
            }
        };

        if !self.apply(epoch, |snapshot| snapshot.profile = Some(profile)) {
            debug!("Session changed while loading profile, discarding it");
            return;
        }

        let permissions = match api.fetch_permissions().await {
            Ok(permissions) => permissions,
            Err(e) => {
                debug!(error = %e, "Permission fetch failed, continuing without permissions");
                PermissionSet::new()
            }
        };
        let count = permissions.len();
        if self.apply(epoch, |snapshot| snapshot.permissions = permissions) {
            debug!(permissions = count, "Profile refreshed");
        }
    }

    /// Clear the session from memory and from durable storage. Idempotent.
    pub fn logout(&self) {
        let mut state = self.state.write();
        state.epoch += 1;
        let had_session = state.snapshot.credential.is_some();
        state.snapshot = SessionSnapshot::default();
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear persisted credential");
        }
        if had_session {
            info!("Logged out");
        }
    }

    /// Remove an expired credential from durable storage without touching
    /// the in-memory session. Skipped if the held credential is usable by
    /// the time the lock is taken.
    pub fn discard_expired_credential(&self) {
        let state = self.state.read();
        if expiry::is_usable(state.snapshot.credential.as_deref()) {
            return;
        }
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear expired credential");
        } else {
            debug!("Cleared expired credential from storage");
        }
    }

    fn logout_if_current(&self, epoch: u64) {
        if self.state.read().epoch == epoch {
            self.logout();
        }
    }

    fn apply(&self, epoch: u64, update: impl FnOnce(&mut SessionSnapshot)) -> bool {
        let mut state = self.state.write();
        if state.epoch != epoch {
            return false;
        }
        update(&mut state.snapshot);
        true
    }
}
