//! Credential store and session manager.
//!
//! The bearer credential lives in an in-memory cache backed by a [`KeyValueStore`].
//! Every write goes to both, every read prefers memory and falls back to the store.
//! The hydrated [`SessionProfile`] is published through a `watch` channel so shell
//! chrome can follow identity changes.

pub mod profile;
pub mod store;

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::{GatewayError, SessionError};

pub use profile::SessionProfile;
pub use store::{FileStore, KeyValueStore, MemoryStore};
use store::{CREDENTIAL_KEY, PERMISSIONS_KEY, PROFILE_KEY, ROLE_KEY};

/// Fetches a raw "who am I" payload from one identity endpoint.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_identity(&self, endpoint: &str) -> Result<Value, GatewayError>;
}

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    cache: RwLock<Option<String>>,
    profile: watch::Sender<Option<SessionProfile>>,
    identity_endpoints: Vec<String>,
}

impl SessionManager {
    /// Creates a manager over `store`. A profile cached by an earlier run is restored
    /// only while a credential is still stored.
    pub fn new(store: Arc<dyn KeyValueStore>, identity_endpoints: Vec<String>) -> Self {
        let restored = match store.get(CREDENTIAL_KEY) {
            Some(token) if !token.is_empty() => store
                .get(PROFILE_KEY)
                .and_then(|raw| serde_json::from_str::<SessionProfile>(&raw).ok()),
            _ => None,
        };
        let (profile, _) = watch::channel(restored);

        Self {
            store,
            cache: RwLock::new(None),
            profile,
            identity_endpoints,
        }
    }

    /// Current credential: memory first, durable store second.
    pub fn credential(&self) -> Option<String> {
        if let Some(token) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Some(token);
        }

        let stored = self.store.get(CREDENTIAL_KEY).filter(|v| !v.is_empty())?;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(stored.clone());
        Some(stored)
    }

    /// Writes the credential to memory and the store. An empty value clears both.
    pub fn set_credential(&self, value: &str) {
        if value.is_empty() {
            self.clear_credential();
            return;
        }

        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        if let Err(e) = self.store.set(CREDENTIAL_KEY, value) {
            tracing::error!("Failed to persist credential: {}", e);
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }

    /// Latest hydrated profile, if any.
    pub fn profile(&self) -> Option<SessionProfile> {
        self.profile.borrow().clone()
    }

    /// Receiver that observes every profile change, including clears.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionProfile>> {
        self.profile.subscribe()
    }

    pub fn identity_endpoints(&self) -> &[String] {
        &self.identity_endpoints
    }

    /// Loads the current identity, trying each configured endpoint in order.
    ///
    /// The first endpoint that answers with a usable profile wins. When all of them
    /// fail the last error is returned and the cached profile is dropped. The
    /// credential is left untouched either way; whether a failure means the session
    /// is dead is the caller's decision.
    ///
    /// A payload that arrives after the credential was cleared or replaced describes
    /// a session that no longer exists; it is discarded with `SessionError::Superseded`.
    pub async fn hydrate_session(
        &self,
        source: &dyn ProfileSource,
    ) -> Result<SessionProfile, SessionError> {
        let Some(credential) = self.credential() else {
            return Err(SessionError::NoCredential);
        };

        let mut last_error = SessionError::NoIdentityEndpoints;
        for endpoint in &self.identity_endpoints {
            let fetched = source.fetch_identity(endpoint).await;
            if self.credential().as_deref() != Some(credential.as_str()) {
                tracing::debug!(endpoint = %endpoint, "Credential changed during hydration, dropping identity");
                return Err(SessionError::Superseded);
            }

            let attempt = fetched
                .map_err(SessionError::from)
                .and_then(SessionProfile::from_payload);

            match attempt {
                Ok(profile) => {
                    tracing::debug!(endpoint = %endpoint, "Session hydrated");
                    self.record_profile(&profile);
                    return Ok(profile);
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, "Identity endpoint failed: {}", e);
                    last_error = e;
                }
            }
        }

        // A profile from an earlier hydration no longer describes this credential
        self.clear_identity();
        Err(last_error)
    }

    /// Drops the credential and every cached identity field. Idempotent.
    pub fn clear_session(&self) {
        self.clear_credential();
        self.clear_identity();
    }

    fn clear_identity(&self) {
        for key in [ROLE_KEY, PERMISSIONS_KEY, PROFILE_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::error!("Failed to remove {} from store: {}", key, e);
            }
        }
        self.profile.send_if_modified(|current| current.take().is_some());
    }

    fn clear_credential(&self) {
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Err(e) = self.store.remove(CREDENTIAL_KEY) {
            tracing::error!("Failed to remove credential from store: {}", e);
        }
    }

    fn record_profile(&self, profile: &SessionProfile) {
        let role = profile.role.clone().unwrap_or_default();
        let permissions = serde_json::to_string(&profile.permissions);
        let encoded = serde_json::to_string(profile);

        let writes = [
            (ROLE_KEY, Ok(role)),
            (PERMISSIONS_KEY, permissions),
            (PROFILE_KEY, encoded),
        ];
        for (key, value) in writes {
            let result = match value {
                Ok(value) => self.store.set(key, &value),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                tracing::error!("Failed to persist {}: {}", key, e);
            }
        }

        self.profile.send_replace(Some(profile.clone()));
    }
}
