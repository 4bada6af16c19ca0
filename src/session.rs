use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;

use crate::api::Backend;
use crate::db::LocalStore;
use crate::error::{AppError, AppResult};
use crate::models::{UserId, UserProfile};

const SESSION_KEY: &str = "session";

/// Who is logged in, as persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub api_key: String,
}

impl Identity {
    /// Build an identity from a login response.
    pub fn from_login(profile: &UserProfile) -> AppResult<Self> {
        let api_key = profile
            .api_key
            .clone()
            .ok_or_else(|| AppError::BadRequest("Login response had no credential".into()))?;
        Ok(Self {
            user_id: UserId(profile.id),
            username: profile.username.clone(),
            api_key,
        })
    }
}

/// Identity merged with fetched profile fields for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedProfile {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    pub profile_loaded: bool,
}

#[derive(Default)]
struct SessionInner {
    identity: Option<Identity>,
    profile: Option<UserProfile>,
}

/// The logged-in identity and its profile. Clones share state.
#[derive(Clone)]
pub struct Session {
    store: LocalStore,
    inner: Arc<RwLock<SessionInner>>,
}

impl Session {
    /// Restore the persisted identity, if any.
    pub fn load(store: LocalStore) -> AppResult<Self> {
        let identity: Option<Identity> = store.load_json(SESSION_KEY)?;
        if let Some(ref identity) = identity {
            tracing::debug!("Restored session for {}", identity.username);
        }

        Ok(Self {
            store,
            inner: Arc::new(RwLock::new(SessionInner {
                identity,
                profile: None,
            })),
        })
    }

    pub fn identity(&self) -> Option<Identity> {
        read(&self.inner).identity.clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        read(&self.inner).identity.as_ref().map(|i| i.user_id)
    }

    pub fn is_logged_in(&self) -> bool {
        read(&self.inner).identity.is_some()
    }

    /// The active identity, or [`AppError::NotLoggedIn`].
    pub fn require(&self) -> AppResult<Identity> {
        self.identity().ok_or(AppError::NotLoggedIn)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        read(&self.inner).profile.clone()
    }

    /// Store and persist `identity`, then fetch its profile in the
    /// background. The returned handle may be awaited or dropped.
    pub fn login(
        &self,
        identity: Identity,
        backend: Arc<dyn Backend>,
    ) -> AppResult<JoinHandle<()>> {
        self.store.save_json(SESSION_KEY, &identity)?;
        let user_id = identity.user_id;
        {
            let mut inner = write(&self.inner);
            inner.identity = Some(identity);
            inner.profile = None;
        }
        tracing::info!("Session started for user {}", user_id);

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move {
            match backend.fetch_profile().await {
                Ok(profile) => {
                    store_profile(&inner, user_id, profile);
                }
                Err(e) => tracing::warn!("Profile fetch for user {} failed: {}", user_id, e),
            }
        }))
    }

    /// Forget the identity and profile. No network involved.
    pub fn logout(&self) -> AppResult<()> {
        {
            let mut inner = write(&self.inner);
            inner.identity = None;
            inner.profile = None;
        }
        self.store.remove(SESSION_KEY)?;
        tracing::info!("Session ended");
        Ok(())
    }

    /// Re-fetch profile fields for the active identity. `None` when logged out.
    pub async fn refresh_profile<B: Backend + ?Sized>(
        &self,
        backend: &B,
    ) -> AppResult<Option<UserProfile>> {
        let Some(user_id) = self.user_id() else {
            return Ok(None);
        };

        let profile = backend.fetch_profile().await?;
        if store_profile(&self.inner, user_id, profile.clone()) {
            Ok(Some(profile))
        } else {
            Ok(None)
        }
    }

    pub fn enriched(&self) -> Option<EnrichedProfile> {
        let inner = read(&self.inner);
        let identity = inner.identity.as_ref()?;
        let profile = inner.profile.as_ref();

        Some(EnrichedProfile {
            user_id: identity.user_id,
            username: identity.username.clone(),
            display_name: profile
                .and_then(|p| p.display_name.clone())
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| identity.username.clone()),
            bio: profile.and_then(|p| p.bio.clone()),
            avatar: profile.and_then(|p| p.avatar.clone()),
            banner: profile.and_then(|p| p.banner.clone()),
            profile_loaded: profile.is_some(),
        })
    }
}

/// Keep `profile` only if it still belongs to the active identity.
fn store_profile(inner: &RwLock<SessionInner>, user_id: UserId, profile: UserProfile) -> bool {
    let mut inner = write(inner);
    if inner.identity.as_ref().map(|i| i.user_id) != Some(user_id) {
        tracing::debug!("Discarding profile for user {} after session change", user_id);
        return false;
    }
    if profile.id != user_id.0 {
        tracing::warn!(
            "Profile id {} does not match session user {}",
            profile.id,
            user_id
        );
        return false;
    }
    inner.profile = Some(profile);
    true
}

fn read(lock: &RwLock<SessionInner>) -> RwLockReadGuard<'_, SessionInner> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(lock: &RwLock<SessionInner>) -> RwLockWriteGuard<'_, SessionInner> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
