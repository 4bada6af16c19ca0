use std::collections::HashSet;

use crate::api::Backend;
use crate::error::{AppError, AppResult};
use crate::models::{EntityKind, UserId};

/// Ids of one entity kind the current user has saved.
///
/// Sourced from a full backend fetch, then maintained from confirmed
/// toggle responses. Lives only in memory.
pub struct SavedMirror {
    kind: EntityKind,
    owner: Option<UserId>,
    ids: HashSet<i64>,
}

impl SavedMirror {
    pub fn new(kind: EntityKind, owner: Option<UserId>) -> Self {
        Self {
            kind,
            owner,
            ids: HashSet::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replace the set with the backend's list for `user`.
    ///
    /// On failure the set is left empty, never stale, and the error is
    /// returned for the caller to report.
    pub async fn refresh<B: Backend + ?Sized>(
        &mut self,
        user: UserId,
        backend: &B,
    ) -> AppResult<usize> {
        self.owner = Some(user);
        self.ids.clear();

        match backend.saved_ids(self.kind).await {
            Ok(ids) => {
                self.ids.extend(ids);
                tracing::debug!("Loaded {} saved {}s for user {}", self.ids.len(), self.kind, user);
                Ok(self.ids.len())
            }
            Err(e) => {
                tracing::warn!("Could not load saved {}s: {}", self.kind, e);
                Err(e)
            }
        }
    }

    pub fn is_saved(&self, user: UserId, id: i64) -> bool {
        self.owner == Some(user) && self.ids.contains(&id)
    }

    /// Apply a backend-confirmed saved flag.
    pub fn toggle(&mut self, user: UserId, id: i64, saved: bool) -> AppResult<()> {
        if self.owner != Some(user) {
            return Err(AppError::UserMismatch);
        }
        if saved {
            self.ids.insert(id);
        } else {
            self.ids.remove(&id);
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.owner = None;
    }

    /// Saved ids in ascending order.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
