use std::collections::HashMap;

use crate::db::LocalStore;
use crate::error::{AppError, AppResult};
use crate::models::{Direction, EntityKind, UserId};

/// Local copy of the current user's vote directions for one entity kind.
///
/// Absence of an entry means no vote. Every mutation rewrites the whole
/// map under `votes:{kind}:{user}` in local storage.
pub struct VoteMirror {
    kind: EntityKind,
    owner: Option<UserId>,
    entries: HashMap<i64, Direction>,
    store: LocalStore,
}

impl VoteMirror {
    pub fn storage_key(kind: EntityKind, user: UserId) -> String {
        format!("votes:{}:{}", kind.as_str(), user)
    }

    /// A mirror that belongs to nobody. Every lookup returns `Neutral`.
    pub fn empty(store: LocalStore, kind: EntityKind) -> Self {
        Self {
            kind,
            owner: None,
            entries: HashMap::new(),
            store,
        }
    }

    /// Restore `user`'s persisted mirror. Corrupt storage starts empty.
    pub fn load(store: LocalStore, kind: EntityKind, user: UserId) -> AppResult<Self> {
        let key = Self::storage_key(kind, user);
        let mut entries: HashMap<i64, Direction> = store.load_json(&key)?.unwrap_or_default();
        entries.retain(|_, direction| *direction != Direction::Neutral);

        tracing::debug!("Loaded {} {} votes for user {}", entries.len(), kind, user);

        Ok(Self {
            kind,
            owner: Some(user),
            entries,
            store,
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_vote(&self, user: UserId, id: i64) -> Direction {
        if self.owner != Some(user) {
            return Direction::Neutral;
        }
        self.entries.get(&id).copied().unwrap_or_default()
    }

    /// Record `direction` for `id`. `Neutral` deletes the entry.
    pub fn set_vote(&mut self, user: UserId, id: i64, direction: Direction) -> AppResult<()> {
        let owner = self.owner.ok_or(AppError::UserMismatch)?;
        if owner != user {
            return Err(AppError::UserMismatch);
        }

        match direction {
            Direction::Neutral => {
                self.entries.remove(&id);
            }
            direction => {
                self.entries.insert(id, direction);
            }
        }

        self.persist(owner)
    }

    /// Forget every vote and drop the persisted copy.
    pub fn clear_all(&mut self) -> AppResult<()> {
        self.entries.clear();
        if let Some(owner) = self.owner {
            self.store.remove(&Self::storage_key(self.kind, owner))?;
        }
        Ok(())
    }

    fn persist(&self, owner: UserId) -> AppResult<()> {
        let key = Self::storage_key(self.kind, owner);
        if self.entries.is_empty() {
            self.store.remove(&key)?;
        } else {
            self.store.save_json(&key, &self.entries)?;
        }
        Ok(())
    }
}
