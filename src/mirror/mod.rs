pub mod in_flight;
pub mod saved;
pub mod votes;

pub use in_flight::{InFlight, InFlightPermit};
pub use saved::SavedMirror;
pub use votes::VoteMirror;

use crate::api::Backend;
use crate::db::LocalStore;
use crate::error::AppResult;
use crate::models::{EntityKind, UserId};

/// Vote and saved mirrors for both entity kinds, owned by one user.
pub struct Mirrors {
    post_votes: VoteMirror,
    comment_votes: VoteMirror,
    saved_posts: SavedMirror,
    saved_comments: SavedMirror,
}

impl Mirrors {
    pub fn empty(store: &LocalStore) -> Self {
        Self {
            post_votes: VoteMirror::empty(store.clone(), EntityKind::Post),
            comment_votes: VoteMirror::empty(store.clone(), EntityKind::Comment),
            saved_posts: SavedMirror::new(EntityKind::Post, None),
            saved_comments: SavedMirror::new(EntityKind::Comment, None),
        }
    }

    /// Restore `user`'s persisted votes. Saved sets start empty until
    /// [`Mirrors::refresh_saved`] completes.
    pub fn load(store: &LocalStore, user: UserId) -> AppResult<Self> {
        Ok(Self {
            post_votes: VoteMirror::load(store.clone(), EntityKind::Post, user)?,
            comment_votes: VoteMirror::load(store.clone(), EntityKind::Comment, user)?,
            saved_posts: SavedMirror::new(EntityKind::Post, Some(user)),
            saved_comments: SavedMirror::new(EntityKind::Comment, Some(user)),
        })
    }

    pub fn owner(&self) -> Option<UserId> {
        self.post_votes.owner()
    }

    pub fn votes(&self, kind: EntityKind) -> &VoteMirror {
        match kind {
            EntityKind::Post => &self.post_votes,
            EntityKind::Comment => &self.comment_votes,
        }
    }

    pub fn votes_mut(&mut self, kind: EntityKind) -> &mut VoteMirror {
        match kind {
            EntityKind::Post => &mut self.post_votes,
            EntityKind::Comment => &mut self.comment_votes,
        }
    }

    pub fn saved(&self, kind: EntityKind) -> &SavedMirror {
        match kind {
            EntityKind::Post => &self.saved_posts,
            EntityKind::Comment => &self.saved_comments,
        }
    }

    pub fn saved_mut(&mut self, kind: EntityKind) -> &mut SavedMirror {
        match kind {
            EntityKind::Post => &mut self.saved_posts,
            EntityKind::Comment => &mut self.saved_comments,
        }
    }

    /// Reload both saved sets. Both are attempted; the first error wins.
    pub async fn refresh_saved<B: Backend + ?Sized>(
        &mut self,
        user: UserId,
        backend: &B,
    ) -> AppResult<()> {
        let posts = self.saved_posts.refresh(user, backend).await;
        let comments = self.saved_comments.refresh(user, backend).await;
        posts?;
        comments?;
        Ok(())
    }

    /// Drop all local state, including persisted votes.
    pub fn clear_all(&mut self) -> AppResult<()> {
        self.post_votes.clear_all()?;
        self.comment_votes.clear_all()?;
        self.saved_posts.clear();
        self.saved_comments.clear();
        Ok(())
    }

    /// Hand the mirrors to `user`. The previous owner's state is cleared
    /// first so nothing leaks across accounts.
    pub fn switch_user(&mut self, store: &LocalStore, user: UserId) -> AppResult<()> {
        if self.owner() == Some(user) {
            return Ok(());
        }
        if let Some(previous) = self.owner() {
            tracing::info!("Switching local state from user {} to {}", previous, user);
        }
        self.clear_all()?;
        *self = Self::load(store, user)?;
        Ok(())
    }
}
