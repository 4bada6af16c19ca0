pub mod client;
pub mod forms;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Direction, EntityKind, SavedResponse, UserProfile, VoteResponse};

pub use client::ApiClient;
pub use forms::{CommentForm, CommunityForm, LoginRequest, PostForm, ProfileForm};

/// The slice of the backend the mirrors and the session depend on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Send the clicked direction. The backend toggles and returns the new tally.
    async fn vote(
        &self,
        kind: EntityKind,
        id: i64,
        clicked: Direction,
    ) -> AppResult<VoteResponse>;

    /// Flip the saved flag and return the confirmed value.
    async fn toggle_saved(&self, kind: EntityKind, id: i64) -> AppResult<SavedResponse>;

    /// Ids of everything of `kind` the current user has saved.
    async fn saved_ids(&self, kind: EntityKind) -> AppResult<Vec<i64>>;

    /// Profile of the user the credential belongs to.
    async fn fetch_profile(&self) -> AppResult<UserProfile>;
}
