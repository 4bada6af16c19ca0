// In-memory backend for unit tests
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::api::Backend;
use crate::error::{AppError, AppResult};
use crate::models::{Direction, EntityKind, SavedResponse, UserProfile, VoteResponse};

#[derive(Default)]
struct FakeState {
    saved: HashMap<EntityKind, HashSet<i64>>,
    scores: HashMap<(EntityKind, i64), (i64, Direction)>,
    profile: Option<UserProfile>,
    profile_delay: Option<Duration>,
    failing: bool,
    calls: Vec<String>,
}

/// Applies the same toggle rules as the real backend.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved(self, kind: EntityKind, ids: &[i64]) -> Self {
        self.set_saved(kind, ids);
        self
    }

    pub fn with_score(self, kind: EntityKind, id: i64, score: i64, direction: Direction) -> Self {
        self.state
            .lock()
            .unwrap()
            .scores
            .insert((kind, id), (score, direction));
        self
    }

    pub fn with_profile(self, profile: UserProfile) -> Self {
        self.state.lock().unwrap().profile = Some(profile);
        self
    }

    pub fn with_profile_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().profile_delay = Some(delay);
        self
    }

    pub fn set_saved(&self, kind: EntityKind, ids: &[i64]) {
        self.state
            .lock()
            .unwrap()
            .saved
            .insert(kind, ids.iter().copied().collect());
    }

    pub fn fail_next_requests(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub fn score(&self, kind: EntityKind, id: i64) -> Option<(i64, Direction)> {
        self.state.lock().unwrap().scores.get(&(kind, id)).copied()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing {
            return Err(AppError::Http {
                status: 503,
                message: "Service Unavailable".into(),
            });
        }
        Ok(())
    }
}

pub fn profile(id: i64, username: &str) -> UserProfile {
    UserProfile {
        id,
        username: username.to_string(),
        display_name: None,
        bio: None,
        avatar: None,
        banner: None,
        api_key: None,
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn vote(
        &self,
        kind: EntityKind,
        id: i64,
        clicked: Direction,
    ) -> AppResult<VoteResponse> {
        self.record(format!("vote {} {} {}", kind, id, clicked))?;
        let mut state = self.state.lock().unwrap();
        let entry = state.scores.entry((kind, id)).or_insert((0, Direction::Neutral));
        let next = entry.1.after_click(clicked);
        entry.0 += entry.1.delta_to(next);
        entry.1 = next;
        Ok(VoteResponse { votes: entry.0 })
    }

    async fn toggle_saved(&self, kind: EntityKind, id: i64) -> AppResult<SavedResponse> {
        self.record(format!("save {} {}", kind, id))?;
        let mut state = self.state.lock().unwrap();
        let set = state.saved.entry(kind).or_default();
        let saved = if set.remove(&id) {
            false
        } else {
            set.insert(id);
            true
        };
        Ok(SavedResponse { saved })
    }

    async fn saved_ids(&self, kind: EntityKind) -> AppResult<Vec<i64>> {
        self.record(format!("saved {}", kind))?;
        let state = self.state.lock().unwrap();
        let mut ids: Vec<i64> = state
            .saved
            .get(&kind)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn fetch_profile(&self) -> AppResult<UserProfile> {
        self.record("profile".to_string())?;
        let delay = self.state.lock().unwrap().profile_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state
            .lock()
            .unwrap()
            .profile
            .clone()
            .ok_or(AppError::NotFound)
    }
}
