pub mod transaction;

pub use transaction::{TransactionError, VoteSnapshot, VoteTransaction};

use crate::api::Backend;
use crate::error::{AppError, AppResult};
use crate::mirror::{InFlight, InFlightPermit, SavedMirror, VoteMirror};
use crate::models::{Direction, EntityKind, UserId, VoteResponse};

impl From<TransactionError> for AppError {
    fn from(e: TransactionError) -> Self {
        match e {
            TransactionError::NoDirection => AppError::BadRequest(e.to_string()),
            TransactionError::InvalidTransition(msg) => AppError::Internal(msg),
        }
    }
}

/// How a vote action ended.
#[derive(Debug)]
pub enum VoteOutcome {
    Confirmed(VoteSnapshot),
    RolledBack {
        restored: VoteSnapshot,
        error: AppError,
    },
}

impl VoteOutcome {
    pub fn snapshot(&self) -> VoteSnapshot {
        match self {
            Self::Confirmed(snapshot) => *snapshot,
            Self::RolledBack { restored, .. } => *restored,
        }
    }

    pub fn into_result(self) -> AppResult<VoteSnapshot> {
        match self {
            Self::Confirmed(snapshot) => Ok(snapshot),
            Self::RolledBack { error, .. } => Err(error),
        }
    }
}

/// A vote whose optimistic state is already in the mirror.
pub struct PendingVote {
    user: UserId,
    transaction: VoteTransaction,
    _permit: InFlightPermit,
}

impl PendingVote {
    pub fn transaction(&self) -> &VoteTransaction {
        &self.transaction
    }

    pub fn displayed(&self) -> VoteSnapshot {
        self.transaction.displayed()
    }

    /// Apply the backend's answer to the mirror and release the entity.
    pub fn settle(
        self,
        mirror: &mut VoteMirror,
        result: AppResult<VoteResponse>,
    ) -> AppResult<VoteOutcome> {
        let (kind, id) = self.transaction.target();

        match result {
            Ok(response) => {
                let confirmed = self.transaction.confirm(response.votes)?;
                if let VoteTransaction::Confirmed { adjusted: true, .. } = confirmed {
                    tracing::info!("Server state for {} {} differed; adopting it", kind, id);
                }
                let snapshot = confirmed.displayed();
                mirror.set_vote(self.user, id, snapshot.direction)?;
                Ok(VoteOutcome::Confirmed(snapshot))
            }
            Err(error) => {
                let rolled_back = self.transaction.roll_back(error.to_string())?;
                let restored = rolled_back.displayed();
                mirror.set_vote(self.user, id, restored.direction)?;
                tracing::warn!("Vote on {} {} failed, rolled back: {}", kind, id, error);
                Ok(VoteOutcome::RolledBack { restored, error })
            }
        }
    }
}

/// Record the optimistic result of clicking `clicked` on an entity that
/// currently shows `score`.
pub fn begin_vote(
    mirror: &mut VoteMirror,
    in_flight: &InFlight,
    user: UserId,
    id: i64,
    score: i64,
    clicked: Direction,
) -> AppResult<PendingVote> {
    let kind = mirror.kind();
    let permit = in_flight.try_begin(kind, id)?;

    let prior = VoteSnapshot::new(mirror.get_vote(user, id), score);
    let transaction = VoteTransaction::begin(kind, id, prior, clicked)?;
    mirror.set_vote(user, id, transaction.displayed().direction)?;

    Ok(PendingVote {
        user,
        transaction,
        _permit: permit,
    })
}

/// Full vote round trip: optimistic update, request, reconcile.
pub async fn vote<B: Backend + ?Sized>(
    backend: &B,
    mirror: &mut VoteMirror,
    in_flight: &InFlight,
    user: UserId,
    id: i64,
    score: i64,
    clicked: Direction,
) -> AppResult<VoteOutcome> {
    let pending = begin_vote(mirror, in_flight, user, id, score, clicked)?;
    let result = backend.vote(mirror.kind(), id, clicked).await;
    pending.settle(mirror, result)
}

/// Flip the saved flag on the backend, then mirror the confirmed value.
pub async fn toggle_save<B: Backend + ?Sized>(
    backend: &B,
    mirror: &mut SavedMirror,
    in_flight: &InFlight,
    user: UserId,
    id: i64,
) -> AppResult<bool> {
    if mirror.owner() != Some(user) {
        return Err(AppError::UserMismatch);
    }
    let kind: EntityKind = mirror.kind();
    let _permit = in_flight.try_begin(kind, id)?;

    let response = backend.toggle_saved(kind, id).await?;
    mirror.toggle(user, id, response.saved)?;

    tracing::info!(
        "{} {} {}",
        if response.saved { "Saved" } else { "Unsaved" },
        kind,
        id
    );
    Ok(response.saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalStore;
    use crate::testing::FakeBackend;

    const ALICE: UserId = UserId(1);

    fn post_mirror() -> VoteMirror {
        let store = LocalStore::new(crate::db::memory_pool().unwrap());
        VoteMirror::load(store, EntityKind::Post, ALICE).unwrap()
    }

    #[tokio::test]
    async fn upvote_then_upvote_again_retracts() {
        let backend = FakeBackend::new().with_score(EntityKind::Post, 42, 10, Direction::Neutral);
        let mut mirror = post_mirror();
        let in_flight = InFlight::new();

        let first = vote(&backend, &mut mirror, &in_flight, ALICE, 42, 10, Direction::Up)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(first, VoteSnapshot::new(Direction::Up, 11));
        assert_eq!(mirror.get_vote(ALICE, 42), Direction::Up);

        let second = vote(&backend, &mut mirror, &in_flight, ALICE, 42, 11, Direction::Up)
            .await
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(second, VoteSnapshot::new(Direction::Neutral, 10));
        assert_eq!(mirror.get_vote(ALICE, 42), Direction::Neutral);
        assert!(mirror.is_empty());
    }

    #[tokio::test]
    async fn failed_vote_rolls_back_direction_and_score() {
        let backend = FakeBackend::new().with_score(EntityKind::Post, 42, 10, Direction::Up);
        let mut mirror = post_mirror();
        mirror.set_vote(ALICE, 42, Direction::Up).unwrap();
        let in_flight = InFlight::new();
        backend.fail_next_requests(true);

        let outcome = vote(&backend, &mut mirror, &in_flight, ALICE, 42, 10, Direction::Down)
            .await
            .unwrap();

        assert_eq!(outcome.snapshot(), VoteSnapshot::new(Direction::Up, 10));
        assert!(matches!(outcome, VoteOutcome::RolledBack { .. }));
        assert_eq!(mirror.get_vote(ALICE, 42), Direction::Up);
        assert!(!in_flight.is_active(EntityKind::Post, 42));
    }

    #[tokio::test]
    async fn optimistic_state_visible_while_pending() {
        let mut mirror = post_mirror();
        let in_flight = InFlight::new();

        let pending = begin_vote(&mut mirror, &in_flight, ALICE, 7, 3, Direction::Down).unwrap();
        assert_eq!(pending.displayed(), VoteSnapshot::new(Direction::Down, 2));
        assert_eq!(mirror.get_vote(ALICE, 7), Direction::Down);
        assert_eq!(pending.transaction().state_name(), "pending");

        let outcome = pending
            .settle(&mut mirror, Ok(VoteResponse { votes: 2 }))
            .unwrap();
        assert_eq!(outcome.snapshot(), VoteSnapshot::new(Direction::Down, 2));
    }

    #[tokio::test]
    async fn overlapping_vote_on_same_entity_is_rejected() {
        let mut mirror = post_mirror();
        let in_flight = InFlight::new();

        let pending = begin_vote(&mut mirror, &in_flight, ALICE, 7, 3, Direction::Up).unwrap();
        let second = begin_vote(&mut mirror, &in_flight, ALICE, 7, 4, Direction::Up);
        assert!(matches!(second, Err(AppError::InFlight { id: 7, .. })));
        // The rejected click did not disturb the optimistic state
        assert_eq!(mirror.get_vote(ALICE, 7), Direction::Up);

        pending
            .settle(&mut mirror, Ok(VoteResponse { votes: 4 }))
            .unwrap();
        assert!(begin_vote(&mut mirror, &in_flight, ALICE, 7, 4, Direction::Up).is_ok());
    }

    #[tokio::test]
    async fn stale_mirror_is_corrected_by_server_tally() {
        // The server already holds an upvote the mirror never saw
        let backend = FakeBackend::new().with_score(EntityKind::Post, 5, 8, Direction::Up);
        let mut mirror = post_mirror();
        let in_flight = InFlight::new();

        let snapshot = vote(&backend, &mut mirror, &in_flight, ALICE, 5, 8, Direction::Up)
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(snapshot, VoteSnapshot::new(Direction::Neutral, 7));
        assert_eq!(mirror.get_vote(ALICE, 5), Direction::Neutral);
        assert_eq!(backend.score(EntityKind::Post, 5), Some((7, Direction::Neutral)));
    }

    #[tokio::test]
    async fn toggle_save_mirrors_confirmed_value() {
        let backend = FakeBackend::new().with_saved(EntityKind::Comment, &[5, 9]);
        let mut mirror = SavedMirror::new(EntityKind::Comment, None);
        mirror.refresh(ALICE, &backend).await.unwrap();
        let in_flight = InFlight::new();

        let saved = toggle_save(&backend, &mut mirror, &in_flight, ALICE, 9)
            .await
            .unwrap();
        assert!(!saved);
        assert!(!mirror.is_saved(ALICE, 9));
        assert!(mirror.is_saved(ALICE, 5));

        let saved = toggle_save(&backend, &mut mirror, &in_flight, ALICE, 9)
            .await
            .unwrap();
        assert!(saved);
        assert!(mirror.is_saved(ALICE, 9));
    }

    #[tokio::test]
    async fn failed_save_leaves_mirror_untouched() {
        let backend = FakeBackend::new().with_saved(EntityKind::Post, &[5]);
        let mut mirror = SavedMirror::new(EntityKind::Post, None);
        mirror.refresh(ALICE, &backend).await.unwrap();
        let in_flight = InFlight::new();
        backend.fail_next_requests(true);

        let result = toggle_save(&backend, &mut mirror, &in_flight, ALICE, 5).await;
        assert!(result.is_err());
        assert!(mirror.is_saved(ALICE, 5));
        assert!(!in_flight.is_active(EntityKind::Post, 5));
    }

    #[tokio::test]
    async fn toggle_save_for_wrong_user_makes_no_request() {
        let backend = FakeBackend::new();
        let mut mirror = SavedMirror::new(EntityKind::Post, Some(UserId(99)));
        let in_flight = InFlight::new();

        let result = toggle_save(&backend, &mut mirror, &in_flight, ALICE, 5).await;
        assert!(matches!(result, Err(AppError::UserMismatch)));
        assert!(backend.calls().is_empty());
    }
}
