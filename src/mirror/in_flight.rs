use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{AppError, AppResult};
use crate::models::EntityKind;

type Key = (EntityKind, i64);

/// Entities with a vote or save request outstanding.
///
/// A second action on the same entity is rejected until the first
/// permit is dropped, so responses can never be applied out of order.
#[derive(Clone, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<Key>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, kind: EntityKind, id: i64) -> AppResult<InFlightPermit> {
        let mut active = lock(&self.active);
        if !active.insert((kind, id)) {
            tracing::debug!("Rejected overlapping action on {} {}", kind, id);
            return Err(AppError::InFlight { kind, id });
        }
        Ok(InFlightPermit {
            active: Arc::clone(&self.active),
            key: (kind, id),
        })
    }

    pub fn is_active(&self, kind: EntityKind, id: i64) -> bool {
        lock(&self.active).contains(&(kind, id))
    }
}

/// Held for the lifetime of one request. Releases the entity on drop.
pub struct InFlightPermit {
    active: Arc<Mutex<HashSet<Key>>>,
    key: Key,
}

impl InFlightPermit {
    pub fn kind(&self) -> EntityKind {
        self.key.0
    }

    pub fn id(&self) -> i64 {
        self.key.1
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.key);
    }
}

// A panic while holding the set cannot leave it logically inconsistent
fn lock(active: &Mutex<HashSet<Key>>) -> MutexGuard<'_, HashSet<Key>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_action_on_same_entity_is_rejected() {
        let guard = InFlight::new();
        let _permit = guard.try_begin(EntityKind::Post, 42).unwrap();

        match guard.try_begin(EntityKind::Post, 42) {
            Err(AppError::InFlight { kind, id }) => {
                assert_eq!(kind, EntityKind::Post);
                assert_eq!(id, 42);
            }
            _ => panic!("expected in-flight rejection"),
        }
    }

    #[test]
    fn dropping_permit_releases_entity() {
        let guard = InFlight::new();
        let permit = guard.try_begin(EntityKind::Comment, 3).unwrap();
        assert!(guard.is_active(EntityKind::Comment, 3));

        drop(permit);
        assert!(!guard.is_active(EntityKind::Comment, 3));
        assert!(guard.try_begin(EntityKind::Comment, 3).is_ok());
    }

    #[test]
    fn different_entities_proceed_independently() {
        let guard = InFlight::new();
        let _a = guard.try_begin(EntityKind::Post, 1).unwrap();
        let _b = guard.try_begin(EntityKind::Post, 2).unwrap();
        let _c = guard.try_begin(EntityKind::Comment, 1).unwrap();
    }

    #[test]
    fn clones_share_state() {
        let guard = InFlight::new();
        let other = guard.clone();
        let _permit = guard.try_begin(EntityKind::Post, 9).unwrap();
        assert!(other.try_begin(EntityKind::Post, 9).is_err());
    }
}
