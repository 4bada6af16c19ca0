// Vote transactions - pure state transitions, no I/O
use serde::Serialize;
use std::fmt;

use crate::models::{Direction, EntityKind};

/// What the user sees for one entity: their vote and its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteSnapshot {
    pub direction: Direction,
    pub score: i64,
}

impl VoteSnapshot {
    pub fn new(direction: Direction, score: i64) -> Self {
        Self { direction, score }
    }
}

/// One vote action: `Pending -> Confirmed | RolledBack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteTransaction {
    /// Optimistic state applied, request outstanding
    Pending {
        kind: EntityKind,
        id: i64,
        clicked: Direction,
        prior: VoteSnapshot,
        optimistic: VoteSnapshot,
    },

    /// Backend answered with a new tally
    Confirmed {
        kind: EntityKind,
        id: i64,
        snapshot: VoteSnapshot,
        /// Direction differs from the optimistic guess
        adjusted: bool,
    },

    /// Request failed, prior state restored
    RolledBack {
        kind: EntityKind,
        id: i64,
        restored: VoteSnapshot,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    NoDirection,
    InvalidTransition(String),
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDirection => write!(f, "A vote needs a direction"),
            Self::InvalidTransition(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransactionError {}

impl VoteTransaction {
    /// Start a vote from what the user currently sees.
    pub fn begin(
        kind: EntityKind,
        id: i64,
        prior: VoteSnapshot,
        clicked: Direction,
    ) -> Result<Self, TransactionError> {
        if clicked == Direction::Neutral {
            return Err(TransactionError::NoDirection);
        }

        let direction = prior.direction.after_click(clicked);
        let score = prior.score + prior.direction.delta_to(direction);

        Ok(Self::Pending {
            kind,
            id,
            clicked,
            prior,
            optimistic: VoteSnapshot { direction, score },
        })
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Confirmed { .. } => "confirmed",
            Self::RolledBack { .. } => "rolled_back",
        }
    }

    pub fn target(&self) -> (EntityKind, i64) {
        match self {
            Self::Pending { kind, id, .. }
            | Self::Confirmed { kind, id, .. }
            | Self::RolledBack { kind, id, .. } => (*kind, *id),
        }
    }

    /// State to display right now.
    pub fn displayed(&self) -> VoteSnapshot {
        match self {
            Self::Pending { optimistic, .. } => *optimistic,
            Self::Confirmed { snapshot, .. } => *snapshot,
            Self::RolledBack { restored, .. } => *restored,
        }
    }

    /// Transition: Pending → Confirmed, adopting the server's tally.
    ///
    /// The direction is taken from the tally when the score change can only
    /// have come from one server-side starting state; otherwise the
    /// optimistic direction stands.
    pub fn confirm(self, server_score: i64) -> Result<Self, TransactionError> {
        match self {
            Self::Pending {
                kind,
                id,
                clicked,
                prior,
                optimistic,
            } => {
                let direction = infer_direction(prior.score, clicked, server_score)
                    .unwrap_or(optimistic.direction);

                Ok(Self::Confirmed {
                    kind,
                    id,
                    snapshot: VoteSnapshot {
                        direction,
                        score: server_score,
                    },
                    adjusted: direction != optimistic.direction,
                })
            }
            other => Err(TransactionError::InvalidTransition(format!(
                "Cannot confirm a {} vote",
                other.state_name()
            ))),
        }
    }

    /// Transition: Pending → RolledBack, restoring the prior state.
    pub fn roll_back(self, reason: impl Into<String>) -> Result<Self, TransactionError> {
        match self {
            Self::Pending {
                kind, id, prior, ..
            } => Ok(Self::RolledBack {
                kind,
                id,
                restored: prior,
                reason: reason.into(),
            }),
            other => Err(TransactionError::InvalidTransition(format!(
                "Cannot roll back a {} vote",
                other.state_name()
            ))),
        }
    }
}

/// The direction the server must now hold, if the tally pins it down.
fn infer_direction(prior_score: i64, clicked: Direction, server_score: i64) -> Option<Direction> {
    let observed = server_score - prior_score;
    let mut matches = [Direction::Up, Direction::Down, Direction::Neutral]
        .into_iter()
        .map(|start| {
            let next = start.after_click(clicked);
            (start.delta_to(next), next)
        })
        .filter(|(delta, _)| *delta == observed)
        .map(|(_, next)| next);

    let first = matches.next()?;
    if matches.all(|next| next == first) {
        Some(first)
    } else {
        None
    }
}
