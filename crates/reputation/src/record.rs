use crowdprice_primitives::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::ReputationStatus;

/// Point-in-time view of one user's reputation.
///
/// This is also the persisted form: `version` counts the updates applied to
/// the user so far, so a durable mirror can drop stale or replayed copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReputation {
    pub user: UserId,
    /// Accumulated across sessions.
    pub lifetime_score: f64,
    /// Accumulated in the current session only.
    pub session_score: f64,
    /// Accepted votes, all sessions.
    pub vote_count: u64,
    /// Accepted votes, current session.
    pub session_votes: u64,
    /// Moderation penalties, all sessions.
    pub penalties: u64,
    /// Moderation penalties, current session.
    pub session_penalties: u64,
    pub last_vote_at: Option<Timestamp>,
    pub status: ReputationStatus,
    pub version: u64,
}

impl UserReputation {
    /// Reputation of a user nobody has seen yet.
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            lifetime_score: 0.0,
            session_score: 0.0,
            vote_count: 0,
            session_votes: 0,
            penalties: 0,
            session_penalties: 0,
            last_vote_at: None,
            status: ReputationStatus::Neutral,
            version: 0,
        }
    }
}

/// A reputation mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReputationChange {
    /// The user's vote moved through the price state. Rewards participation,
    /// regardless of direction.
    AcceptedVote,
    /// Moderation penalty subtracted from both scores. Never counts as a vote.
    Penalty { amount: f64 },
}
