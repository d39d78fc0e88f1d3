//! Classified vote intents.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Timestamp, UserId};

/// What a chat message asks the price to do.
///
/// Closed set: the weight calculator matches exhaustively, so a new intent
/// kind is a compile error everywhere it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
    /// Propose a specific target price.
    Set(Decimal),
    /// Not a vote (also the result of a failed classification).
    None,
}

impl VoteKind {
    pub fn is_vote(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Sign of a price movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl Direction {
    /// +1, -1 or 0.
    pub fn signum(&self) -> i8 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
            Self::Neutral => 0,
        }
    }

    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.signum())
    }

    /// Direction of a signed change.
    pub fn of(delta: Decimal) -> Self {
        if delta.is_sign_positive() && !delta.is_zero() {
            Self::Up
        } else if delta.is_sign_negative() && !delta.is_zero() {
            Self::Down
        } else {
            Self::Neutral
        }
    }
}

/// Output of the external classifier for a single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteIntent {
    pub user: UserId,
    pub kind: VoteKind,
    /// Classifier confidence in `[0, 1]`; informational only.
    pub confidence: f64,
    pub timestamp: Timestamp,
}

impl VoteIntent {
    pub fn new(user: impl Into<UserId>, kind: VoteKind, timestamp: Timestamp) -> Self {
        Self {
            user: user.into(),
            kind,
            confidence: 1.0,
            timestamp,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn up(user: impl Into<UserId>, timestamp: Timestamp) -> Self {
        Self::new(user, VoteKind::Up, timestamp)
    }

    pub fn down(user: impl Into<UserId>, timestamp: Timestamp) -> Self {
        Self::new(user, VoteKind::Down, timestamp)
    }

    pub fn set(user: impl Into<UserId>, target: Decimal, timestamp: Timestamp) -> Self {
        Self::new(user, VoteKind::Set(target), timestamp)
    }
}
