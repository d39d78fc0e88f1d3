//! Vote rejection and collaborator errors.

use std::time::Duration;

use crowdprice_ratelimiter::RateLimitDenied;
use crowdprice_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Structural problems with a vote intent or chat message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("user id is empty")]
    EmptyUserId,

    #[error("user id is {len} characters, limit is {max}")]
    UserIdTooLong { len: usize, max: usize },

    #[error("message is {len} characters, limit is {max}")]
    MessageTooLong { len: usize, max: usize },

    #[error("set value {value} outside [0, {max}]")]
    SetValueOutOfRange { value: Decimal, max: Decimal },

    #[error("confidence is not a finite number")]
    NonFiniteConfidence,

    #[error("timestamp is {ahead:?} ahead of the engine clock")]
    TimestampInFuture { ahead: Duration },
}

/// Why a vote did not reach the price.
///
/// A rejected vote leaves the price state and every reputation untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteRejection {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("rate limited: {0}")]
    RateLimited(#[from] RateLimitDenied),
}

impl VoteRejection {
    /// Short label, used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::RateLimited(denied) => denied.as_str(),
        }
    }
}

/// Failure delivering a record to the durable store.
///
/// Only ever logged and retried; it never reaches vote processing.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("persistence service stopped")]
    ServiceStopped,
}

/// Failure of the external classifier. Treated as a NONE intent.
#[derive(Debug, Clone, Error)]
pub enum ClassificationError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("unrecognised classifier response: {0}")]
    Malformed(String),
}
