//! Shared vocabulary for the crowdprice engine.
//!
//! Every component speaks in terms of:
//!
//! - [`UserId`] - opaque chat-platform identifier of a voter
//! - [`Timestamp`] / [`Clock`] - millisecond wall time, injectable for tests
//! - [`VoteIntent`] / [`VoteKind`] - the classified meaning of one chat message
//! - [`Direction`] - sign of a price movement

mod time;
mod user;
mod vote;

pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use user::UserId;
pub use vote::{Direction, VoteIntent, VoteKind};

/// Re-export of the decimal type used for every price value.
pub use rust_decimal::Decimal;
