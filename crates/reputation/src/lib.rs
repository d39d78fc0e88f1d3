//! User reputation.
//!
//! [`ReputationStore`] is the in-memory authority for every user's lifetime
//! and session reputation. Reads return consistent [`UserReputation`]
//! snapshots without taking a lock; writes to one user are serialised while
//! writes to different users proceed independently.

mod cell;
mod record;
mod status;
mod store;

pub use record::{ReputationChange, UserReputation};
pub use status::ReputationStatus;
pub use store::ReputationStore;
