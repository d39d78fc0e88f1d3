//! Vote processing for crowd-steered prices.
//!
//! A [`VoteEngine`] takes classified [`VoteIntent`]s (or raw chat through a
//! [`Classifier`]), rate limits them per user and globally, weights them by
//! reputation and applies them to a bounded [`PriceState`] one at a time.
//!
//! Each accepted vote produces, in history order:
//!
//! - a [`HistoryEntry`] in the price state
//! - a reputation reward
//! - an [`EngineEvent::VoteApplied`] on the broadcast channel
//! - persistence records, if a [`PersistenceHandle`] is attached
//!
//! Rejected votes produce none of these.
//!
//! [`VoteIntent`]: crowdprice_primitives::VoteIntent
//! [`PriceState`]: crowdprice_price::PriceState
//! [`HistoryEntry`]: crowdprice_price::HistoryEntry

mod classifier;
mod engine;
mod error;
mod events;
mod metrics;
pub mod persistence;
mod processor;
mod validate;

pub use classifier::{ChatMessage, Classification, Classifier, ClassifierGate};
pub use engine::{EngineStats, VoteEngine};
pub use error::{ClassificationError, InvalidInput, PersistenceError, VoteRejection};
pub use events::{EngineEvent, EventEmitter};
pub use persistence::{PersistenceHandle, PersistenceRecord, create_persistence_actor};
pub use processor::{VoteOutcome, VoteProcessor, VoteReceipt};
