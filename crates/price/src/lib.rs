//! Price state.
//!
//! [`PriceState`] owns the current price and its history. Every mutation goes
//! through one critical section, so the history order is the order in which
//! votes took effect.

mod history;
mod state;

pub use history::HistoryEntry;
pub use state::{PriceSnapshot, PriceState};
