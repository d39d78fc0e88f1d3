//! Vote weighting.
//!
//! [`WeightCalculator::compute`] turns a vote intent and the voter's
//! reputation into a [`VoteWeight`]. It is a pure function of its inputs and
//! the configuration.

mod calculator;
mod curve;
mod weight;

pub use calculator::WeightCalculator;
pub use curve::normalize;
pub use weight::VoteWeight;
