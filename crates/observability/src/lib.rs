//! Observability for the crowdprice engine.
//!
//! The library crates only emit `tracing` events and `metrics` samples; this
//! crate installs the subscriber that turns them into output.

mod logging;

pub use logging::{LOG_FILE_NAME, RotatingFile, initialize_logging};
