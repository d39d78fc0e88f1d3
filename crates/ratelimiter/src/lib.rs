//! Vote admission control.
//!
//! Two independent token buckets guard every vote: one per user and one shared
//! by everybody. A check consumes a token from both or from neither.

mod bucket;
mod error;
mod limiter;

pub use bucket::{BucketParams, TokenBucket};
pub use error::RateLimitDenied;
pub use limiter::{Admission, RateLimiter};
