use std::time::Duration;

/// Why a vote was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitDenied {
    /// The voter's own bucket is empty.
    #[error("user rate limit exceeded, retry after {retry_after:?}")]
    UserLimited { retry_after: Duration },

    /// The shared bucket is empty.
    #[error("global rate limit exceeded, retry after {retry_after:?}")]
    GlobalLimited { retry_after: Duration },
}

impl RateLimitDenied {
    /// Time until the limiting bucket holds one token again.
    pub fn retry_after(&self) -> Duration {
        match self {
            Self::UserLimited { retry_after } | Self::GlobalLimited { retry_after } => *retry_after,
        }
    }

    /// Short label, used as a metrics dimension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserLimited { .. } => "user_limited",
            Self::GlobalLimited { .. } => "global_limited",
        }
    }
}
