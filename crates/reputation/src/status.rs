use serde::{Deserialize, Serialize};

/// Standing of a user, derived from score thresholds and penalties.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::FromRepr,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum ReputationStatus {
    #[default]
    Neutral = 0,
    Trusted = 1,
    /// Muted but still participating.
    Flagged = 2,
}

impl ReputationStatus {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged)
    }
}
