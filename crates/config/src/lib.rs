//! Engine configuration.
//!
//! A single [`EngineConfig`] is built once per session, validated, and then
//! shared read-only by every component. Each section deserialises with
//! `#[serde(default)]`, so a TOML file only needs the fields it overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

mod constants;
mod error;
mod sections;

pub use error::ConfigError;
pub use sections::{
    ClassifierConfig, EventsConfig, LogLevel, LoggingConfig, PersistenceConfig, PriceConfig,
    RateLimitConfig, ReputationConfig, SaturationCurve, ValidationConfig, WeightConfig,
};

/// Complete configuration surface of the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub price: PriceConfig,
    pub rate_limit: RateLimitConfig,
    pub weight: WeightConfig,
    pub reputation: ReputationConfig,
    pub validation: ValidationConfig,
    pub persistence: PersistenceConfig,
    pub classifier: ClassifierConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Check every section. The first violation wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.price.validate()?;
        self.rate_limit.validate()?;
        self.weight.validate()?;
        self.reputation.validate()?;
        self.validation.validate()?;
        self.persistence.validate()?;
        self.classifier.validate()?;
        self.events.validate()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded engine configuration");
        Ok(config)
    }
}
