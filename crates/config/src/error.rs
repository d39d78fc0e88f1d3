//! Configuration errors. All of them are fatal at startup.

use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `min_price` is greater than `max_price`.
    #[error("invalid price bounds: min {min} > max {max}")]
    InvalidPriceBounds { min: Decimal, max: Decimal },

    /// Initial price lies outside `[min_price, max_price]`.
    #[error("initial price {initial} outside bounds [{min}, {max}]")]
    InitialPriceOutOfBounds {
        initial: Decimal,
        min: Decimal,
        max: Decimal,
    },

    /// A field that must be strictly positive is not.
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: String },

    /// A floating point field is NaN or infinite.
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },

    /// A field lies outside its allowed interval.
    #[error("{field} = {value} outside allowed range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A lower bound is greater than its upper bound.
    #[error("{lower} ({lower_value}) must not exceed {upper} ({upper_value})")]
    InvertedRange {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
