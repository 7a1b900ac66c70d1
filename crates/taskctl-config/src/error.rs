//! Error types for loading and persisting [`crate::EngineConfig`].

use std::io;
use thiserror::Error;

/// Errors raised by [`crate::EngineConfig::load`] / [`crate::EngineConfig::save`].
///
/// A missing config file is not an error: `load` falls back to
/// [`crate::EngineConfig::default`] in that case.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    /// The config file's TOML could not be parsed.
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized back to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A loaded value failed validation.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// The offending field.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = ConfigError::InvalidValue {
            key: "tick_period_ms".to_string(),
            reason: "must be > 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for 'tick_period_ms': must be > 0"
        );
    }
}
