//! `EngineConfig`: ambient, file-persisted settings for the demo activity
//! driver and the processor's own defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Engine- and processor-level configuration, loaded once at startup.
///
/// None of these values are part of the processor's own state; they are
/// read by the demo activity driver to parameterize the `ExecutionEngine`
/// it builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Period, in milliseconds, at which the demo driver calls `step()`.
    pub tick_period_ms: u64,
    /// Default stepping mode newly loaded state machines start in
    /// (matches `StateInfo::new`'s default of `true`).
    pub default_state_machine_stepping: bool,
    /// Consecutive `process()` rejections a caller should tolerate before
    /// logging a warning about a stuck mailbox.
    pub mailbox_retry_log_threshold: u32,
    /// `tracing` filter directive applied by `init_logging` (e.g. "info",
    /// "taskctl=debug").
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 10,
            default_state_machine_stepping: true,
            mailbox_retry_log_threshold: 5,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`. A missing file is not an error: returns
    /// [`EngineConfig::default`].
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML and write to `path`, creating parent directories
    /// as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The platform-default config file path (`<config dir>/taskctl/config.toml`).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taskctl")
            .join("config.toml")
    }

    /// Reject configurations that would produce a non-functioning engine.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tick_period_ms".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_missing_file_returns_default() {
        let path = std::env::temp_dir().join("taskctl-config-test-missing.toml");
        let _ = std::fs::remove_file(&path);
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = std::env::temp_dir().join("taskctl-config-test-roundtrip.toml");
        let mut config = EngineConfig::default();
        config.tick_period_ms = 20;
        config.log_level = "debug".to_string();
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn zero_tick_period_is_rejected() {
        let mut config = EngineConfig::default();
        config.tick_period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let path = std::env::temp_dir().join("taskctl-config-test-invalid.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "not valid toml {{{{").unwrap();
        assert!(EngineConfig::load(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
