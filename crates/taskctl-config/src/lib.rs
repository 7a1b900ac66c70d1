//! # taskctl-config
//!
//! Loading and persistence for [`EngineConfig`], the ambient configuration
//! read by the demo activity driver at startup.

pub mod config;
pub mod error;

pub use config::EngineConfig;
pub use error::{ConfigError, ConfigResult};
