//! Cache configuration
//!
//! Sizes for the character frame cache. Can be deserialized as part of a
//! larger configuration file, overridden from the environment, or built
//! programmatically.

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`CacheConfig::character_capacity`]
pub const CHARACTER_CACHE_ENV: &str = "TEXTBOX_CHARACTER_CACHE";

/// Configuration for the cache system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of characters whose full emotion sets stay resident
    pub character_capacity: usize,
    /// Decode a character's emotion set as soon as it becomes current
    pub preload_on_switch: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            character_capacity: 3,
            preload_on_switch: true,
        }
    }
}

impl CacheConfig {
    /// Sets the number of resident characters.
    pub fn with_character_capacity(mut self, capacity: usize) -> Self {
        self.character_capacity = capacity;
        self
    }

    /// Enables or disables preloading on character switch.
    pub fn with_preload_on_switch(mut self, preload: bool) -> Self {
        self.preload_on_switch = preload;
        self
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `TEXTBOX_CHARACTER_CACHE`: resident character count (default: 3)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Applies environment overrides to an existing configuration.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var(CHARACTER_CACHE_ENV) {
            self.character_capacity = val
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|capacity| *capacity > 0)
                .ok_or_else(|| ConfigError::InvalidValue(CHARACTER_CACHE_ENV.to_string()))?;
        }
        Ok(())
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(key) => {
                write!(f, "invalid value for configuration key: {}", key)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
