use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::resolver::ConnectionMode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub parameters: ParametersConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    pub connection_string: Option<String>,

    /// Upper bound for async connection acquisition
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub mode: ConnectionMode,

    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametersConfig {
    #[serde(default = "default_generated_name_length")]
    pub generated_name_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace; `--verbose` and `RUST_LOG` win
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Override file contents: only keys present in the file are `Some`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigOverride {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub context: ContextOverride,

    #[serde(default)]
    pub parameters: ParametersOverride,

    #[serde(default)]
    pub logging: LoggingOverride,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ContextOverride {
    pub mode: Option<ConnectionMode>,
    pub read_only: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParametersOverride {
    pub generated_name_length: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingOverride {
    pub level: Option<String>,
}

// Default values
fn default_generated_name_length() -> usize {
    crate::params::DEFAULT_GENERATED_NAME_LENGTH
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Best,
            read_only: false,
        }
    }
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            generated_name_length: default_generated_name_length(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment override support
    pub fn load(config_path: Option<&str>, environment: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Load base configuration file
        if let Some(path) = config_path {
            config = Self::load_from_file(path)?;
        } else {
            // Try loading from standard locations
            for standard_path in Self::standard_config_paths() {
                if standard_path.exists() {
                    debug!("Loading config from: {}", standard_path.display());
                    config = Self::load_from_file(&standard_path.to_string_lossy())?;
                    break;
                }
            }
        }

        // Load environment-specific overrides
        if let Some(env) = environment {
            if let Ok(env_config) = Self::load_environment_config(env) {
                debug!("Applying environment config for: {}", env);
                config = config.merge(env_config);
            }
        }

        // Load local overrides (always last)
        if let Ok(local_config) = Self::load_override_from_file("config/local.toml") {
            debug!("Applying local config overrides");
            config = config.merge(local_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_string(), e.to_string()))
    }

    /// Load an override file, keeping track of which keys it sets
    pub fn load_override_from_file(path: &str) -> Result<ConfigOverride, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_string(), e.to_string()))
    }

    /// Load environment-specific configuration
    fn load_environment_config(environment: &str) -> Result<ConfigOverride, ConfigError> {
        let env_path = format!("config/{}.toml", environment);
        Self::load_override_from_file(&env_path)
    }

    /// Reject values that parse but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        let length = self.parameters.generated_name_length;
        if length < crate::params::MIN_GENERATED_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "parameters.generated_name_length = {} is below the minimum of {}",
                length,
                crate::params::MIN_GENERATED_NAME_LENGTH
            )));
        }
        Ok(())
    }

    /// Get standard configuration file paths in order of precedence
    fn standard_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
        ]
    }

    /// Merge an override into this config; keys the override leaves out
    /// keep their current value
    pub fn merge(mut self, other: ConfigOverride) -> Self {
        if other.database.connection_string.is_some() {
            self.database.connection_string = other.database.connection_string;
        }
        if other.database.acquire_timeout_secs.is_some() {
            self.database.acquire_timeout_secs = other.database.acquire_timeout_secs;
        }

        if let Some(mode) = other.context.mode {
            self.context.mode = mode;
        }
        if let Some(read_only) = other.context.read_only {
            self.context.read_only = read_only;
        }

        if let Some(length) = other.parameters.generated_name_length {
            self.parameters.generated_name_length = length;
        }

        if let Some(level) = other.logging.level {
            self.logging.level = level;
        }

        self
    }

    /// Generate a default configuration file
    pub fn generate_default_config(path: &str) -> Result<(), ConfigError> {
        let config = Config::default();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, toml_content)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config file '{0}': {1}")]
    Parse(String, String),

    #[error("Failed to write config file '{0}': {1}")]
    FileWrite(String, String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
