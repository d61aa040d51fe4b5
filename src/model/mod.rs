pub mod config;

pub use config::{
    Config, ConfigError, ConfigOverride, ContextConfig, ContextOverride, DatabaseConfig, LoggingConfig,
    LoggingOverride, ParametersConfig, ParametersOverride,
};
