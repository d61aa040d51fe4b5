use std::time::Duration;

use crate::model::ConfigError;

/// Errors raised by a provider while reaching or talking to the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[cfg(feature = "odbc")]
    #[error("ODBC error: {0}")]
    Odbc(#[from] odbc_api::Error),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Connection is closed")]
    Closed,
}

/// Errors surfaced by the context facade to the operation layer.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Connectivity(#[from] ConnectionError),

    #[error("Parameter construction failed (check provider registration): {0}")]
    ParameterConstruction(String),

    #[error("Statement has {count} parameters, dialect '{dialect}' allows at most {max}")]
    TooManyParameters {
        dialect: String,
        count: usize,
        max: usize,
    },

    #[error("Duplicate parameter name: {0}")]
    DuplicateParameter(String),

    #[error("No unique parameter name of length {length} left after {count} parameters")]
    ParameterNamesExhausted { length: usize, count: usize },

    #[error("Feature not supported by dialect '{dialect}': {feature}")]
    Unsupported { dialect: String, feature: String },

    #[error("Context is read-only; write connection refused")]
    ReadOnly,

    #[error("Timed out acquiring connection after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = ContextError> = std::result::Result<T, E>;
