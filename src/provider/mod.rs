//! Provider abstraction
//!
//! The core never talks to a concrete database client. Everything it needs from
//! a driver goes through [`ProviderFactory`] (connections and blank parameters)
//! and [`DbConnection`] (open/close, metadata, batch execution).

#[cfg(feature = "odbc")]
pub mod odbc;

mod value;

pub use value::{DbParameter, DbType, DbValue, NoValue, ParameterDirection};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ConnectionError;

/// Product metadata read from a live connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    pub product_name: String,
    pub product_version: String,
}

/// How the provider binds parameters, independent of what the engine supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterStyle {
    /// Provider passes the dialect's named markers through.
    #[default]
    Native,
    /// Provider only understands `?` placeholders (ODBC, OLE DB).
    Positional,
}

/// One physical database connection.
#[async_trait]
pub trait DbConnection: Send + Sync {
    /// Connection string this handle was created with
    fn connection_string(&self) -> &str;

    fn is_open(&self) -> bool;

    /// Open the physical connection. Opening an open connection is a no-op.
    fn open(&self) -> Result<(), ConnectionError>;

    /// Close the physical connection. Closing a closed connection is a no-op.
    fn close(&self) -> Result<(), ConnectionError>;

    /// Read product name and version from the connection's metadata surface.
    fn server_info(&self) -> Result<ServerInfo, ConnectionError>;

    /// Execute a statement that returns no rows.
    fn execute(&self, sql: &str) -> Result<(), ConnectionError>;

    async fn open_async(&self) -> Result<(), ConnectionError> {
        self.open()
    }

    async fn close_async(&self) -> Result<(), ConnectionError> {
        self.close()
    }
}

/// Creates connections and provider-native parameters.
pub trait ProviderFactory: Send + Sync {
    /// Short provider name used in diagnostics (e.g. "odbc")
    fn provider_name(&self) -> &str;

    /// Create a new, unopened connection.
    fn create_connection(&self) -> Result<Arc<dyn DbConnection>, ConnectionError>;

    /// Create a blank parameter. `None` means the provider cannot build
    /// parameters at all.
    fn create_parameter(&self) -> Option<DbParameter> {
        Some(DbParameter::default())
    }

    fn parameter_style(&self) -> ParameterStyle {
        ParameterStyle::Native
    }
}
